use crate::dependency::BuildpackDependency;
use libherokubuildpack::digest::sha256;
use libherokubuildpack::download::{download_file, DownloadError};
use libherokubuildpack::log::log_info;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Provides the artifact of a dependency as a local file whose SHA-256 has been verified.
pub(crate) trait DependencyCache {
    fn artifact(&self, dependency: &BuildpackDependency) -> Result<PathBuf, DependencyCacheError>;
}

/// Looks up artifacts in the buildpack's own `dependencies` directory (offline packaging) and in
/// a download directory, downloading into the latter on a miss.
///
/// Artifacts are stored as `<dir>/<sha256>/<file name>`.
pub(crate) struct DownloadDependencyCache {
    pub(crate) cache_dir: PathBuf,
    pub(crate) download_dir: PathBuf,
}

impl DownloadDependencyCache {
    pub(crate) fn new(buildpack_dir: &Path, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: buildpack_dir.join("dependencies"),
            download_dir: download_dir.into(),
        }
    }

    fn cached_artifact(
        &self,
        dependency: &BuildpackDependency,
        expected: &str,
    ) -> Result<Option<PathBuf>, DependencyCacheError> {
        for dir in [&self.cache_dir, &self.download_dir] {
            let path = dir.join(expected).join(dependency.file_name());

            if path.is_file() && checksum(&path)? == expected {
                return Ok(Some(path));
            }
        }

        Ok(None)
    }
}

impl DependencyCache for DownloadDependencyCache {
    fn artifact(&self, dependency: &BuildpackDependency) -> Result<PathBuf, DependencyCacheError> {
        let expected = dependency
            .sha256_hex()
            .ok_or_else(|| DependencyCacheError::MissingChecksum(dependency.uri.clone()))?;

        if let Some(path) = self.cached_artifact(dependency, &expected)? {
            log_info(format!("Reusing cached download from {}", path.display()));
            return Ok(path);
        }

        let artifact_dir = self.download_dir.join(&expected);
        fs::create_dir_all(&artifact_dir).map_err(|source| io_error(&artifact_dir, source))?;

        // Downloads go to a temporary file first so a concurrent build never observes a
        // partially written artifact.
        let temp_file =
            NamedTempFile::new_in(&artifact_dir).map_err(|source| io_error(&artifact_dir, source))?;

        log_info(format!(
            "Downloading {} {} from {}",
            dependency.display_name(),
            dependency.version,
            dependency.uri
        ));
        download_file(&dependency.uri, temp_file.path()).map_err(|source| {
            DependencyCacheError::Download {
                uri: dependency.uri.clone(),
                source,
            }
        })?;

        let actual = checksum(temp_file.path())?;
        if actual != expected {
            return Err(DependencyCacheError::ChecksumMismatch {
                uri: dependency.uri.clone(),
                expected,
                actual,
            });
        }

        let path = artifact_dir.join(dependency.file_name());
        temp_file
            .persist(&path)
            .map_err(|error| io_error(&path, error.error))?;

        log_info(format!("Verified checksum of {}", path.display()));
        Ok(path)
    }
}

fn checksum(path: &Path) -> Result<String, DependencyCacheError> {
    sha256(path)
        .map(|checksum| checksum.to_lowercase())
        .map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: std::io::Error) -> DependencyCacheError {
    DependencyCacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum DependencyCacheError {
    #[error("No SHA-256 checksum is pinned for {0}")]
    MissingChecksum(String),

    #[error("Couldn't download {uri}: {source}")]
    Download { uri: String, source: DownloadError },

    #[error("Checksum mismatch for {uri}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        uri: String,
        expected: String,
        actual: String,
    },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
