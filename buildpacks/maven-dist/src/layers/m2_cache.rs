use crate::errors::MavenDistBuildpackError;
use crate::plan::m2_cache_layer_name;
use crate::MavenDistBuildpack;
use libcnb::build::BuildContext;
use libcnb::generic::GenericMetadata;
use libcnb::layer::{
    CachedLayerDefinition, InvalidMetadataAction, LayerRef, LayerState, RestoredLayerAction,
};
use libherokubuildpack::log::{log_header, log_info, log_warning};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkOutcome {
    Linked,
    AlreadyLinked,
    /// The link path exists and is not a symlink, it is left untouched.
    Occupied,
}

/// Provides a layer that is cached between builds and backs the local Maven repository.
pub(crate) fn handle(
    context: &BuildContext<MavenDistBuildpack>,
    m2_path: &Path,
) -> libcnb::Result<LayerRef<MavenDistBuildpack, (), ()>, MavenDistBuildpackError> {
    log_header("Maven cache");

    let layer_ref = context.cached_layer(
        m2_cache_layer_name(),
        CachedLayerDefinition {
            build: false,
            launch: false,
            invalid_metadata_action: &|_| InvalidMetadataAction::DeleteLayer,
            restored_layer_action: &|_: &GenericMetadata, _| RestoredLayerAction::KeepLayer,
        },
    )?;

    match layer_ref.state {
        LayerState::Restored { .. } => log_info("Restoring local Maven repository from cache"),
        LayerState::Empty { .. } => log_info("Creating empty local Maven repository cache"),
    }

    let layer_path = layer_ref.path();
    match link_cache(&layer_path, m2_path).map_err(MavenDistBuildpackError::CacheLink)? {
        LinkOutcome::Linked => log_info(format!(
            "Linked {} to {}",
            m2_path.display(),
            layer_path.display()
        )),
        LinkOutcome::AlreadyLinked => {
            log_info(format!("{} is already linked", m2_path.display()));
        }
        LinkOutcome::Occupied => log_warning(
            "Local Maven repository not cached",
            format!(
                "{} already exists and is not a link, it will not be cached between builds.",
                m2_path.display()
            ),
        ),
    }

    Ok(layer_ref)
}

/// Symlinks `link_path` to `layer_path`. A symlink pointing somewhere else is replaced, any other
/// existing file or directory is left as is.
pub(crate) fn link_cache(layer_path: &Path, link_path: &Path) -> Result<LinkOutcome, CacheLinkError> {
    match fs::symlink_metadata(link_path) {
        Ok(metadata) if metadata.file_type().is_symlink() => {
            let target = fs::read_link(link_path).map_err(|source| io_error(link_path, source))?;

            if target == layer_path {
                return Ok(LinkOutcome::AlreadyLinked);
            }

            fs::remove_file(link_path).map_err(|source| io_error(link_path, source))?;
        }
        Ok(_) => return Ok(LinkOutcome::Occupied),
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(error) => return Err(io_error(link_path, error)),
    }

    if let Some(parent) = link_path.parent() {
        fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
    }

    std::os::unix::fs::symlink(layer_path, link_path)
        .map_err(|source| io_error(link_path, source))?;

    Ok(LinkOutcome::Linked)
}

fn io_error(path: &Path, source: std::io::Error) -> CacheLinkError {
    CacheLinkError {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(thiserror::Error, Debug)]
#[error("I/O error at {}: {source}", .path.display())]
pub(crate) struct CacheLinkError {
    pub(crate) path: PathBuf,
    pub(crate) source: std::io::Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_cache_creates_link() {
        let temp_dir = tempfile::tempdir().unwrap();
        let layer_path = temp_dir.path().join("layers/cache");
        let link_path = temp_dir.path().join("home/.m2");
        fs::create_dir_all(&layer_path).unwrap();

        assert_eq!(
            link_cache(&layer_path, &link_path).unwrap(),
            LinkOutcome::Linked
        );
        assert_eq!(fs::read_link(&link_path).unwrap(), layer_path);

        fs::write(link_path.join("marker"), "cached").unwrap();
        assert!(layer_path.join("marker").is_file());
    }

    #[test]
    fn link_cache_keeps_existing_link() {
        let temp_dir = tempfile::tempdir().unwrap();
        let layer_path = temp_dir.path().join("layers/cache");
        let link_path = temp_dir.path().join(".m2");
        fs::create_dir_all(&layer_path).unwrap();

        link_cache(&layer_path, &link_path).unwrap();

        assert_eq!(
            link_cache(&layer_path, &link_path).unwrap(),
            LinkOutcome::AlreadyLinked
        );
    }

    #[test]
    fn link_cache_replaces_link_to_other_target() {
        let temp_dir = tempfile::tempdir().unwrap();
        let layer_path = temp_dir.path().join("layers/cache");
        let link_path = temp_dir.path().join(".m2");
        fs::create_dir_all(&layer_path).unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("old-layer"), &link_path).unwrap();

        assert_eq!(
            link_cache(&layer_path, &link_path).unwrap(),
            LinkOutcome::Linked
        );
        assert_eq!(fs::read_link(&link_path).unwrap(), layer_path);
    }

    #[test]
    fn link_cache_leaves_existing_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let layer_path = temp_dir.path().join("layers/cache");
        let link_path = temp_dir.path().join(".m2");
        fs::create_dir_all(&layer_path).unwrap();
        fs::create_dir_all(link_path.join("repository")).unwrap();

        assert_eq!(
            link_cache(&layer_path, &link_path).unwrap(),
            LinkOutcome::Occupied
        );
        assert!(link_path.join("repository").is_dir());
        assert!(!fs::symlink_metadata(&link_path)
            .unwrap()
            .file_type()
            .is_symlink());
    }
}
