use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Extracts a ZIP archive into `destination`, dropping the first `strip_components` components of
/// every entry path. Entries that have no path left after stripping are skipped.
pub(crate) fn extract_zip(
    archive_path: &Path,
    destination: &Path,
    strip_components: usize,
) -> Result<(), ExtractError> {
    let file = File::open(archive_path).map_err(|source| io_error(archive_path, source))?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;

        let entry_path = entry
            .enclosed_name()
            .ok_or_else(|| ExtractError::InvalidEntryName(entry.name().to_string()))?;

        let stripped = entry_path
            .components()
            .skip(strip_components)
            .collect::<PathBuf>();

        if stripped.as_os_str().is_empty() {
            continue;
        }

        let target = destination.join(stripped);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|source| io_error(&target, source))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }

        let mut output = File::create(&target).map_err(|source| io_error(&target, source))?;
        std::io::copy(&mut entry, &mut output).map_err(|source| io_error(&target, source))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&target, fs::Permissions::from_mode(mode))
                    .map_err(|source| io_error(&target, source))?;
            }
        }
    }

    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> ExtractError {
    ExtractError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum ExtractError {
    #[error("Invalid ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("ZIP entry {0} escapes the destination directory")]
    InvalidEntryName(String),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_distribution_zip(path: &Path) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default();

        writer
            .add_directory("apache-maven-3.9.9/", options)
            .unwrap();
        writer
            .start_file(
                "apache-maven-3.9.9/bin/mvn",
                options.unix_permissions(0o755),
            )
            .unwrap();
        writer.write_all(b"#!/bin/sh\n").unwrap();
        writer
            .start_file("apache-maven-3.9.9/conf/settings.xml", options)
            .unwrap();
        writer.write_all(b"<settings/>").unwrap();
        writer.start_file("README.txt", options).unwrap();
        writer.write_all(b"top-level file").unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn extract_zip_strips_first_component() {
        let temp_dir = tempfile::tempdir().unwrap();
        let archive_path = temp_dir.path().join("apache-maven-3.9.9-bin.zip");
        let layer_dir = temp_dir.path().join("layer");
        write_distribution_zip(&archive_path);

        extract_zip(&archive_path, &layer_dir, 1).unwrap();

        assert_eq!(
            fs::read_to_string(layer_dir.join("bin/mvn")).unwrap(),
            "#!/bin/sh\n"
        );
        assert_eq!(
            fs::read_to_string(layer_dir.join("conf/settings.xml")).unwrap(),
            "<settings/>"
        );
        assert!(!layer_dir.join("apache-maven-3.9.9").exists());
        assert!(!layer_dir.join("README.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn extract_zip_keeps_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let archive_path = temp_dir.path().join("apache-maven-3.9.9-bin.zip");
        let layer_dir = temp_dir.path().join("layer");
        write_distribution_zip(&archive_path);

        extract_zip(&archive_path, &layer_dir, 1).unwrap();

        let mode = fs::metadata(layer_dir.join("bin/mvn"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn extract_zip_without_stripping() {
        let temp_dir = tempfile::tempdir().unwrap();
        let archive_path = temp_dir.path().join("apache-maven-3.9.9-bin.zip");
        let layer_dir = temp_dir.path().join("layer");
        write_distribution_zip(&archive_path);

        extract_zip(&archive_path, &layer_dir, 0).unwrap();

        assert!(layer_dir.join("apache-maven-3.9.9/bin/mvn").is_file());
        assert!(layer_dir.join("README.txt").is_file());
    }

    #[test]
    fn extract_malformed_zip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let archive_path = temp_dir.path().join("broken.zip");
        fs::write(&archive_path, "this is not a zip file").unwrap();

        assert!(matches!(
            extract_zip(&archive_path, &temp_dir.path().join("layer"), 1),
            Err(ExtractError::Zip(_))
        ));
    }

    #[test]
    fn extract_missing_zip() {
        let temp_dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            extract_zip(
                &temp_dir.path().join("missing.zip"),
                &temp_dir.path().join("layer"),
                1
            ),
            Err(ExtractError::Io { .. })
        ));
    }
}
