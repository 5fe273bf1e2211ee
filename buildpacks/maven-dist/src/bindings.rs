//! Service bindings as mounted by the platform.
//!
//! Each binding is a directory containing a `type` file, an optional `provider` file and any
//! number of secret files. See: <https://github.com/buildpacks/spec/blob/main/extensions/bindings.md>

use libherokubuildpack::log::log_warning;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub(crate) const SERVICE_BINDING_ROOT: &str = "SERVICE_BINDING_ROOT";

const TYPE_FILE: &str = "type";
const PROVIDER_FILE: &str = "provider";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Binding {
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    pub(crate) binding_type: String,
    pub(crate) provider: Option<String>,
    pub(crate) secrets: BTreeSet<String>,
}

impl Binding {
    /// Reads a single binding from its directory.
    pub(crate) fn from_path(path: impl AsRef<Path>) -> Result<Self, BindingError> {
        let path = path.as_ref();

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| BindingError::InvalidBindingPath(path.to_path_buf()))?;

        let binding_type = read_trimmed(&path.join(TYPE_FILE))?
            .ok_or_else(|| BindingError::MissingType(path.to_path_buf()))?;

        let provider = read_trimmed(&path.join(PROVIDER_FILE))?;

        let mut secrets = BTreeSet::new();
        for entry in fs::read_dir(path).map_err(|source| io_error(path, source))? {
            let entry = entry.map_err(|source| io_error(path, source))?;
            let file_name = entry.file_name().to_string_lossy().to_string();

            // Kubernetes mounts secrets through hidden `..data` directories and symlinks.
            if file_name.starts_with('.') || file_name == TYPE_FILE || file_name == PROVIDER_FILE {
                continue;
            }

            if entry.path().is_file() {
                secrets.insert(file_name);
            }
        }

        Ok(Self {
            name,
            path: path.to_path_buf(),
            binding_type,
            provider,
            secrets,
        })
    }

    /// Returns the path of the named secret, if the binding has it.
    pub(crate) fn secret_file_path(&self, name: &str) -> Option<PathBuf> {
        self.secrets
            .contains(name)
            .then(|| self.path.join(name))
    }
}

/// Reads all bindings below the given root. A missing root means there are no bindings and
/// directories without a `type` file are skipped.
pub(crate) fn read_bindings(root: impl AsRef<Path>) -> Result<Vec<Binding>, BindingError> {
    let root = root.as_ref();

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(io_error(root, error)),
    };

    let mut bindings = Vec::new();
    for entry in entries {
        let path = entry.map_err(|source| io_error(root, source))?.path();

        let hidden = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'));

        if !path.is_dir() || hidden {
            continue;
        }

        match Binding::from_path(&path) {
            Ok(binding) => bindings.push(binding),
            Err(BindingError::MissingType(path)) => {
                log_warning(
                    "Ignoring binding",
                    format!("{} has no type file", path.display()),
                );
            }
            Err(error) => return Err(error),
        }
    }

    bindings.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(bindings)
}

/// Resolves at most one binding of the given type. The type comparison is case-insensitive.
pub(crate) fn resolve_one<'a>(
    bindings: &'a [Binding],
    binding_type: &str,
) -> Result<Option<&'a Binding>, BindingError> {
    let mut matching = bindings
        .iter()
        .filter(|binding| binding.binding_type.eq_ignore_ascii_case(binding_type));

    match (matching.next(), matching.count()) {
        (None, _) => Ok(None),
        (Some(binding), 0) => Ok(Some(binding)),
        (Some(_), additional) => Err(BindingError::MultipleBindings {
            binding_type: binding_type.to_string(),
            count: additional + 1,
        }),
    }
}

fn read_trimmed(path: &Path) -> Result<Option<String>, BindingError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents.trim().to_string())),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(io_error(path, error)),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> BindingError {
    BindingError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum BindingError {
    #[error("Couldn't read binding at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Binding path {} has no name", .0.display())]
    InvalidBindingPath(PathBuf),

    #[error("Binding at {} has no type", .0.display())]
    MissingType(PathBuf),

    #[error("Expected at most one binding of type {binding_type}, found {count}")]
    MultipleBindings { binding_type: String, count: usize },
}
