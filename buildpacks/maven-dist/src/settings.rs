//! Maven settings provided through a binding of type `maven`.

use crate::bindings::Binding;
use libherokubuildpack::digest::sha256;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub(crate) const MAVEN_BINDING_TYPE: &str = "maven";

pub(crate) const SETTINGS_XML: &str = "settings.xml";
pub(crate) const SETTINGS_SECURITY_XML: &str = "settings-security.xml";

pub(crate) const SETTINGS_SHA256: &str = "settings-sha256";
pub(crate) const SETTINGS_SECURITY_SHA256: &str = "settings-security-sha256";

/// Command line arguments pointing Maven to the bound settings, plus checksums of the bound files.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct MavenSettings {
    pub(crate) args: Vec<String>,
    pub(crate) metadata: BTreeMap<String, String>,
}

impl MavenSettings {
    /// The arguments joined for use as an environment variable value, `None` if there are none.
    pub(crate) fn joined_args(&self) -> Option<String> {
        if self.args.is_empty() {
            None
        } else {
            Some(self.args.join(" "))
        }
    }
}

/// Resolves the settings from an optional binding.
///
/// `settings-security.xml` is only taken into account if `settings.xml` is bound as well. Its
/// argument is placed before the `--settings` argument.
pub(crate) fn resolve(binding: Option<&Binding>) -> Result<MavenSettings, SettingsError> {
    let mut settings = MavenSettings::default();

    let Some(binding) = binding else {
        return Ok(settings);
    };

    let Some(settings_path) = binding.secret_file_path(SETTINGS_XML) else {
        return Ok(settings);
    };

    settings
        .metadata
        .insert(String::from(SETTINGS_SHA256), checksum(&settings_path)?);
    settings
        .args
        .insert(0, format!("--settings={}", settings_path.display()));

    if let Some(settings_security_path) = binding.secret_file_path(SETTINGS_SECURITY_XML) {
        settings.metadata.insert(
            String::from(SETTINGS_SECURITY_SHA256),
            checksum(&settings_security_path)?,
        );
        settings.args.insert(
            0,
            format!("-Dsettings.security={}", settings_security_path.display()),
        );
    }

    Ok(settings)
}

fn checksum(path: &Path) -> Result<String, SettingsError> {
    sha256(path).map_err(|source| SettingsError {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(thiserror::Error, Debug)]
#[error("Couldn't hash {}: {source}", .path.display())]
pub(crate) struct SettingsError {
    pub(crate) path: PathBuf,
    pub(crate) source: std::io::Error,
}
