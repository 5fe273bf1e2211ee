use crate::bindings::{read_bindings, Binding, BindingError, SERVICE_BINDING_ROOT};
use libcnb::generic::GenericPlatform;
use libcnb::{Env, Platform};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// A platform that, in addition to environment variables, provides access to service bindings.
pub(crate) struct MavenDistPlatform {
    env: Env,
    bindings_root: PathBuf,
}

impl MavenDistPlatform {
    pub(crate) fn new(env: Env, bindings_root: impl Into<PathBuf>) -> Self {
        Self {
            env,
            bindings_root: bindings_root.into(),
        }
    }

    pub(crate) fn bindings(&self) -> Result<Vec<Binding>, BindingError> {
        read_bindings(&self.bindings_root)
    }
}

impl Platform for MavenDistPlatform {
    fn env(&self) -> &Env {
        &self.env
    }

    fn from_path(platform_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let platform_dir = platform_dir.as_ref();
        let bindings_root =
            bindings_root(platform_dir, std::env::var_os(SERVICE_BINDING_ROOT));

        GenericPlatform::from_path(platform_dir)
            .map(|platform| Self::new(platform.env().clone(), bindings_root))
    }
}

/// `SERVICE_BINDING_ROOT` takes precedence over `<platform>/bindings`.
fn bindings_root(platform_dir: &Path, service_binding_root: Option<OsString>) -> PathBuf {
    service_binding_root.map_or_else(|| platform_dir.join("bindings"), PathBuf::from)
}
