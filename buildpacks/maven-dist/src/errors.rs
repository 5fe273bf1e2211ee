use crate::archive::ExtractError;
use crate::bindings::BindingError;
use crate::dependency::DependencyResolutionError;
use crate::dependency_cache::DependencyCacheError;
use crate::layers::m2_cache::CacheLinkError;
use crate::plan::PlanError;
use crate::settings::SettingsError;
use libherokubuildpack::inventory::artifact::UnsupportedArchError;
use libherokubuildpack::log::log_error;

#[derive(thiserror::Error, Debug)]
pub(crate) enum MavenDistBuildpackError {
    #[error("Couldn't write build plan metadata: {0}")]
    BuildPlanMetadata(#[source] toml::ser::Error),

    #[error("Invalid build plan: {0}")]
    Plan(#[source] PlanError),

    #[error("Couldn't read platform bindings: {0}")]
    Binding(#[source] BindingError),

    #[error("Couldn't read Maven settings: {0}")]
    Settings(#[source] SettingsError),

    #[error("Couldn't determine the home directory of the build user")]
    HomeDirectory,

    #[error("{0}")]
    UnsupportedArch(#[source] UnsupportedArchError),

    #[error("{0}")]
    DependencyResolution(#[source] DependencyResolutionError),

    #[error("Couldn't provide distribution artifact: {0}")]
    DependencyCache(#[source] DependencyCacheError),

    #[error("Couldn't expand distribution: {0}")]
    Extract(#[source] ExtractError),

    #[error("Couldn't write distribution layer environment: {0}")]
    LayerEnv(#[source] std::io::Error),

    #[error("Couldn't link the local Maven repository: {0}")]
    CacheLink(#[source] CacheLinkError),

    #[error("Couldn't write SBOM: {0}")]
    Sbom(#[source] serde_json::Error),
}

impl From<MavenDistBuildpackError> for libcnb::Error<MavenDistBuildpackError> {
    fn from(error: MavenDistBuildpackError) -> Self {
        libcnb::Error::BuildpackError(error)
    }
}

pub(crate) fn on_maven_dist_buildpack_error(error: MavenDistBuildpackError) {
    match error {
        MavenDistBuildpackError::BuildPlanMetadata(_) | MavenDistBuildpackError::Plan(_) => {
            log_error("Invalid build plan", error.to_string());
        }
        MavenDistBuildpackError::Binding(_) | MavenDistBuildpackError::Settings(_) => {
            log_error("Invalid Maven binding", error.to_string());
        }
        MavenDistBuildpackError::HomeDirectory | MavenDistBuildpackError::CacheLink(_) => {
            log_error("Maven cache error", error.to_string());
        }
        MavenDistBuildpackError::UnsupportedArch(_)
        | MavenDistBuildpackError::DependencyResolution(_) => {
            log_error("No matching distribution", error.to_string());
        }
        MavenDistBuildpackError::DependencyCache(_)
        | MavenDistBuildpackError::Extract(_)
        | MavenDistBuildpackError::LayerEnv(_) => {
            log_error("Distribution install error", error.to_string());
        }
        MavenDistBuildpackError::Sbom(_) => {
            log_error("SBOM error", error.to_string());
        }
    }
}
