use crate::archive::extract_zip;
use crate::dependency::BuildpackDependency;
use crate::dependency_cache::DependencyCache;
use crate::errors::MavenDistBuildpackError;
use crate::plan::MavenDistPlan;
use crate::settings::MavenSettings;
use crate::MavenDistBuildpack;
use libcnb::build::BuildContext;
use libcnb::layer::{
    CachedLayerDefinition, InvalidMetadataAction, LayerRef, LayerState, RestoredLayerAction,
};
use libcnb::layer_env::{LayerEnv, ModificationBehavior, Scope};
use libherokubuildpack::log::{log_header, log_info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub(crate) const BP_MAVEN_SECURITY_ARGS: &str = "BP_MAVEN_SECURITY_ARGS";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct DistributionLayerMetadata {
    dependency: BuildpackDependency,
    #[serde(default)]
    settings: BTreeMap<String, String>,
    #[serde(default)]
    security_args: Vec<String>,
}

impl DistributionLayerMetadata {
    fn new(dependency: &BuildpackDependency, settings: &MavenSettings) -> Self {
        Self {
            dependency: dependency.clone(),
            settings: settings.metadata.clone(),
            security_args: settings.args.clone(),
        }
    }
}

/// Installs the distribution of the planned tool into a layer that is available during the build.
pub(crate) fn handle(
    context: &BuildContext<MavenDistBuildpack>,
    plan: &MavenDistPlan,
    cache: &impl DependencyCache,
    settings: &MavenSettings,
) -> libcnb::Result<LayerRef<MavenDistBuildpack, (), ()>, MavenDistBuildpackError> {
    let dependency = &plan.dependency;
    log_header(format!("{} {}", dependency.display_name(), dependency.version));

    let expected_metadata = DistributionLayerMetadata::new(dependency, settings);

    let layer_ref = context.cached_layer(
        plan.tool.layer_name(),
        CachedLayerDefinition {
            build: true,
            launch: false,
            invalid_metadata_action: &|_| InvalidMetadataAction::DeleteLayer,
            restored_layer_action: &|metadata: &DistributionLayerMetadata, _| {
                restored_layer_action(metadata, &expected_metadata)
            },
        },
    )?;

    match layer_ref.state {
        LayerState::Restored { .. } => {
            log_info(format!("Reusing cached {}", dependency.display_name()));
        }
        LayerState::Empty { .. } => {
            contribute(&layer_ref.path(), dependency, cache, settings)?;
            layer_ref.write_metadata(expected_metadata)?;
        }
    }

    Ok(layer_ref)
}

/// A restored layer is only kept when it holds the same distribution built with the same settings.
fn restored_layer_action(
    metadata: &DistributionLayerMetadata,
    expected_metadata: &DistributionLayerMetadata,
) -> RestoredLayerAction {
    if metadata == expected_metadata {
        RestoredLayerAction::KeepLayer
    } else {
        RestoredLayerAction::DeleteLayer
    }
}

/// Expands the verified distribution into the empty layer and writes its build environment.
fn contribute(
    layer_path: &Path,
    dependency: &BuildpackDependency,
    cache: &impl DependencyCache,
    settings: &MavenSettings,
) -> Result<(), MavenDistBuildpackError> {
    let artifact = cache
        .artifact(dependency)
        .map_err(MavenDistBuildpackError::DependencyCache)?;

    log_info(format!("Expanding to {}", layer_path.display()));
    extract_zip(&artifact, layer_path, 1).map_err(MavenDistBuildpackError::Extract)?;

    if let Some(layer_env) = security_args_env(settings) {
        log_info(format!("Writing ${BP_MAVEN_SECURITY_ARGS} to layer environment"));
        layer_env
            .write_to_layer_dir(layer_path)
            .map_err(MavenDistBuildpackError::LayerEnv)?;
    }

    Ok(())
}

fn security_args_env(settings: &MavenSettings) -> Option<LayerEnv> {
    settings.joined_args().map(|args| {
        LayerEnv::new().chainable_insert(
            Scope::Build,
            ModificationBehavior::Override,
            BP_MAVEN_SECURITY_ARGS,
            args,
        )
    })
}
