mod archive;
mod bindings;
mod bom;
mod config;
mod dependency;
mod dependency_cache;
mod errors;
mod layers;
mod plan;
mod platform;
mod settings;

use crate::config::{ConfigurationResolver, MavenDistBuildpackMetadata, BP_MAVEN_DAEMON_ENABLED};
use crate::dependency_cache::DownloadDependencyCache;
use crate::errors::{on_maven_dist_buildpack_error, MavenDistBuildpackError};
use crate::layers::{distribution, m2_cache};
use crate::plan::{Tool, PLAN_ENTRY_MAVEN};
use crate::platform::MavenDistPlatform;
use crate::settings::MAVEN_BINDING_TYPE;
use libcnb::build::{BuildContext, BuildResult, BuildResultBuilder};
use libcnb::detect::{DetectContext, DetectResult, DetectResultBuilder};
use libcnb::{buildpack_main, Buildpack, Platform};
use libherokubuildpack::log::{log_header, log_info};

// Suppress warnings due to the `unused_crate_dependencies` lint not handling integration tests well.
#[cfg(test)]
use libcnb_test as _;

const CNB_STACK_ID: &str = "CNB_STACK_ID";

pub(crate) struct MavenDistBuildpack;

impl Buildpack for MavenDistBuildpack {
    type Platform = MavenDistPlatform;
    type Metadata = MavenDistBuildpackMetadata;
    type Error = MavenDistBuildpackError;

    fn detect(&self, context: DetectContext<Self>) -> libcnb::Result<DetectResult, Self::Error> {
        let configuration = ConfigurationResolver::new(
            &context.buildpack_descriptor.metadata.configurations,
            context.platform.env(),
        );

        let tool = if configuration.resolve_bool(BP_MAVEN_DAEMON_ENABLED) {
            Tool::Mvnd
        } else {
            Tool::Maven
        };

        DetectResultBuilder::pass()
            .build_plan(
                plan::detect_build_plan(tool).map_err(MavenDistBuildpackError::BuildPlanMetadata)?,
            )
            .build()
    }

    fn build(&self, context: BuildContext<Self>) -> libcnb::Result<BuildResult, Self::Error> {
        let descriptor = &context.buildpack_descriptor;
        log_header(format!(
            "{} {}",
            descriptor.buildpack.name.as_deref().unwrap_or("Maven Distribution"),
            descriptor.buildpack.version
        ));

        ConfigurationResolver::new(&descriptor.metadata.configurations, context.platform.env())
            .log_configuration();

        let entry = plan::resolve_entry(&context.buildpack_plan, PLAN_ENTRY_MAVEN)
            .map_err(MavenDistBuildpackError::Plan)?;

        let bindings = context
            .platform
            .bindings()
            .map_err(MavenDistBuildpackError::Binding)?;
        let binding = bindings::resolve_one(&bindings, MAVEN_BINDING_TYPE)
            .map_err(MavenDistBuildpackError::Binding)?;
        if let Some(binding) = binding {
            log_info(format!(
                "Using {} binding {} ({})",
                binding.binding_type,
                binding.name,
                binding.provider.as_deref().unwrap_or("unknown provider")
            ));
        }
        let settings = settings::resolve(binding).map_err(MavenDistBuildpackError::Settings)?;

        let stack_id = std::env::var(CNB_STACK_ID).ok();

        let plan = plan::plan(
            &entry,
            &descriptor.metadata.dependencies,
            stack_id.as_deref(),
            &context.target.arch,
            dirs::home_dir,
        )?;
        log_info(format!(
            "Resolved {} {} for {}",
            plan.dependency.display_name(),
            plan.dependency.version,
            plan.tool.command()
        ));

        let cache = DownloadDependencyCache::new(
            &context.buildpack_dir,
            std::env::temp_dir().join("maven-dist-downloads"),
        );

        distribution::handle(&context, &plan, &cache, &settings)?;
        m2_cache::handle(&context, &plan.m2_path)?;

        log_info(format!(
            "Contributed layers: {}",
            plan.layer_names()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ));

        let mut result = BuildResultBuilder::new();
        for bom_entry in plan.bom_entries() {
            let sbom = bom_entry.sbom().map_err(MavenDistBuildpackError::Sbom)?;
            result = result.build_sbom(sbom);
        }

        result.build()
    }

    fn on_error(&self, error: libcnb::Error<Self::Error>) {
        libherokubuildpack::error::on_error(on_maven_dist_buildpack_error, error);
    }
}

buildpack_main!(MavenDistBuildpack);
