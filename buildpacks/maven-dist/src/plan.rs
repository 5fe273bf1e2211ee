//! Decides what a build contributes, based on the buildpack plan and the declared dependencies.

use crate::bom::BomEntry;
use crate::dependency::{self, BuildpackDependency};
use crate::errors::MavenDistBuildpackError;
use libcnb::data::build_plan::{BuildPlan, BuildPlanBuilder, Require};
use libcnb::data::buildpack_plan::BuildpackPlan;
use libcnb::data::layer::LayerName;
use libcnb::data::layer_name;
use libherokubuildpack::inventory::artifact::Arch;
use serde::Serialize;
use std::path::PathBuf;
use toml::{Table, Value};

pub(crate) const PLAN_ENTRY_MAVEN: &str = "maven";
pub(crate) const COMMAND: &str = "command";

/// The build tool distribution to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tool {
    Maven,
    /// The Maven Daemon.
    Mvnd,
}

impl Tool {
    /// Anything but `mvnd` selects Maven.
    pub(crate) fn from_command(command: &str) -> Self {
        if command == Tool::Mvnd.command() {
            Tool::Mvnd
        } else {
            Tool::Maven
        }
    }

    pub(crate) fn command(self) -> &'static str {
        match self {
            Tool::Maven => "mvn",
            Tool::Mvnd => "mvnd",
        }
    }

    pub(crate) fn dependency_id(self) -> &'static str {
        match self {
            Tool::Maven => "maven",
            Tool::Mvnd => "mvnd",
        }
    }

    pub(crate) fn layer_name(self) -> LayerName {
        match self {
            Tool::Maven => layer_name!("maven"),
            Tool::Mvnd => layer_name!("mvnd"),
        }
    }
}

pub(crate) fn m2_cache_layer_name() -> LayerName {
    layer_name!("cache")
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MavenDistPlan {
    pub(crate) tool: Tool,
    pub(crate) dependency: BuildpackDependency,
    pub(crate) m2_path: PathBuf,
}

impl MavenDistPlan {
    pub(crate) fn layer_names(&self) -> Vec<LayerName> {
        vec![self.tool.layer_name(), m2_cache_layer_name()]
    }

    pub(crate) fn bom_entries(&self) -> Vec<BomEntry> {
        vec![BomEntry::for_dependency(&self.dependency)]
    }
}

/// The build plan requested during detect: this buildpack provides `maven` and requires it with
/// the command of the given tool, so it also works without another buildpack requiring `maven`.
pub(crate) fn detect_build_plan(tool: Tool) -> Result<BuildPlan, toml::ser::Error> {
    #[derive(Serialize)]
    struct RequireMetadata {
        command: &'static str,
    }

    let mut require = Require::new(PLAN_ENTRY_MAVEN);
    require.metadata(RequireMetadata {
        command: tool.command(),
    })?;

    Ok(BuildPlanBuilder::new()
        .provides(PLAN_ENTRY_MAVEN)
        .requires(require)
        .build())
}

/// Resolves the metadata of the plan entries with the given name. Metadata of multiple entries is
/// merged, later entries take precedence.
pub(crate) fn resolve_entry(plan: &BuildpackPlan, name: &str) -> Result<Table, PlanError> {
    let mut entries = plan
        .entries
        .iter()
        .filter(|entry| entry.name == name)
        .peekable();

    if entries.peek().is_none() {
        return Err(PlanError::MissingEntry(name.to_string()));
    }

    Ok(entries.fold(Table::new(), |mut metadata, entry| {
        metadata.extend(entry.metadata.clone());
        metadata
    }))
}

pub(crate) fn resolve_tool(metadata: &Table) -> Result<Tool, PlanError> {
    match metadata.get(COMMAND) {
        Some(Value::String(command)) => Ok(Tool::from_command(command)),
        Some(other) => Err(PlanError::InvalidCommand(other.to_string())),
        None => Err(PlanError::MissingCommand),
    }
}

/// The home directory is only looked up once the tool and its dependency are resolved.
pub(crate) fn plan(
    metadata: &Table,
    dependencies: &[BuildpackDependency],
    stack_id: Option<&str>,
    arch: &str,
    home_dir: impl FnOnce() -> Option<PathBuf>,
) -> Result<MavenDistPlan, MavenDistBuildpackError> {
    let tool = resolve_tool(metadata).map_err(MavenDistBuildpackError::Plan)?;
    let arch = arch
        .parse::<Arch>()
        .map_err(MavenDistBuildpackError::UnsupportedArch)?;

    let dependency = dependency::resolve(dependencies, tool.dependency_id(), stack_id, arch)
        .map_err(MavenDistBuildpackError::DependencyResolution)?
        .clone();

    let home_dir = home_dir().ok_or(MavenDistBuildpackError::HomeDirectory)?;

    Ok(MavenDistPlan {
        tool,
        dependency,
        m2_path: home_dir.join(".m2"),
    })
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum PlanError {
    #[error("Unable to find {0} in build plan")]
    MissingEntry(String),

    #[error("Unable to find command to install")]
    MissingCommand,

    #[error("Command to install must be a string, got {0}")]
    InvalidCommand(String),
}
