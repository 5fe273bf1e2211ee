use crate::dependency::BuildpackDependency;
use libcnb::Env;
use libherokubuildpack::log::log_info;
use serde::Deserialize;

pub(crate) const BP_MAVEN_DAEMON_ENABLED: &str = "BP_MAVEN_DAEMON_ENABLED";

/// The `[metadata]` table of `buildpack.toml`.
#[derive(Deserialize, Debug, Default)]
pub(crate) struct MavenDistBuildpackMetadata {
    #[serde(default)]
    pub(crate) dependencies: Vec<BuildpackDependency>,
    #[serde(default)]
    pub(crate) configurations: Vec<Configuration>,
}

/// A user facing configuration option, backed by an environment variable.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct Configuration {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) default: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) build: bool,
    #[serde(default)]
    pub(crate) launch: bool,
}

/// Resolves configuration values from the platform environment, falling back to the declared
/// defaults.
pub(crate) struct ConfigurationResolver<'a> {
    configurations: &'a [Configuration],
    env: &'a Env,
}

impl<'a> ConfigurationResolver<'a> {
    pub(crate) fn new(configurations: &'a [Configuration], env: &'a Env) -> Self {
        Self {
            configurations,
            env,
        }
    }

    pub(crate) fn resolve(&self, name: &str) -> Option<String> {
        self.env
            .get_string_lossy(name)
            .map(|value| value.trim().to_string())
            .or_else(|| {
                self.configurations
                    .iter()
                    .find(|configuration| configuration.name == name)
                    .and_then(|configuration| configuration.default.clone())
            })
    }

    pub(crate) fn resolve_bool(&self, name: &str) -> bool {
        self.resolve(name).is_some_and(|value| {
            matches!(value.to_lowercase().as_str(), "1" | "t" | "true" | "yes")
        })
    }

    fn configuration_lines(&self, selected: impl Fn(&Configuration) -> bool) -> Vec<String> {
        let width = self
            .configurations
            .iter()
            .filter(|&configuration| selected(configuration))
            .map(|configuration| configuration.name.len() + 1)
            .max()
            .unwrap_or_default();

        self.configurations
            .iter()
            .filter(|&configuration| selected(configuration))
            .map(|configuration| {
                let value = self.resolve(&configuration.name).unwrap_or_default();
                let line = format!(
                    "    {:<width$}  {value}",
                    format!("${}", configuration.name)
                );

                match &configuration.description {
                    Some(description) => format!("{line}  {description}"),
                    None => line,
                }
            })
            .collect()
    }

    /// Logs the resolved build and launch configuration tables.
    pub(crate) fn log_configuration(&self) {
        for (title, lines) in [
            ("Build", self.configuration_lines(|configuration| configuration.build)),
            ("Launch", self.configuration_lines(|configuration| configuration.launch)),
        ] {
            if !lines.is_empty() {
                log_info(format!("  {title} Configuration:"));
                for line in lines {
                    log_info(line);
                }
            }
        }
    }
}
