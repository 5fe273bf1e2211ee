//! Dependencies declared in `buildpack.toml` under `[[metadata.dependencies]]`.

use libherokubuildpack::inventory::artifact::Arch;
use libherokubuildpack::inventory::checksum::Checksum;
use semver::Version;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct BuildpackDependency {
    pub(crate) id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    pub(crate) version: Version,
    pub(crate) uri: String,
    /// Written as `sha256:<hex>`. Unpinned dependencies are never downloaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) sha256: Option<Checksum<Sha256>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) arch: Option<Arch>,
    #[serde(default)]
    pub(crate) stacks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) purl: Option<String>,
    #[serde(default)]
    pub(crate) cpes: Vec<String>,
    #[serde(default)]
    pub(crate) licenses: Vec<DependencyLicense>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DependencyLicense {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub(crate) license_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) uri: Option<String>,
}

impl BuildpackDependency {
    pub(crate) fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// The lowercase hex encoding of the SHA-256 checksum.
    pub(crate) fn sha256_hex(&self) -> Option<String> {
        self.sha256
            .as_ref()
            .map(|checksum| hex::encode(&checksum.value))
    }

    /// The file name of the artifact, taken from the last segment of its URI.
    pub(crate) fn file_name(&self) -> String {
        let path = self.uri.split(['?', '#']).next().unwrap_or_default();

        match path.rsplit('/').next() {
            Some(file_name) if !file_name.is_empty() => file_name.to_string(),
            _ => format!("{}-{}", self.id, self.version),
        }
    }

    fn supports_stack(&self, stack_id: Option<&str>) -> bool {
        match stack_id {
            None => true,
            Some(stack_id) => {
                self.stacks.is_empty()
                    || self
                        .stacks
                        .iter()
                        .any(|stack| stack == "*" || stack == stack_id)
            }
        }
    }

    /// Dependencies without an architecture are architecture independent.
    fn supports_arch(&self, arch: Arch) -> bool {
        self.arch.is_none_or(|value| value == arch)
    }
}

/// Resolves the newest dependency with the given id that supports the stack and architecture.
pub(crate) fn resolve<'a>(
    dependencies: &'a [BuildpackDependency],
    id: &str,
    stack_id: Option<&str>,
    arch: Arch,
) -> Result<&'a BuildpackDependency, DependencyResolutionError> {
    dependencies
        .iter()
        .filter(|dependency| {
            dependency.id == id
                && dependency.supports_stack(stack_id)
                && dependency.supports_arch(arch)
        })
        .max_by_key(|dependency| &dependency.version)
        .ok_or_else(|| DependencyResolutionError {
            id: id.to_string(),
            stack_id: stack_id.unwrap_or("*").to_string(),
            arch,
            candidates: dependencies
                .iter()
                .filter(|dependency| dependency.id == id)
                .map(|dependency| dependency.version.to_string())
                .collect(),
        })
}

#[derive(thiserror::Error, Debug)]
#[error(
    "No dependency with id {id} supports stack {stack_id} and architecture {arch} (candidate versions: [{}])",
    .candidates.join(", ")
)]
pub(crate) struct DependencyResolutionError {
    pub(crate) id: String,
    pub(crate) stack_id: String,
    pub(crate) arch: Arch,
    pub(crate) candidates: Vec<String>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// `sha256("distribution")`
    pub(crate) const DISTRIBUTION_SHA256: &str =
        "93354845030274cd4bf1686abd60ab28ec52e1a792fa6f7ccb9cbd0ddff53d12";

    pub(crate) fn dependency(id: &str, version: &str) -> BuildpackDependency {
        BuildpackDependency {
            id: id.to_string(),
            name: None,
            version: Version::parse(version).unwrap(),
            uri: format!("https://example.com/{id}/{version}/{id}-{version}-bin.zip"),
            sha256: Some(format!("sha256:{DISTRIBUTION_SHA256}").parse().unwrap()),
            arch: None,
            stacks: vec![String::from("test-stack-id")],
            purl: None,
            cpes: Vec::new(),
            licenses: Vec::new(),
        }
    }

    #[test]
    fn deserialize_from_buildpack_metadata() {
        let dependency: BuildpackDependency = toml::from_str(indoc::indoc! {r#"
            id = "maven"
            name = "Apache Maven"
            version = "3.9.9"
            uri = "https://example.com/apache-maven-3.9.9-bin.zip"
            sha256 = "sha256:93354845030274cd4bf1686abd60ab28ec52e1a792fa6f7ccb9cbd0ddff53d12"
            stacks = ["*"]
            purl = "pkg:generic/apache-maven@3.9.9"
            cpes = ["cpe:2.3:a:apache:maven:3.9.9:*:*:*:*:*:*:*"]

            [[licenses]]
            type = "Apache-2.0"
        "#})
        .unwrap();

        assert_eq!(dependency.display_name(), "Apache Maven");
        assert_eq!(dependency.version, Version::new(3, 9, 9));
        assert_eq!(dependency.sha256_hex().as_deref(), Some(DISTRIBUTION_SHA256));
        assert_eq!(
            dependency.licenses[0].license_type.as_deref(),
            Some("Apache-2.0")
        );
        assert_eq!(dependency.arch, None);
    }

    #[test]
    fn uppercase_checksum_is_normalized() {
        let dependency: BuildpackDependency = toml::from_str(indoc::indoc! {r#"
            id = "mvnd"
            version = "1.0.2"
            uri = "https://example.com/maven-mvnd-1.0.2-linux-aarch64.zip"
            sha256 = "sha256:93354845030274CD4BF1686ABD60AB28EC52E1A792FA6F7CCB9CBD0DDFF53D12"
            arch = "arm64"
        "#})
        .unwrap();

        assert_eq!(dependency.sha256_hex().as_deref(), Some(DISTRIBUTION_SHA256));
        assert_eq!(dependency.arch, Some(Arch::Arm64));
    }

    #[test]
    fn missing_checksum_is_unpinned() {
        let dependency: BuildpackDependency = toml::from_str(indoc::indoc! {r#"
            id = "maven"
            version = "3.9.9"
            uri = "https://example.com/apache-maven-3.9.9-bin.zip"
        "#})
        .unwrap();

        assert_eq!(dependency.sha256_hex(), None);
    }

    #[test]
    fn invalid_checksums_are_rejected() {
        for sha256 in [
            "",
            "sha256:",
            "93354845030274cd4bf1686abd60ab28ec52e1a792fa6f7ccb9cbd0ddff53d12",
            "sha256:9335",
            "sha512:93354845030274cd4bf1686abd60ab28ec52e1a792fa6f7ccb9cbd0ddff53d12",
            "sha256:zz354845030274cd4bf1686abd60ab28ec52e1a792fa6f7ccb9cbd0ddff53d12",
        ] {
            let result = toml::from_str::<BuildpackDependency>(&format!(
                "id = \"maven\"\nversion = \"3.9.9\"\nuri = \"https://example.com/maven.zip\"\nsha256 = \"{sha256}\"\n"
            ));

            assert!(result.is_err(), "{sha256:?} should be rejected");
        }
    }

    #[test]
    fn file_name_from_uri() {
        let mut dependency = dependency("maven", "3.9.9");
        assert_eq!(dependency.file_name(), "maven-3.9.9-bin.zip");

        dependency.uri = String::from("https://example.com/download/mvnd.zip?mirror=eu");
        assert_eq!(dependency.file_name(), "mvnd.zip");

        dependency.uri = String::from("https://example.com/download/");
        assert_eq!(dependency.file_name(), "maven-3.9.9");
    }

    #[test]
    fn resolve_newest_matching_version() {
        let dependencies = vec![
            dependency("maven", "3.8.8"),
            dependency("maven", "3.9.9"),
            dependency("mvnd", "1.0.2"),
        ];

        let resolved =
            resolve(&dependencies, "maven", Some("test-stack-id"), Arch::Amd64).unwrap();
        assert_eq!(resolved.version, Version::new(3, 9, 9));

        let resolved = resolve(&dependencies, "mvnd", Some("test-stack-id"), Arch::Amd64).unwrap();
        assert_eq!(resolved.id, "mvnd");
    }

    #[test]
    fn resolve_respects_stacks() {
        let mut wildcard = dependency("maven", "3.8.8");
        wildcard.stacks = vec![String::from("*")];
        let dependencies = vec![wildcard, dependency("maven", "3.9.9")];

        let resolved =
            resolve(&dependencies, "maven", Some("other-stack-id"), Arch::Amd64).unwrap();
        assert_eq!(resolved.version, Version::new(3, 8, 8));

        let resolved = resolve(&dependencies, "maven", None, Arch::Amd64).unwrap();
        assert_eq!(resolved.version, Version::new(3, 9, 9));
    }

    #[test]
    fn resolve_respects_arch() {
        let mut amd64 = dependency("mvnd", "1.0.2");
        amd64.arch = Some(Arch::Amd64);
        let mut arm64 = dependency("mvnd", "1.0.2");
        arm64.arch = Some(Arch::Arm64);
        arm64.uri = String::from("https://example.com/maven-mvnd-1.0.2-linux-aarch64.zip");
        let dependencies = vec![amd64, arm64];

        let resolved = resolve(&dependencies, "mvnd", None, Arch::Arm64).unwrap();
        assert_eq!(resolved.file_name(), "maven-mvnd-1.0.2-linux-aarch64.zip");
    }

    #[test]
    fn resolve_without_candidates() {
        let dependencies = vec![dependency("maven", "3.9.9")];

        let error =
            resolve(&dependencies, "maven", Some("other-stack-id"), Arch::Amd64).unwrap_err();

        assert_eq!(
            error.to_string(),
            "No dependency with id maven supports stack other-stack-id and architecture amd64 (candidate versions: [3.9.9])"
        );
    }
}
