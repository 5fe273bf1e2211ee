use crate::dependency::BuildpackDependency;
use libcnb::data::sbom::SbomFormat;
use libcnb::sbom::Sbom;
use serde_json::{json, Map, Value};

/// A build Bill-of-Materials entry for a contributed dependency.
///
/// Distributions are only used while building, they are never part of the launch image.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BomEntry {
    pub(crate) name: String,
    pub(crate) dependency: BuildpackDependency,
}

impl BomEntry {
    pub(crate) fn for_dependency(dependency: &BuildpackDependency) -> Self {
        Self {
            name: dependency.id.clone(),
            dependency: dependency.clone(),
        }
    }

    /// Renders the entry as a CycloneDX 1.4 document with a single library component.
    pub(crate) fn cyclonedx(&self) -> Value {
        let mut component = Map::new();
        component.insert(String::from("type"), json!("library"));
        component.insert(String::from("name"), json!(self.name));
        component.insert(
            String::from("version"),
            json!(self.dependency.version.to_string()),
        );

        if let Some(description) = &self.dependency.name {
            component.insert(String::from("description"), json!(description));
        }

        if let Some(purl) = &self.dependency.purl {
            component.insert(String::from("purl"), json!(purl));
        }

        if let Some(cpe) = self.dependency.cpes.first() {
            component.insert(String::from("cpe"), json!(cpe));
        }

        if let Some(sha256) = self.dependency.sha256_hex() {
            component.insert(
                String::from("hashes"),
                json!([{ "alg": "SHA-256", "content": sha256 }]),
            );
        }

        let licenses = self
            .dependency
            .licenses
            .iter()
            .filter_map(|license| license.license_type.as_ref())
            .map(|id| json!({ "license": { "id": id } }))
            .collect::<Vec<_>>();

        if !licenses.is_empty() {
            component.insert(String::from("licenses"), Value::Array(licenses));
        }

        component.insert(
            String::from("externalReferences"),
            json!([{ "type": "distribution", "url": self.dependency.uri }]),
        );

        json!({
            "bomFormat": "CycloneDX",
            "specVersion": "1.4",
            "version": 1,
            "components": [Value::Object(component)],
        })
    }

    pub(crate) fn sbom(&self) -> Result<Sbom, serde_json::Error> {
        serde_json::to_vec_pretty(&self.cyclonedx())
            .map(|data| Sbom::from_bytes(SbomFormat::CycloneDxJson, data))
    }
}
