//! Bundler stats manifest model. The wire shape is fixed by the
//! bundler: a `modules` array whose entries may themselves carry a
//! nested `modules` array for concatenated groups, which must be
//! flattened before graph construction.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub modules: Vec<ManifestModule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestModule {
    /// Absolute resource path, when the bundler reports one.
    #[serde(default)]
    pub resource: Option<String>,
    /// Project-relative module name, used when `resource` is absent.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<ManifestDependency>,
    #[serde(default)]
    pub reasons: Vec<ManifestReason>,
    /// Concatenated module group; inner entries become graph nodes of
    /// their own.
    #[serde(default)]
    pub modules: Option<Vec<ManifestModule>>,
}

impl ManifestModule {
    /// The request string identifying this module, preferring the
    /// concrete resource path over the bundler-assigned name.
    pub fn request(&self) -> Option<&str> {
        self.resource
            .as_deref()
            .or(self.name.as_deref())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDependency {
    #[serde(default)]
    pub request: Option<String>,
    #[serde(default)]
    pub module_name: Option<String>,
}

impl ManifestDependency {
    pub fn request(&self) -> Option<&str> {
        self.request
            .as_deref()
            .or(self.module_name.as_deref())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestReason {
    #[serde(default)]
    pub module_name: Option<String>,
}

impl Manifest {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Flattens nested concatenated groups into one module list. A
    /// group entry that also names its own resource is kept alongside
    /// its inner modules.
    pub fn flatten(&self) -> Vec<&ManifestModule> {
        let mut flat = Vec::new();
        for module in &self.modules {
            flatten_into(module, &mut flat);
        }
        flat
    }
}

fn flatten_into<'a>(module: &'a ManifestModule, out: &mut Vec<&'a ManifestModule>) {
    if module.request().is_some() {
        out.push(module);
    }
    if let Some(inner) = &module.modules {
        for child in inner {
            flatten_into(child, out);
        }
    }
}
