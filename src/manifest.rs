use crate::error::{FsContext, PacmError, Result};
use crate::fsutil;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE: &str = "package.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(flatten)]
    pub other: IndexMap<String, serde_json::Value>,
}

/// The project manifest. Only the fields pacm manages are typed; everything
/// else passes through the flatten map untouched across a rewrite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub scripts: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, String>,
    #[serde(default, rename = "devDependencies", skip_serializing_if = "IndexMap::is_empty")]
    pub dev_dependencies: IndexMap<String, String>,
    #[serde(default, rename = "publishConfig", skip_serializing_if = "Option::is_none")]
    pub publish_config: Option<PublishConfig>,
    #[serde(flatten)]
    pub other: IndexMap<String, serde_json::Value>,
}

impl Manifest {
    pub fn new(name: String, version: String) -> Self {
        Self { name: Some(name), version: Some(version), ..Self::default() }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).fs_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&text)
            .map_err(|e| PacmError::Filesystem(format!("parse {}: {e}", path.display())))
    }

    /// Missing manifest is treated as the empty one.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| PacmError::Filesystem(format!("serialize manifest: {e}")))?;
        fsutil::atomic_write(path, data.as_bytes())
            .fs_context(|| format!("write {}", path.display()))
    }

    pub fn record(&mut self, name: &str, version: &str, dev: bool) {
        if dev {
            self.dev_dependencies.insert(name.to_string(), version.to_string());
        } else {
            self.dependencies.insert(name.to_string(), version.to_string());
        }
    }

    /// Drop `name` from both maps; true when it was present in either.
    pub fn remove(&mut self, name: &str) -> bool {
        let in_prod = self.dependencies.shift_remove(name).is_some();
        let in_dev = self.dev_dependencies.shift_remove(name).is_some();
        in_prod || in_dev
    }

    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
    }

    pub fn script(&self, name: &str) -> Option<&str> {
        self.scripts.get(name).map(String::as_str)
    }
}
