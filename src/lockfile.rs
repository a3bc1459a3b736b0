use crate::error::{FsContext, PacmError, Result};
use crate::fsutil;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const LOCKFILE_NAME: &str = "pacm.lockp";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    pub version: String,
    pub resolved: String,
    pub integrity: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, String>,
    #[serde(default, rename = "peerDependencies", skip_serializing_if = "IndexMap::is_empty")]
    pub peer_dependencies: IndexMap<String, String>,
}

/// Only direct installs are recorded at the roots; transitives live on disk
/// and inside each entry's concrete dependency map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, LockEntry>,
    #[serde(default, rename = "devDependencies", skip_serializing_if = "IndexMap::is_empty")]
    pub dev_dependencies: IndexMap<String, LockEntry>,
}

impl Lockfile {
    /// Missing, empty, and whitespace-only lockfiles all load as the empty
    /// structure.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text =
            fs::read_to_string(path).fs_context(|| format!("read {}", path.display()))?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&text)
            .map_err(|e| PacmError::Filesystem(format!("parse {}: {e}", path.display())))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| PacmError::Filesystem(format!("serialize lockfile: {e}")))?;
        fsutil::atomic_write(path, data.as_bytes())
            .fs_context(|| format!("write {}", path.display()))
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty() && self.dev_dependencies.is_empty()
    }

    pub fn insert(&mut self, name: &str, entry: LockEntry, dev: bool) {
        if dev {
            self.dev_dependencies.insert(name.to_string(), entry);
        } else {
            self.dependencies.insert(name.to_string(), entry);
        }
    }

    pub fn get(&self, name: &str) -> Option<&LockEntry> {
        self.dependencies.get(name).or_else(|| self.dev_dependencies.get(name))
    }

    /// Drop `name` from both roots; true when it was present in either.
    pub fn remove(&mut self, name: &str) -> bool {
        let in_prod = self.dependencies.shift_remove(name).is_some();
        let in_dev = self.dev_dependencies.shift_remove(name).is_some();
        in_prod || in_dev
    }

    /// Direct entries in insertion order as (name, entry, dev) triples.
    pub fn direct_entries(&self) -> impl Iterator<Item = (&String, &LockEntry, bool)> {
        self.dependencies
            .iter()
            .map(|(n, e)| (n, e, false))
            .chain(self.dev_dependencies.iter().map(|(n, e)| (n, e, true)))
    }
}
