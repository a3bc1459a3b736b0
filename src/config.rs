use crate::fsutil;
use crate::manifest::Manifest;
use std::fs;
use std::path::Path;

pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Transport failures caused by a TCP reset retry up to this many attempts
/// total, with no backoff.
pub const RETRY_ATTEMPTS: u32 = 3;

/// Whole-install cap on concurrent download-or-extract tasks.
pub const FETCH_CONCURRENCY: usize = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub registry: String,
    pub retry_attempts: u32,
    pub fetch_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: DEFAULT_REGISTRY.to_string(),
            retry_attempts: RETRY_ATTEMPTS,
            fetch_concurrency: FETCH_CONCURRENCY,
        }
    }
}

impl Config {
    /// Registry resolution order: project `.npmrc`, user `.npmrc`, manifest
    /// `publishConfig.registry`, default.
    pub fn discover(project_dir: &Path, manifest: Option<&Manifest>) -> Self {
        let registry = registry_from_npmrc(&project_dir.join(".npmrc"))
            .or_else(|| registry_from_npmrc(&fsutil::home_dir().join(".npmrc")))
            .or_else(|| {
                manifest
                    .and_then(|m| m.publish_config.as_ref())
                    .and_then(|pc| pc.registry.clone())
            })
            .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());
        Self { registry: registry.trim_end_matches('/').to_string(), ..Self::default() }
    }
}

fn registry_from_npmrc(path: &Path) -> Option<String> {
    let text = fs::read_to_string(path).ok()?;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else { continue };
        if key.trim() == "registry" {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
