use crate::error::{is_connection_reset, RegistryError};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const USER_AGENT: &str = concat!("pacm/", env!("CARGO_PKG_VERSION"), " (+https://github.com/pacmpkg/pacm)");

pub fn http_client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::blocking::Client::new())
}

/// Metadata client for an npm-compatible registry. Documents are memoized by
/// name for the process lifetime; the memo lock is never held across I/O.
#[derive(Debug)]
pub struct RegistryClient {
    http: reqwest::blocking::Client,
    registry: String,
    retry_attempts: u32,
    memo: Mutex<HashMap<String, Arc<PackageMetadata>>>,
}

impl RegistryClient {
    pub fn new(http: reqwest::blocking::Client, registry: String, retry_attempts: u32) -> Self {
        Self { http, registry, retry_attempts, memo: Mutex::new(HashMap::new()) }
    }

    pub fn registry_url(&self) -> &str {
        &self.registry
    }

    pub fn metadata(&self, name: &str) -> Result<Arc<PackageMetadata>, RegistryError> {
        if let Some(hit) = self.memo.lock().unwrap().get(name).cloned() {
            return Ok(hit);
        }
        let url = format!("{}/{}", self.registry, name);
        let body = self.get_with_retry(&url, name)?;
        let meta: PackageMetadata = serde_json::from_str(&body)
            .map_err(|e| RegistryError::Parse(name.to_string(), e.to_string()))?;
        let meta = Arc::new(meta);
        self.memo.lock().unwrap().insert(name.to_string(), meta.clone());
        Ok(meta)
    }

    /// Registry full-text search endpoint; used by the `search` subcommand.
    pub fn search(&self, text: &str, size: usize) -> Result<SearchResults, RegistryError> {
        let url = format!("{}/-/v1/search?text={}&size={}", self.registry, urlencode(text), size);
        let body = self.get_with_retry(&url, text)?;
        serde_json::from_str(&body).map_err(|e| RegistryError::Parse(text.to_string(), e.to_string()))
    }

    fn get_with_retry(&self, url: &str, name: &str) -> Result<String, RegistryError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.http.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(RegistryError::NotFound(name.to_string()));
                    }
                    if !status.is_success() {
                        return Err(RegistryError::Transport(
                            name.to_string(),
                            format!("registry returned {status}"),
                        ));
                    }
                    return resp
                        .text()
                        .map_err(|e| RegistryError::Transport(name.to_string(), e.to_string()));
                }
                Err(e) => {
                    if attempt < self.retry_attempts && is_connection_reset(&e) {
                        continue;
                    }
                    return Err(RegistryError::Transport(name.to_string(), e.to_string()));
                }
            }
        }
    }
}

fn urlencode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for b in text.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: HashMap<String, String>,
    #[serde(default)]
    pub versions: HashMap<String, VersionMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionMetadata {
    pub version: String,
    pub dist: DistInfo,
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
    #[serde(default, rename = "optionalDependencies")]
    pub optional_dependencies: HashMap<String, String>,
    #[serde(default, rename = "peerDependencies")]
    pub peer_dependencies: HashMap<String, String>,
    #[serde(default)]
    pub os: Vec<String>,
    #[serde(default)]
    pub cpu: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistInfo {
    pub tarball: String,
    #[serde(default)]
    pub integrity: Option<String>,
    #[serde(default)]
    pub shasum: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub objects: Vec<SearchObject>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchObject {
    pub package: SearchPackage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchPackage {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}
