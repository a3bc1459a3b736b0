use crate::cache::CacheStore;
use crate::config::Config;
use crate::fetch::TarballFetcher;
use crate::fsutil;
use crate::manifest::Manifest;
use crate::registry::{self, RegistryClient};
use std::path::PathBuf;
use std::sync::Arc;

/// Long-lived per-process state: configuration, the memoizing registry
/// client, the cache store and the tarball fetcher. Built once per command
/// and passed explicitly; nothing in here is a global.
#[derive(Debug)]
pub struct PacmContext {
    pub project_dir: PathBuf,
    pub config: Config,
    pub registry: RegistryClient,
    pub cache: Arc<CacheStore>,
    pub fetcher: TarballFetcher,
}

impl PacmContext {
    pub fn new(project_dir: PathBuf, manifest: Option<&Manifest>) -> Self {
        let config = Config::discover(&project_dir, manifest);
        let http = registry::http_client();
        let registry = RegistryClient::new(
            http.clone(),
            config.registry.clone(),
            config.retry_attempts,
        );
        let cache = Arc::new(CacheStore::new(fsutil::cache_root()));
        let fetcher = TarballFetcher::new(http, cache.clone(), config.retry_attempts);
        Self { project_dir, config, registry, cache, fetcher }
    }

    pub fn node_modules(&self) -> PathBuf {
        self.project_dir.join("node_modules")
    }

    pub fn package_dest(&self, name: &str) -> PathBuf {
        fsutil::package_dest(&self.project_dir, name)
    }
}

impl Default for PacmContext {
    fn default() -> Self {
        Self::new(PathBuf::from("."), None)
    }
}
