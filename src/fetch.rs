use crate::cache::{verify_integrity, CacheStore};
use crate::error::{is_connection_reset, CacheError};
use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use tar::Archive;

type FlightCell = Arc<Mutex<Option<Result<PathBuf, CacheError>>>>;

/// Downloads tarballs into the cache and extracts them into project
/// directories.
///
/// Fetch-and-publish is single-flight per `(name, version)`: concurrent
/// requesters block on the key's cell and share a clone of the winner's
/// result.
#[derive(Debug)]
pub struct TarballFetcher {
    http: reqwest::blocking::Client,
    cache: Arc<CacheStore>,
    retry_attempts: u32,
    flights: Mutex<HashMap<(String, String), FlightCell>>,
}

impl TarballFetcher {
    pub fn new(http: reqwest::blocking::Client, cache: Arc<CacheStore>, retry_attempts: u32) -> Self {
        Self { http, cache, retry_attempts, flights: Mutex::new(HashMap::new()) }
    }

    /// Materialize `name@version` into `dest_dir`, downloading and caching
    /// the tarball first when it is not already cached.
    pub fn ensure_extracted(
        &self,
        name: &str,
        version: &str,
        url: &str,
        integrity: &str,
        dest_dir: &Path,
        force: bool,
    ) -> Result<(), CacheError> {
        if dest_dir.exists() && !force {
            return Ok(());
        }
        let tarball = self.ensure_tarball(name, version, url, integrity)?;
        if dest_dir.exists() {
            fs::remove_dir_all(dest_dir)
                .map_err(|e| CacheError::Io(format!("{name}@{version}"), e.to_string()))?;
        }
        extract_tarball(&tarball, dest_dir)
            .map_err(|e| CacheError::Extract(format!("{name}@{version}"), e.to_string()))
    }

    /// Cached tarball path for `name@version`, fetching and publishing it if
    /// absent. At most one fetch per key is in flight within the process.
    pub fn ensure_tarball(
        &self,
        name: &str,
        version: &str,
        url: &str,
        integrity: &str,
    ) -> Result<PathBuf, CacheError> {
        let key = (name.to_string(), version.to_string());
        let cell = {
            let mut flights = self.flights.lock().unwrap();
            flights.entry(key).or_default().clone()
        };
        let mut slot = cell.lock().unwrap();
        if let Some(result) = slot.as_ref() {
            return result.clone();
        }
        let result = self.fetch_and_publish(name, version, url, integrity);
        *slot = Some(result.clone());
        if result.is_err() {
            // Waiters on this cell still share the failure; the next fresh
            // request gets a new flight instead of the stale error.
            self.flights
                .lock()
                .unwrap()
                .remove(&(name.to_string(), version.to_string()));
        }
        result
    }

    fn fetch_and_publish(
        &self,
        name: &str,
        version: &str,
        url: &str,
        integrity: &str,
    ) -> Result<PathBuf, CacheError> {
        if let Some(path) = self.cache.lookup(name, version) {
            return Ok(path);
        }
        let key = format!("{name}@{version}");
        let tmp = tempfile::NamedTempFile::new()
            .map_err(|e| CacheError::Io(key.clone(), e.to_string()))?;
        self.download(url, tmp.path(), &key)?;
        verify_integrity(tmp.path(), integrity, &key)?;
        self.cache.publish(name, version, tmp.path())
    }

    fn download(&self, url: &str, dest: &Path, key: &str) -> Result<(), CacheError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_download(url, dest) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    let retryable = e
                        .downcast_ref::<reqwest::Error>()
                        .map(|re| is_connection_reset(re))
                        .unwrap_or(false);
                    if retryable && attempt < self.retry_attempts {
                        continue;
                    }
                    return Err(CacheError::Download(key.to_string(), e.to_string()));
                }
            }
        }
    }

    fn try_download(&self, url: &str, dest: &Path) -> anyhow::Result<()> {
        let resp = self.http.get(url).send()?;
        if !resp.status().is_success() {
            anyhow::bail!("tarball fetch {} status {}", url, resp.status());
        }
        let mut file = fs::File::create(dest)?;
        let mut body = resp;
        io::copy(&mut body, &mut file)?;
        Ok(())
    }
}

/// Stream-extract a gzipped tarball into `dest_dir`, stripping the single
/// leading path component (the tarball's `package/` directory) and refusing
/// entries that escape upward.
pub fn extract_tarball(tarball: &Path, dest_dir: &Path) -> anyhow::Result<()> {
    let file = fs::File::open(tarball)?;
    let gz = GzDecoder::new(file);
    let mut archive = Archive::new(gz);
    fs::create_dir_all(dest_dir)?;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            continue;
        }
        let stripped: PathBuf = path.components().skip(1).collect();
        if stripped.as_os_str().is_empty() {
            continue;
        }
        let dest_path = dest_dir.join(&stripped);
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&dest_path)?;
    }
    Ok(())
}
