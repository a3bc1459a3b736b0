use crate::error::CacheError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Content-addressed tarball cache under `{HOME}/.pacm-cache`.
///
/// Layout is `{root}/{safeName}/{version}.tgz`, where the single `/` of a
/// scoped name becomes `_`. The in-memory index is built on first use by
/// scanning that tree and updated on every successful publish.
#[derive(Debug)]
pub struct CacheStore {
    root: PathBuf,
    index: Mutex<Option<HashMap<(String, String), PathBuf>>>,
}

impl CacheStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root, index: Mutex::new(None) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn safe_name(name: &str) -> String {
        name.replacen('/', "_", 1)
    }

    fn dir_to_name(dir: &str) -> String {
        if dir.starts_with('@') {
            dir.replacen('_', "/", 1)
        } else {
            dir.to_string()
        }
    }

    pub fn tarball_path(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(Self::safe_name(name)).join(format!("{version}.tgz"))
    }

    /// Cached tarball location, if the tarball is present.
    pub fn lookup(&self, name: &str, version: &str) -> Option<PathBuf> {
        let key = (name.to_string(), version.to_string());
        {
            let mut guard = self.index.lock().unwrap();
            let index = guard.get_or_insert_with(|| scan_cache_tree(&self.root));
            if let Some(path) = index.get(&key) {
                return Some(path.clone());
            }
        }
        // The tree may have gained entries since the scan (another process);
        // fall back to a direct probe and index the hit.
        let path = self.tarball_path(name, version);
        if path.is_file() {
            if let Some(index) = self.index.lock().unwrap().as_mut() {
                index.insert(key, path.clone());
            }
            return Some(path);
        }
        None
    }

    /// Move verified tarball bytes into the cache, atomically. The source is
    /// copied to a sibling temp file first so the final rename cannot cross
    /// filesystems.
    pub fn publish(
        &self,
        name: &str,
        version: &str,
        source: &Path,
    ) -> Result<PathBuf, CacheError> {
        let key_display = format!("{name}@{version}");
        let dest = self.tarball_path(name, version);
        let parent = dest.parent().expect("cache tarball path has a parent");
        fs::create_dir_all(parent)
            .map_err(|e| CacheError::Io(key_display.clone(), e.to_string()))?;
        let tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| CacheError::Io(key_display.clone(), e.to_string()))?;
        fs::copy(source, tmp.path())
            .map_err(|e| CacheError::Io(key_display.clone(), e.to_string()))?;
        tmp.persist(&dest).map_err(|e| CacheError::Io(key_display, e.error.to_string()))?;

        if let Some(index) = self.index.lock().unwrap().as_mut() {
            index.insert((name.to_string(), version.to_string()), dest.clone());
        }
        Ok(dest)
    }

    /// Remove the whole cache tree. Returns the freed byte count, or None
    /// when there was nothing to remove.
    pub fn clean(&self) -> Result<Option<u64>, CacheError> {
        if !self.root.exists() {
            return Ok(None);
        }
        let size = crate::fsutil::dir_size(&self.root);
        fs::remove_dir_all(&self.root)
            .map_err(|e| CacheError::Io(self.root.display().to_string(), e.to_string()))?;
        *self.index.lock().unwrap() = Some(HashMap::new());
        Ok(Some(size))
    }
}

fn scan_cache_tree(root: &Path) -> HashMap<(String, String), PathBuf> {
    let mut index = HashMap::new();
    let Ok(dirs) = fs::read_dir(root) else { return index };
    for dir in dirs.flatten() {
        let dir_path = dir.path();
        if !dir_path.is_dir() {
            continue;
        }
        let Some(dir_name) = dir.file_name().to_str().map(String::from) else { continue };
        let name = CacheStore::dir_to_name(&dir_name);
        let Ok(files) = fs::read_dir(&dir_path) else { continue };
        for file in files.flatten() {
            let path = file.path();
            let Some(file_name) = file.file_name().to_str().map(String::from) else { continue };
            if let Some(version) = file_name.strip_suffix(".tgz") {
                index.insert((name.clone(), version.to_string()), path);
            }
        }
    }
    index
}

enum IntegrityAlgo {
    Sha1,
    Sha256,
    Sha512,
}

/// Check a tarball's bytes against an `<algo>-<base64>` integrity string.
/// An empty string skips verification (registries without integrity data).
pub fn verify_integrity(path: &Path, integrity: &str, key: &str) -> Result<(), CacheError> {
    if integrity.is_empty() {
        return Ok(());
    }
    let (algo, expected_b64) = integrity
        .split_once('-')
        .ok_or_else(|| CacheError::Integrity(key.to_string(), format!("malformed integrity '{integrity}'")))?;
    let algo = match algo {
        "sha1" => IntegrityAlgo::Sha1,
        "sha256" => IntegrityAlgo::Sha256,
        "sha512" => IntegrityAlgo::Sha512,
        other => {
            return Err(CacheError::Integrity(
                key.to_string(),
                format!("unsupported integrity algorithm '{other}'"),
            ))
        }
    };
    let expected = BASE64
        .decode(expected_b64)
        .map_err(|e| CacheError::Integrity(key.to_string(), format!("bad integrity base64: {e}")))?;
    let actual = digest_file(path, &algo).map_err(|e| CacheError::Io(key.to_string(), e.to_string()))?;
    if actual != expected {
        return Err(CacheError::Integrity(
            key.to_string(),
            format!("expected {integrity}, got {}", BASE64.encode(&actual)),
        ));
    }
    Ok(())
}

fn digest_file(path: &Path, algo: &IntegrityAlgo) -> std::io::Result<Vec<u8>> {
    let mut file = fs::File::open(path)?;
    let mut buf = [0u8; 64 * 1024];
    match algo {
        IntegrityAlgo::Sha1 => {
            let mut hasher = Sha1::new();
            loop {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(hasher.finalize().to_vec())
        }
        IntegrityAlgo::Sha256 => {
            let mut hasher = Sha256::new();
            loop {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(hasher.finalize().to_vec())
        }
        IntegrityAlgo::Sha512 => {
            let mut hasher = Sha512::new();
            loop {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(hasher.finalize().to_vec())
        }
    }
}
