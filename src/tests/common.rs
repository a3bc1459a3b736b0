use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::write::GzEncoder;
use flate2::Compression;
use once_cell::sync::Lazy;
use serde_json::Value;
use sha2::{Digest, Sha512};
use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use tempfile::TempDir;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub fn lock_env() -> MutexGuard<'static, ()> {
    ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Re-points HOME (and the Windows equivalents) into a tempdir so cache and
/// user `.npmrc` lookups stay inside the test sandbox.
pub struct EnvSandbox {
    _lock: MutexGuard<'static, ()>,
    temp: TempDir,
    prev_home: Option<OsString>,
    prev_profile: Option<OsString>,
}

impl EnvSandbox {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let lock = lock_env();
        let temp = tempfile::tempdir().expect("create test tempdir");
        let prev_home = env::var_os("HOME");
        env::set_var("HOME", temp.path());
        let prev_profile = env::var_os("USERPROFILE");
        env::set_var("USERPROFILE", temp.path());
        Self { _lock: lock, temp, prev_home, prev_profile }
    }

    pub fn home(&self) -> &Path {
        self.temp.path()
    }

    pub fn project_root(&self) -> PathBuf {
        let dir = self.temp.path().join("project");
        fs::create_dir_all(&dir).expect("create project dir");
        dir
    }
}

impl Drop for EnvSandbox {
    fn drop(&mut self) {
        restore_env("HOME", &self.prev_home);
        restore_env("USERPROFILE", &self.prev_profile);
    }
}

fn restore_env(key: &str, previous: &Option<OsString>) {
    match previous {
        Some(val) => env::set_var(key, val),
        None => env::remove_var(key),
    }
}

pub struct CwdGuard {
    prev: PathBuf,
}

impl CwdGuard {
    pub fn change_to(dir: &Path) -> std::io::Result<Self> {
        let prev = env::current_dir()?;
        env::set_current_dir(dir)?;
        Ok(Self { prev })
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.prev);
    }
}

/// Gzipped tarball with every file under the conventional `package/` top
/// directory, the way registry tarballs ship.
pub fn build_tarball(files: &[(&str, String)]) -> Vec<u8> {
    let gz = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(gz);
    for (rel, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("package/{rel}"), contents.as_bytes())
            .expect("append tar entry");
    }
    let gz = builder.into_inner().expect("finish tar");
    gz.finish().expect("finish gzip")
}

pub fn integrity_of(bytes: &[u8]) -> String {
    format!("sha512-{}", BASE64.encode(Sha512::digest(bytes)))
}

/// Tarball for a package with the given manifest plus extra files.
pub fn package_tarball(manifest: &Value, files: &[(&str, &str)]) -> Vec<u8> {
    let mut all: Vec<(&str, String)> =
        vec![("package.json", serde_json::to_string_pretty(manifest).unwrap())];
    for (rel, contents) in files {
        all.push((rel, (*contents).to_string()));
    }
    build_tarball(&all)
}

/// Drop a tarball straight into the user-home cache layout, returning its
/// integrity string.
pub fn seed_cache_tarball(name: &str, version: &str, bytes: &[u8]) -> String {
    let path = crate::fsutil::cache_root()
        .join(crate::cache::CacheStore::safe_name(name))
        .join(format!("{version}.tgz"));
    fs::create_dir_all(path.parent().unwrap()).expect("create cache dir");
    fs::write(&path, bytes).expect("write cache tarball");
    integrity_of(bytes)
}

/// Minimal HTTP registry fixture: serves canned bodies by path from a local
/// listener and counts every request it sees.
pub struct FakeRegistry {
    routes: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    docs: Mutex<HashMap<String, Value>>,
    hits: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
    addr: String,
    handle: Option<JoinHandle<()>>,
}

impl FakeRegistry {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake registry");
        let addr = format!("http://{}", listener.local_addr().expect("local addr"));
        let routes: Arc<Mutex<HashMap<String, Vec<u8>>>> = Arc::new(Mutex::new(HashMap::new()));
        let hits = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let thread_routes = routes.clone();
        let thread_hits = hits.clone();
        let thread_stop = stop.clone();
        let handle = std::thread::spawn(move || {
            for stream in listener.incoming() {
                if thread_stop.load(Ordering::SeqCst) {
                    break;
                }
                let Ok(stream) = stream else { continue };
                serve_one(stream, &thread_routes, &thread_hits);
            }
        });

        Self { routes, docs: Mutex::new(HashMap::new()), hits, stop, addr, handle: Some(handle) }
    }

    pub fn url(&self) -> &str {
        &self.addr
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn route_json(&self, path: &str, body: &Value) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), serde_json::to_vec(body).unwrap());
    }

    pub fn route_bytes(&self, path: &str, body: Vec<u8>) {
        self.routes.lock().unwrap().insert(path.to_string(), body);
    }

    /// Registry document + tarball route for one published version. Repeat
    /// calls for the same name accumulate versions; the last one becomes
    /// `latest`.
    pub fn publish_package(
        &self,
        name: &str,
        version: &str,
        manifest: &Value,
        files: &[(&str, &str)],
    ) -> String {
        let tarball = package_tarball(manifest, files);
        let integrity = integrity_of(&tarball);
        let tar_path = format!("/tarballs/{name}/{version}.tgz");
        let mut doc_version = manifest.clone();
        doc_version["dist"] = serde_json::json!({
            "tarball": format!("{}{}", self.addr, tar_path),
            "integrity": integrity.clone(),
        });
        let doc = {
            let mut docs = self.docs.lock().unwrap();
            let doc = docs.entry(name.to_string()).or_insert_with(|| {
                serde_json::json!({ "name": name, "dist-tags": {}, "versions": {} })
            });
            doc["versions"][version] = doc_version;
            doc["dist-tags"]["latest"] = Value::String(version.to_string());
            doc.clone()
        };
        self.route_json(&format!("/{name}"), &doc);
        self.route_bytes(&tar_path, tarball);
        integrity
    }

    /// Write the project `.npmrc` pointing at this fixture.
    pub fn write_npmrc(&self, project_dir: &Path) {
        fs::write(project_dir.join(".npmrc"), format!("registry = {}\n", self.addr))
            .expect("write .npmrc");
    }
}

impl Drop for FakeRegistry {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // Unblock the accept loop.
        if let Some(addr) = self.addr.strip_prefix("http://") {
            let _ = TcpStream::connect(addr);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve_one(
    mut stream: TcpStream,
    routes: &Arc<Mutex<HashMap<String, Vec<u8>>>>,
    hits: &Arc<AtomicUsize>,
) {
    let mut buf = [0u8; 8192];
    let mut filled = 0usize;
    while filled < buf.len() {
        let Ok(n) = stream.read(&mut buf[filled..]) else { return };
        if n == 0 {
            break;
        }
        filled += n;
        if buf[..filled].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    let request = String::from_utf8_lossy(&buf[..filled]).to_string();
    let Some(path) = request.split_whitespace().nth(1).map(String::from) else { return };
    hits.fetch_add(1, Ordering::SeqCst);
    let body = routes.lock().unwrap().get(&path).cloned();
    match body {
        Some(body) => {
            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(header.as_bytes());
            let _ = stream.write_all(&body);
        }
        None => {
            let _ = stream.write_all(
                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
        }
    }
    let _ = stream.flush();
}
