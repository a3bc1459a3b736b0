use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn cache_root() -> PathBuf {
    home_dir().join(".pacm-cache")
}

/// Write `data` to a sibling temp file, then rename into place. The rename
/// stays on one filesystem so readers never observe a partial file.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// node_modules destination for a package; scoped names keep their
/// `@scope/` prefix as a directory level.
pub fn package_dest(project_dir: &Path, name: &str) -> PathBuf {
    let mut dest = project_dir.join("node_modules");
    for part in name.split('/') {
        dest.push(part);
    }
    dest
}

pub fn remove_dir_if_empty(path: &Path) {
    if let Ok(mut entries) = fs::read_dir(path) {
        if entries.next().is_none() {
            let _ = fs::remove_dir(path);
        }
    }
}

/// Total size in bytes of a directory tree; used for the clean report.
pub fn dir_size(path: &Path) -> u64 {
    let mut total = 0u64;
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            let p = entry.path();
            if p.is_dir() {
                total = total.saturating_add(dir_size(&p));
            } else if let Ok(meta) = entry.metadata() {
                total = total.saturating_add(meta.len());
            }
        }
    }
    total
}
