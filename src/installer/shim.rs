use crate::error::{FsContext, Result};
use crate::installer::BinField;
use std::fs;
use std::path::{Path, PathBuf};

/// Write `node_modules/.bin` entries for every `bin` declared by the
/// installed package. The shim is a shell wrapper that resolves its own
/// directory and hands the target script to node; Windows gets a `.cmd`
/// companion next to it.
pub fn create_bin_shims(
    project_dir: &Path,
    package_name: &str,
    pkg_dir: &Path,
    pkg_real_name: Option<&str>,
    bin: Option<&BinField>,
) -> Result<Vec<String>> {
    let Some(bin) = bin else { return Ok(Vec::new()) };
    let entries: Vec<(String, String)> = match bin {
        BinField::Single(path) => {
            // A bare string bin takes the package's own (unscoped) name.
            let name = pkg_real_name.unwrap_or(package_name);
            let name = name.rsplit('/').next().unwrap_or(name);
            vec![(name.to_string(), path.clone())]
        }
        BinField::Map(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
    };
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let bin_dir = project_dir.join("node_modules").join(".bin");
    fs::create_dir_all(&bin_dir).fs_context(|| format!("create {}", bin_dir.display()))?;

    let mut created = Vec::new();
    for (mut bin_name, rel_path) in entries {
        if let Some(idx) = bin_name.rfind('/') {
            bin_name = bin_name[idx + 1..].to_string();
        }
        if bin_name.is_empty() {
            continue;
        }
        let target = normalize_pkg_path(pkg_dir, &rel_path);
        if !target.exists() {
            continue;
        }
        // Relative target from .bin: ../<pkg>/<rel_path>
        let mut rel_from_bin = PathBuf::from("..");
        for part in package_name.split('/') {
            rel_from_bin.push(part);
        }
        for part in rel_path.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    rel_from_bin.pop();
                }
                other => rel_from_bin.push(other),
            }
        }

        let shim_path = bin_dir.join(&bin_name);
        write_sh_shim(&shim_path, &rel_from_bin)?;
        #[cfg(windows)]
        write_cmd_shim(&bin_dir.join(format!("{bin_name}.cmd")), &rel_from_bin)?;
        created.push(bin_name);
    }
    Ok(created)
}

fn write_sh_shim(dest: &Path, relative_target: &Path) -> Result<()> {
    let rel = relative_target.to_string_lossy().replace('\\', "/");
    let script = format!(
        "#!/bin/sh\nbasedir=$(dirname \"$0\")\nexec node \"$basedir/{rel}\" \"$@\"\n"
    );
    if dest.exists() {
        let _ = fs::remove_file(dest);
    }
    fs::write(dest, script).fs_context(|| format!("write shim {}", dest.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(dest)
            .fs_context(|| format!("stat shim {}", dest.display()))?
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(dest, perms)
            .fs_context(|| format!("chmod shim {}", dest.display()))?;
    }
    Ok(())
}

#[cfg(windows)]
fn write_cmd_shim(dest: &Path, relative_target: &Path) -> Result<()> {
    let rel = relative_target.to_string_lossy().replace('/', "\\");
    let script = format!("@ECHO off\r\nnode \"%~dp0\\{rel}\" %*\r\n");
    if dest.exists() {
        let _ = fs::remove_file(dest);
    }
    fs::write(dest, script).fs_context(|| format!("write shim {}", dest.display()))
}

fn normalize_pkg_path(base: &Path, rel: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    for part in rel.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                path.pop();
            }
            other => path.push(other),
        }
    }
    path
}

/// Delete `.bin` entries whose shim text points into `package_name`'s
/// directory; used when a package is removed.
pub fn remove_bin_shims(project_dir: &Path, package_name: &str) {
    let bin_dir = project_dir.join("node_modules").join(".bin");
    let Ok(entries) = fs::read_dir(&bin_dir) else { return };
    let needle = format!("../{package_name}/");
    let needle_win = format!("..\\{}\\", package_name.replace('/', "\\"));
    for entry in entries.flatten() {
        let path = entry.path();
        if let Ok(text) = fs::read_to_string(&path) {
            if text.contains(&needle) || text.contains(&needle_win) {
                let _ = fs::remove_file(&path);
            }
        }
    }
    crate::fsutil::remove_dir_if_empty(&bin_dir);
}
