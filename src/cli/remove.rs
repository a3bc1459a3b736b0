use crate::cli::progress::{info, warn};
use crate::colors::*;
use crate::context::PacmContext;
use crate::error::{FsContext, PacmError, Result};
use crate::fsutil;
use crate::installer::{read_pkg_manifest, shim};
use crate::lockfile::{Lockfile, LOCKFILE_NAME};
use crate::manifest::{Manifest, MANIFEST_FILE};
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::time::Instant;

pub fn cmd_remove(packages: Vec<String>) -> Result<()> {
    let start = Instant::now();
    if packages.is_empty() {
        return Err(PacmError::Argument("no packages specified to remove".into()));
    }
    let project_dir = std::env::current_dir().fs_context(|| "determine working directory".into())?;
    let manifest_path = project_dir.join(MANIFEST_FILE);
    let mut manifest = Manifest::load_or_default(&manifest_path)?;
    let lock_path = project_dir.join(LOCKFILE_NAME);
    let mut lock = Lockfile::load_or_default(&lock_path)?;
    let lock_snapshot = lock.clone();
    let ctx = PacmContext::new(project_dir.clone(), Some(&manifest));

    let mut removed_roots = Vec::new();
    for name in &packages {
        let in_manifest = manifest.remove(name);
        let in_lock = lock.remove(name);
        if in_manifest || in_lock {
            removed_roots.push(name.clone());
        } else {
            warn(&format!("unknown dependency '{name}'"));
        }
    }

    // Walk each removed package's dependency names and take their
    // directories with it. The flat layout has no requester tracking, so a
    // dependency shared with a surviving package goes too; the next install
    // restores it.
    let mut deleted = 0usize;
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = packages.iter().cloned().collect();
    while let Some(name) = queue.pop_front() {
        if !visited.insert(name.clone()) {
            continue;
        }
        for dep in dependency_names(&ctx, &lock_snapshot, &name) {
            queue.push_back(dep);
        }
        let dest = fsutil::package_dest(&project_dir, &name);
        if dest.exists() {
            fs::remove_dir_all(&dest)
                .fs_context(|| format!("remove {}", dest.display()))?;
            deleted += 1;
            if let Some(scope_dir) = dest.parent() {
                if scope_dir != project_dir.join("node_modules") {
                    fsutil::remove_dir_if_empty(scope_dir);
                }
            }
        }
        shim::remove_bin_shims(&project_dir, &name);
    }
    fsutil::remove_dir_if_empty(&project_dir.join("node_modules"));

    manifest.write(&manifest_path)?;
    lock.write(&lock_path)?;

    for name in &removed_roots {
        println!("{C_GRAY}[pacm]{C_RESET} {C_RED}-{C_RESET} {name}");
    }
    info(&format!(
        "{C_RED}removed{C_RESET} {} packages ({deleted} directories) in {:.2?}",
        removed_roots.len(),
        start.elapsed()
    ));
    Ok(())
}

/// Names to recurse into for a removed package: the lock entry's concrete
/// map when we have one, else the installed manifest, else the registry
/// document for the installed version. Registry trouble here only warns.
fn dependency_names(ctx: &PacmContext, lock: &Lockfile, name: &str) -> Vec<String> {
    if let Some(entry) = lock.get(name) {
        if !entry.dependencies.is_empty() {
            return entry.dependencies.keys().cloned().collect();
        }
    }
    let dest = ctx.package_dest(name);
    if let Some(installed) = read_pkg_manifest(&dest) {
        let version = installed.version.clone();
        match ctx.registry.metadata(name) {
            Ok(meta) => {
                if let Some(vm) = version.as_ref().and_then(|v| meta.versions.get(v)) {
                    return vm.dependencies.keys().cloned().collect();
                }
            }
            Err(err) => {
                warn(&format!("could not walk dependencies of '{name}': {err}"));
            }
        }
    }
    Vec::new()
}
