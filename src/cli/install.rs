use crate::cli::progress::{format_status, info, warn, ProgressRenderer};
use crate::colors::*;
use crate::context::PacmContext;
use crate::error::{FsContext, PacmError, Result};
use crate::fsutil;
use crate::installer::{read_pkg_manifest, InstallStatus, Installer};
use crate::lockfile::{Lockfile, LOCKFILE_NAME};
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::resolver::{self, spec::PackageSpec, DepCategory};
use std::path::Path;
use std::time::Instant;

pub fn cmd_install(specs: Vec<String>, dev: bool, force: bool, ignore_scripts: bool) -> Result<()> {
    let start = Instant::now();
    let project_dir = std::env::current_dir().fs_context(|| "determine working directory".into())?;
    let manifest_path = project_dir.join(MANIFEST_FILE);
    let mut manifest = Manifest::load_or_default(&manifest_path)?;
    let lock_path = project_dir.join(LOCKFILE_NAME);
    let mut lock = Lockfile::load_or_default(&lock_path)?;

    let explicit: Vec<PackageSpec> =
        specs.iter().map(|s| PackageSpec::parse(s)).collect::<Result<_>>()?;

    // On-disk short-circuit: an argument-less install whose lockfile already
    // matches node_modules needs no resolution and no network.
    if explicit.is_empty() && !force && lock_matches_disk(&project_dir, &lock) {
        let count = lock.direct_entries().count();
        info(&format!("{C_GREEN}already installed{C_RESET} {count} packages, nothing to do"));
        return Ok(());
    }

    let seeds = assemble_seeds(&explicit, dev, &lock, &manifest)?;
    let ctx = PacmContext::new(project_dir, Some(&manifest));

    let mut pr = ProgressRenderer::new();
    pr.render(format_status("resolving", &format!("{} direct packages", seeds.len())));
    let resolved = resolver::resolve(&ctx, &seeds);
    pr.clear();
    let set = resolved?;
    for warning in &set.warnings {
        warn(warning);
    }

    pr.render(format_status("installing", &format!("{} packages", set.len())));
    let installer = Installer::new(&ctx, force, ignore_scripts);
    let installed = installer.install(&set, &manifest, &mut lock);
    pr.clear();
    let report = installed?;
    for warning in &report.warnings {
        warn(warning);
    }

    // Explicitly requested packages land in the manifest at their concrete
    // version; manifest-driven installs leave the user's ranges alone.
    for spec in &explicit {
        if let Some(pkg) = set.direct_entry(&spec.name) {
            let value = match &spec.real_name {
                Some(real) => format!("npm:{real}@{}", pkg.version),
                None => pkg.version.clone(),
            };
            manifest.record(&spec.name, &value, dev);
        }
    }

    manifest.write(&manifest_path)?;
    lock.write(&lock_path)?;

    for spec in &explicit {
        if let Some(pkg) = set.direct_entry(&spec.name) {
            println!(
                "{C_GRAY}[pacm]{C_RESET} {C_GREEN}+{C_RESET} {}@{}",
                pkg.name, pkg.version
            );
        }
    }
    let fresh = report.count(InstallStatus::Installed);
    let already = report.count(InstallStatus::AlreadyInstalled);
    let skipped = report.count(InstallStatus::SkippedOptional) + set.skipped.len();
    println!(
        "{C_GRAY}[pacm]{C_RESET} {C_GREEN}installed{C_RESET} {fresh} packages ({C_DIM}{already} already up to date, {skipped} skipped{C_RESET}) in {:.2?}",
        start.elapsed()
    );
    Ok(())
}

/// Desired-set priority: explicit CLI specs, else non-empty lockfile direct
/// entries pinned at their locked versions, else manifest ranges.
fn assemble_seeds(
    explicit: &[PackageSpec],
    dev: bool,
    lock: &Lockfile,
    manifest: &Manifest,
) -> Result<Vec<(PackageSpec, DepCategory)>> {
    if !explicit.is_empty() {
        let category = if dev { DepCategory::Dev } else { DepCategory::Prod };
        return Ok(explicit.iter().cloned().map(|s| (s, category)).collect());
    }
    if !lock.is_empty() {
        return Ok(seeds_from_lock(lock, manifest));
    }
    let seeds = seeds_from_manifest(manifest);
    if seeds.is_empty() {
        return Err(PacmError::Argument(
            "nothing to install: no specs given, and no lockfile or manifest dependencies found"
                .into(),
        ));
    }
    Ok(seeds)
}

fn seeds_from_lock(lock: &Lockfile, manifest: &Manifest) -> Vec<(PackageSpec, DepCategory)> {
    lock.direct_entries()
        .map(|(name, entry, dev)| {
            let manifest_range = if dev {
                manifest.dev_dependencies.get(name)
            } else {
                manifest.dependencies.get(name)
            };
            // Aliases keep their registry target from the manifest; the
            // locked version still pins the range.
            let mut spec = match manifest_range {
                Some(range) => PackageSpec::from_manifest_entry(name, range),
                None => PackageSpec::new(name.clone(), entry.version.clone()),
            };
            spec.range = entry.version.clone();
            (spec, if dev { DepCategory::Dev } else { DepCategory::Prod })
        })
        .collect()
}

fn seeds_from_manifest(manifest: &Manifest) -> Vec<(PackageSpec, DepCategory)> {
    let mut seeds = Vec::new();
    for (name, range) in &manifest.dependencies {
        seeds.push((PackageSpec::from_manifest_entry(name, range), DepCategory::Prod));
    }
    for (name, range) in &manifest.dev_dependencies {
        seeds.push((PackageSpec::from_manifest_entry(name, range), DepCategory::Dev));
    }
    seeds
}

/// True when every direct lock entry, and every name in its concrete
/// dependency map, sits in node_modules at the locked version.
pub(crate) fn lock_matches_disk(project_dir: &Path, lock: &Lockfile) -> bool {
    if lock.is_empty() {
        return false;
    }
    for (name, entry, _) in lock.direct_entries() {
        if !dir_has_version(project_dir, name, &entry.version) {
            return false;
        }
        for (dep, version) in &entry.dependencies {
            if !dir_has_version(project_dir, dep, version) {
                return false;
            }
        }
    }
    true
}

fn dir_has_version(project_dir: &Path, name: &str, version: &str) -> bool {
    let dest = fsutil::package_dest(project_dir, name);
    read_pkg_manifest(&dest).and_then(|m| m.version).as_deref() == Some(version)
}
