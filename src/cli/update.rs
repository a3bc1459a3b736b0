use crate::cli::progress::{format_status, info, warn, ProgressRenderer};
use crate::colors::*;
use crate::context::PacmContext;
use crate::error::{FsContext, Result};
use crate::installer::{InstallStatus, Installer};
use crate::lockfile::{Lockfile, LOCKFILE_NAME};
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::resolver::{self, spec::PackageSpec, DepCategory};
use std::time::Instant;

/// Like install, but the desired packages re-resolve at `latest`. Names not
/// present in the manifest are skipped with a warning; nothing new is added.
pub fn cmd_update(packages: Vec<String>, force: bool, ignore_scripts: bool) -> Result<()> {
    let start = Instant::now();
    let project_dir = std::env::current_dir().fs_context(|| "determine working directory".into())?;
    let manifest_path = project_dir.join(MANIFEST_FILE);
    let mut manifest = Manifest::load_or_default(&manifest_path)?;
    let lock_path = project_dir.join(LOCKFILE_NAME);
    let mut lock = Lockfile::load_or_default(&lock_path)?;

    let names: Vec<String> = if !packages.is_empty() {
        let mut kept = Vec::new();
        for raw in &packages {
            let spec = PackageSpec::parse(raw)?;
            if manifest.has_dependency(&spec.name) {
                kept.push(spec.name);
            } else {
                warn(&format!("'{}' is not installed, skipping", spec.name));
            }
        }
        kept
    } else if !lock.is_empty() {
        lock.direct_entries().map(|(name, _, _)| name.clone()).collect()
    } else {
        manifest
            .dependencies
            .keys()
            .chain(manifest.dev_dependencies.keys())
            .cloned()
            .collect()
    };
    if names.is_empty() {
        info("nothing to update");
        return Ok(());
    }

    let seeds: Vec<(PackageSpec, DepCategory)> = names
        .iter()
        .map(|name| {
            let dev = manifest.dev_dependencies.contains_key(name)
                || lock.dev_dependencies.contains_key(name);
            let range = if dev {
                manifest.dev_dependencies.get(name)
            } else {
                manifest.dependencies.get(name)
            };
            let mut spec = match range {
                Some(range) => PackageSpec::from_manifest_entry(name, range),
                None => PackageSpec::new(name.clone(), "latest"),
            };
            spec.range = "latest".to_string();
            (spec, if dev { DepCategory::Dev } else { DepCategory::Prod })
        })
        .collect();

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

    // Manifest entries that pin a concrete version move with the update;
    // range entries keep the user's expression.
    for name in &names {
        if let Some(pkg) = set.direct_entry(name) {
            let dev = manifest.dev_dependencies.contains_key(name);
            let current = if dev {
                manifest.dev_dependencies.get(name)
            } else {
                manifest.dependencies.get(name)
            };
            match current {
                Some(range) if range.starts_with("npm:") => {
                    let spec = PackageSpec::from_manifest_entry(name, range);
                    let real = spec.real_name.unwrap_or_else(|| name.clone());
                    manifest.record(name, &format!("npm:{real}@{}", pkg.version), dev);
                }
                Some(range) if semver::Version::parse(range).is_ok() => {
                    manifest.record(name, &pkg.version, dev);
                }
                // Range expressions and desynced lock-only names are left
                // alone; update never adds manifest entries.
                Some(_) | None => {}
            }
        }
    }

    manifest.write(&manifest_path)?;
    lock.write(&lock_path)?;

    let fresh = report.count(InstallStatus::Installed);
    let already = report.count(InstallStatus::AlreadyInstalled);
    println!(
        "{C_GRAY}[pacm]{C_RESET} {C_GREEN}updated{C_RESET} {fresh} packages ({C_DIM}{already} up to date{C_RESET}) in {:.2?}",
        start.elapsed()
    );
    Ok(())
}
