pub mod scripts;
pub mod shim;

use crate::context::PacmContext;
use crate::error::{PacmError, Result};
use crate::lockfile::{LockEntry, Lockfile};
use crate::manifest::Manifest;
use crate::resolver::{ResolvedPackage, ResolvedSet};
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// `bin` as found in a package manifest: either a bare path (named after
/// the package) or a name -> path map.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BinField {
    Single(String),
    Map(BTreeMap<String, String>),
}

/// The slice of an installed package's `package.json` the installer needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PkgManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub bin: Option<BinField>,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
}

pub fn read_pkg_manifest(dir: &Path) -> Option<PkgManifest> {
    let text = fs::read_to_string(dir.join("package.json")).ok()?;
    serde_json::from_str(&text).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    Installed,
    AlreadyInstalled,
    SkippedOptional,
}

#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub name: String,
    pub version: String,
    pub status: InstallStatus,
}

#[derive(Debug, Default)]
pub struct InstallReport {
    pub outcomes: Vec<InstallOutcome>,
    pub warnings: Vec<String>,
}

impl InstallReport {
    pub fn count(&self, status: InstallStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

struct Materialized {
    status: InstallStatus,
    postinstall: Option<(PathBuf, String)>,
    warning: Option<String>,
}

/// Materializes a resolved set into `node_modules`, bounded by the fetch
/// concurrency cap, then applies lockfile updates on the calling thread.
pub struct Installer<'a> {
    ctx: &'a PacmContext,
    force: bool,
    ignore_scripts: bool,
}

impl<'a> Installer<'a> {
    pub fn new(ctx: &'a PacmContext, force: bool, ignore_scripts: bool) -> Self {
        Self { ctx, force, ignore_scripts }
    }

    pub fn install(
        &self,
        set: &ResolvedSet,
        manifest: &Manifest,
        lock: &mut Lockfile,
    ) -> Result<InstallReport> {
        let packages: Vec<&ResolvedPackage> = set.packages.values().collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.ctx.config.fetch_concurrency)
            .build()
            .map_err(|e| PacmError::Filesystem(format!("build fetch pool: {e}")))?;
        // Fallible collect stops handing out new tasks after the first
        // error; in-flight ones run to completion.
        let materialized: Result<Vec<Materialized>> =
            pool.install(|| packages.par_iter().map(|&pkg| self.materialize(pkg)).collect());
        let materialized = materialized?;

        let mut report = InstallReport::default();
        let mut hooks: Vec<(PathBuf, String)> = Vec::new();
        for (pkg, done) in packages.iter().zip(materialized) {
            report.outcomes.push(InstallOutcome {
                name: pkg.name.clone(),
                version: pkg.version.clone(),
                status: done.status,
            });
            if let Some(warning) = done.warning {
                report.warnings.push(warning);
            }
            if let Some(hook) = done.postinstall {
                hooks.push(hook);
            }
        }

        if !self.ignore_scripts {
            for (dir, script) in &hooks {
                if let Err(reason) = scripts::run_script(dir, script) {
                    report
                        .warnings
                        .push(format!("postinstall failed in {}: {reason}", dir.display()));
                }
            }
            if let Some(script) = manifest.script("postinstall") {
                if let Err(reason) = scripts::run_script(&self.ctx.project_dir, script) {
                    report.warnings.push(format!("project postinstall failed: {reason}"));
                }
            }
        }

        for name in &set.direct_prod {
            if let Some(pkg) = set.direct_entry(name) {
                lock.insert(name, lock_entry(pkg), false);
            }
        }
        for name in &set.direct_dev {
            if let Some(pkg) = set.direct_entry(name) {
                lock.insert(name, lock_entry(pkg), true);
            }
        }

        Ok(report)
    }

    fn materialize(&self, pkg: &ResolvedPackage) -> Result<Materialized> {
        let dest = self.ctx.package_dest(&pkg.name);
        let installed_version = read_pkg_manifest(&dest).and_then(|m| m.version);
        if !self.force && installed_version.as_deref() == Some(pkg.version.as_str()) {
            return Ok(Materialized {
                status: InstallStatus::AlreadyInstalled,
                postinstall: None,
                warning: None,
            });
        }

        // A stale directory (different version) is replaced wholesale.
        let replace = self.force || dest.exists();
        if let Err(err) = self.ctx.fetcher.ensure_extracted(
            &pkg.name,
            &pkg.version,
            &pkg.tarball_url,
            &pkg.integrity,
            &dest,
            replace,
        ) {
            if pkg.optional {
                return Ok(Materialized {
                    status: InstallStatus::SkippedOptional,
                    postinstall: None,
                    warning: Some(format!(
                        "skipping optional dependency {}@{}: {err}",
                        pkg.name, pkg.version
                    )),
                });
            }
            return Err(err.into());
        }

        let inner = read_pkg_manifest(&dest);
        if let Some(inner) = &inner {
            shim::create_bin_shims(
                &self.ctx.project_dir,
                &pkg.name,
                &dest,
                inner.name.as_deref(),
                inner.bin.as_ref(),
            )?;
        }
        let postinstall = inner
            .as_ref()
            .and_then(|m| m.scripts.get("postinstall"))
            .map(|script| (dest.clone(), script.clone()));

        Ok(Materialized { status: InstallStatus::Installed, postinstall, warning: None })
    }
}

fn lock_entry(pkg: &ResolvedPackage) -> LockEntry {
    LockEntry {
        version: pkg.version.clone(),
        resolved: pkg.tarball_url.clone(),
        integrity: pkg.integrity.clone(),
        dependencies: pkg.dependencies.clone(),
        peer_dependencies: pkg.peer_dependencies.clone(),
    }
}
