pub mod platform;
pub mod range;
pub mod spec;

use crate::context::PacmContext;
use crate::error::{PacmError, ResolutionError, Result};
use crate::registry::VersionMetadata;
use indexmap::IndexMap;
use spec::PackageSpec;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::thread;

/// Bounded pool draining the resolution work queue.
const RESOLVER_WORKERS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepCategory {
    Prod,
    Dev,
}

/// How a dependency edge reached its package; decides which concrete map on
/// the parent gets backfilled once the child's version is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Regular,
    Optional,
    Peer,
}

#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    /// Install-directory name; differs from the registry name for aliases.
    pub name: String,
    pub version: String,
    pub tarball_url: String,
    pub integrity: String,
    /// Concrete name -> picked version of the regular dependency subset.
    pub dependencies: IndexMap<String, String>,
    /// Concrete subset of optional dependencies that actually resolved.
    pub optional_dependencies: IndexMap<String, String>,
    /// Declared peer ranges, kept for the lockfile.
    pub peer_dependencies: IndexMap<String, String>,
    pub os: Vec<String>,
    pub cpu: Vec<String>,
    /// Failures anywhere under this package demote to warnings.
    pub optional: bool,
}

#[derive(Debug, Clone)]
pub struct SkippedDep {
    pub name: String,
    pub reason: String,
}

/// Flat, de-duplicated output of one resolution walk. `packages` is keyed
/// and ordered by first admission; the direct partitions keep the caller's
/// seed order so downstream lockfile writes are deterministic.
#[derive(Debug, Default)]
pub struct ResolvedSet {
    pub packages: IndexMap<(String, String), ResolvedPackage>,
    pub direct_prod: Vec<String>,
    pub direct_dev: Vec<String>,
    /// Direct name -> version picked for it.
    pub direct_versions: IndexMap<String, String>,
    pub skipped: Vec<SkippedDep>,
    pub warnings: Vec<String>,
}

impl ResolvedSet {
    pub fn direct_entry(&self, name: &str) -> Option<&ResolvedPackage> {
        let version = self.direct_versions.get(name)?;
        self.packages.get(&(name.to_string(), version.clone()))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

struct WorkItem {
    spec: PackageSpec,
    category: DepCategory,
    optional: bool,
    direct: bool,
    parent: Option<(String, String)>,
    edge: Edge,
}

struct Shared {
    queue: VecDeque<WorkItem>,
    /// Queued plus in-flight items; zero means the fixed point is reached.
    pending: usize,
    failed: bool,
}

struct WalkState {
    shared: Mutex<Shared>,
    cond: Condvar,
    set: Mutex<ResolvedSet>,
    failure: Mutex<Option<PacmError>>,
}

/// Walk the transitive graph of the direct seeds and produce the resolved
/// set. Each seed carries its own prod/dev tag so manifest- and
/// lockfile-driven installs keep both partitions in one walk.
///
/// Dependencies and peer dependencies propagate the parent's category;
/// optional dependencies (and everything beneath them) demote failures to
/// warnings and prune their subtree.
pub fn resolve(ctx: &PacmContext, seeds: &[(PackageSpec, DepCategory)]) -> Result<ResolvedSet> {
    let mut set = ResolvedSet::default();
    let mut queue = VecDeque::new();
    for (spec, category) in seeds {
        let partition = match category {
            DepCategory::Dev => &mut set.direct_dev,
            DepCategory::Prod => &mut set.direct_prod,
        };
        if !partition.contains(&spec.name) {
            partition.push(spec.name.clone());
        }
        queue.push_back(WorkItem {
            spec: spec.clone(),
            category: *category,
            optional: false,
            direct: true,
            parent: None,
            edge: Edge::Regular,
        });
    }
    let pending = queue.len();
    let state = WalkState {
        shared: Mutex::new(Shared { queue, pending, failed: false }),
        cond: Condvar::new(),
        set: Mutex::new(set),
        failure: Mutex::new(None),
    };

    let workers = RESOLVER_WORKERS.min(pending.max(1));
    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| worker_loop(ctx, &state));
        }
    });

    if let Some(err) = state.failure.lock().unwrap().take() {
        return Err(err);
    }
    Ok(state.set.into_inner().unwrap())
}

fn worker_loop(ctx: &PacmContext, state: &WalkState) {
    loop {
        let item = {
            let mut shared = state.shared.lock().unwrap();
            loop {
                if let Some(item) = shared.queue.pop_front() {
                    break item;
                }
                if shared.pending == 0 {
                    return;
                }
                shared = state.cond.wait(shared).unwrap();
            }
        };

        let outcome = process_item(ctx, state, item);

        let mut shared = state.shared.lock().unwrap();
        shared.pending -= 1;
        match outcome {
            Ok(children) => {
                if !shared.failed {
                    shared.pending += children.len();
                    shared.queue.extend(children);
                }
            }
            Err(err) => {
                // First fatal error wins; queued work is dropped while
                // in-flight items run to completion.
                if !shared.failed {
                    shared.failed = true;
                    *state.failure.lock().unwrap() = Some(err);
                }
                shared.pending -= shared.queue.len();
                shared.queue.clear();
            }
        }
        state.cond.notify_all();
    }
}

/// Resolve one queue entry. Returns the child work items, or the fatal error
/// for a required branch; optional-branch failures are recorded as warnings
/// and yield no children.
fn process_item(
    ctx: &PacmContext,
    state: &WalkState,
    item: WorkItem,
) -> std::result::Result<Vec<WorkItem>, PacmError> {
    let reg_name = item.spec.registry_name();

    let meta = match ctx.registry.metadata(reg_name) {
        Ok(meta) => meta,
        Err(err) => {
            if item.optional {
                skip_optional(state, &item.spec.name, &format!("metadata fetch failed: {err}"));
                return Ok(Vec::new());
            }
            return Err(err.into());
        }
    };

    let picked: &VersionMetadata = match range::pick_version(&meta, reg_name, &item.spec.range) {
        Ok(vm) => vm,
        Err(err) => {
            if item.optional {
                skip_optional(state, &item.spec.name, &err.to_string());
                return Ok(Vec::new());
            }
            return Err(err.into());
        }
    };
    let version = picked.version.clone();

    if let Err(reason) = platform::check(&picked.os, &picked.cpu) {
        if item.optional {
            skip_optional(state, &item.spec.name, &format!("platform mismatch: {reason}"));
            return Ok(Vec::new());
        }
        return Err(ResolutionError::PlatformIncompatible(
            item.spec.name.clone(),
            version,
            reason,
        )
        .into());
    }

    let key = (item.spec.name.clone(), version.clone());
    let already_admitted = {
        let mut set = state.set.lock().unwrap();
        if let Some(parent_key) = &item.parent {
            if let Some(parent) = set.packages.get_mut(parent_key) {
                match item.edge {
                    Edge::Regular => {
                        parent.dependencies.insert(item.spec.name.clone(), version.clone());
                    }
                    Edge::Optional => {
                        parent
                            .optional_dependencies
                            .insert(item.spec.name.clone(), version.clone());
                    }
                    Edge::Peer => {}
                }
            }
        }
        if item.direct {
            set.direct_versions.insert(item.spec.name.clone(), version.clone());
        }
        if set.packages.contains_key(&key) {
            true
        } else {
            // Flat layout: a second version of an admitted name will land on
            // the same directory, last writer wins. Surface it.
            if let Some((_, v)) =
                set.packages.keys().find(|(n, v)| n == &key.0 && v != &key.1)
            {
                let clash = format!(
                    "version clash for {}: {} and {} both resolved; last extraction wins on disk",
                    key.0, v, key.1
                );
                set.warnings.push(clash);
            }
            set.packages.insert(
                key.clone(),
                ResolvedPackage {
                    name: item.spec.name.clone(),
                    version: version.clone(),
                    tarball_url: picked.dist.tarball.clone(),
                    integrity: picked.dist.integrity.clone().unwrap_or_default(),
                    dependencies: IndexMap::new(),
                    optional_dependencies: IndexMap::new(),
                    peer_dependencies: picked
                        .peer_dependencies
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                    os: picked.os.clone(),
                    cpu: picked.cpu.clone(),
                    optional: item.optional,
                },
            );
            false
        }
    };

    if already_admitted {
        return Ok(Vec::new());
    }

    let mut children = Vec::new();
    for (dep_name, dep_range) in &picked.dependencies {
        children.push(WorkItem {
            spec: PackageSpec::new(dep_name.clone(), dep_range.clone()),
            category: item.category,
            optional: item.optional,
            direct: false,
            parent: Some(key.clone()),
            edge: Edge::Regular,
        });
    }
    for (dep_name, dep_range) in &picked.peer_dependencies {
        children.push(WorkItem {
            spec: PackageSpec::new(dep_name.clone(), dep_range.clone()),
            category: item.category,
            optional: item.optional,
            direct: false,
            parent: Some(key.clone()),
            edge: Edge::Peer,
        });
    }
    for (dep_name, dep_range) in &picked.optional_dependencies {
        children.push(WorkItem {
            spec: PackageSpec::new(dep_name.clone(), dep_range.clone()),
            category: item.category,
            optional: true,
            direct: false,
            parent: Some(key.clone()),
            edge: Edge::Optional,
        });
    }
    Ok(children)
}

fn skip_optional(state: &WalkState, name: &str, reason: &str) {
    let mut set = state.set.lock().unwrap();
    set.warnings.push(format!("skipping optional dependency {name}: {reason}"));
    set.skipped.push(SkippedDep { name: name.to_string(), reason: reason.to_string() });
}
