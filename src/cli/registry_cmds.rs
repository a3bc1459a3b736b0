use crate::cli::progress::info;
use crate::colors::*;
use crate::context::PacmContext;
use crate::error::{FsContext, PacmError, RegistryError, Result};
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::registry;
use serde::Deserialize;
use std::process::Command;

pub fn cmd_search(text: &str) -> Result<()> {
    let ctx = context()?;
    let results = ctx.registry.search(text, 20)?;
    if results.objects.is_empty() {
        info(&format!("no packages matched '{text}'"));
        return Ok(());
    }
    info(&format!("{} results for '{text}':", results.total));
    for object in &results.objects {
        let pkg = &object.package;
        let description = pkg.description.as_deref().unwrap_or("");
        println!(
            "{C_GRAY}[pacm]{C_RESET}  {C_GREEN}{}{C_RESET}@{} {C_DIM}{description}{C_RESET}",
            pkg.name, pkg.version
        );
    }
    Ok(())
}

pub fn cmd_info(name: &str) -> Result<()> {
    let ctx = context()?;
    let meta = ctx.registry.metadata(name)?;
    let latest = meta.dist_tags.get("latest").cloned().unwrap_or_default();
    info(&format!("{C_GREEN}{name}{C_RESET} {C_DIM}({}){C_RESET}", ctx.registry.registry_url()));
    let mut tags: Vec<_> = meta.dist_tags.iter().collect();
    tags.sort();
    for (tag, version) in tags {
        println!("{C_GRAY}[pacm]{C_RESET}  {C_DIM}{tag}{C_RESET} -> {version}");
    }
    if let Some(vm) = meta.versions.get(&latest) {
        if let Some(description) = &vm.description {
            println!("{C_GRAY}[pacm]{C_RESET}  {description}");
        }
        println!(
            "{C_GRAY}[pacm]{C_RESET}  {} dependencies, tarball {}",
            vm.dependencies.len(),
            vm.dist.tarball
        );
    }
    println!("{C_GRAY}[pacm]{C_RESET}  {} published versions", meta.versions.len());
    Ok(())
}

/// Publishing is delegated to the ambient npm tooling; pacm only fronts it.
pub fn cmd_publish(args: Vec<String>) -> Result<()> {
    info("publishing via npm");
    let status = Command::new("npm")
        .arg("publish")
        .args(&args)
        .status()
        .fs_context(|| "spawn npm publish".into())?;
    if !status.success() {
        return Err(PacmError::Argument(format!("npm publish exited with {status}")));
    }
    Ok(())
}

const RELEASES_LATEST: &str = "https://api.github.com/repos/pacmpkg/pacm/releases/latest";

#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    tag_name: String,
    #[serde(default)]
    html_url: Option<String>,
}

/// Compare the running build against the latest GitHub release tag.
pub fn cmd_self_update() -> Result<()> {
    let http = registry::http_client();
    let resp = http
        .get(RELEASES_LATEST)
        .send()
        .map_err(|e| RegistryError::Transport("pacm release check".into(), e.to_string()))?;
    if !resp.status().is_success() {
        return Err(RegistryError::Transport(
            "pacm release check".into(),
            format!("github returned {}", resp.status()),
        )
        .into());
    }
    let release: ReleaseInfo = resp
        .json()
        .map_err(|e| RegistryError::Parse("pacm release check".into(), e.to_string()))?;
    let latest = release.tag_name.trim_start_matches('v');
    let current = env!("CARGO_PKG_VERSION");
    if latest == current {
        info(&format!("{C_GREEN}up to date{C_RESET} (v{current})"));
    } else {
        info(&format!(
            "{C_YELLOW}update available{C_RESET}: v{current} -> v{latest}{}",
            release
                .html_url
                .as_deref()
                .map(|u| format!(" ({u})"))
                .unwrap_or_default()
        ));
    }
    Ok(())
}

fn context() -> Result<PacmContext> {
    let project_dir = std::env::current_dir().fs_context(|| "determine working directory".into())?;
    let manifest = Manifest::load_or_default(&project_dir.join(MANIFEST_FILE))?;
    Ok(PacmContext::new(project_dir, Some(&manifest)))
}
