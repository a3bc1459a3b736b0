use crate::cli::progress::info;
use crate::error::{FsContext, PacmError, Result};
use crate::manifest::{Manifest, MANIFEST_FILE};
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// Run a manifest script (or a `.bin` binary of the same name) with
/// `node_modules/.bin` prefixed onto PATH. The child's exit code becomes
/// ours.
pub fn cmd_run(script: String, args: Vec<String>) -> Result<()> {
    let project_dir = std::env::current_dir().fs_context(|| "determine working directory".into())?;
    let manifest = Manifest::load_or_default(&project_dir.join(MANIFEST_FILE))?;
    let bin_dir = project_dir.join("node_modules").join(".bin");
    let path_env = path_with_bin_prefix(&bin_dir);

    if let Some(body) = manifest.script(&script) {
        let command = if args.is_empty() {
            body.to_string()
        } else {
            format!("{} {}", body, args.join(" "))
        };
        info(&format!("running script: {script}"));
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&command);
            c
        };
        cmd.current_dir(&project_dir);
        if let Some(path) = &path_env {
            cmd.env("PATH", path);
        }
        let status = cmd
            .status()
            .fs_context(|| format!("spawn script '{script}'"))?;
        if !status.success() {
            std::process::exit(status.code().unwrap_or(1));
        }
        return Ok(());
    }

    let candidate = bin_dir.join(&script);
    if candidate.exists() {
        info(&format!("running binary: {script}"));
        let mut cmd = Command::new(&candidate);
        cmd.args(&args).current_dir(&project_dir);
        if let Some(path) = &path_env {
            cmd.env("PATH", path);
        }
        let status = cmd
            .status()
            .fs_context(|| format!("spawn binary '{script}'"))?;
        if !status.success() {
            std::process::exit(status.code().unwrap_or(1));
        }
        return Ok(());
    }

    Err(PacmError::Argument(format!(
        "no script or binary named '{script}' (checked package.json scripts and node_modules/.bin)"
    )))
}

fn path_with_bin_prefix(bin_dir: &Path) -> Option<OsString> {
    if !bin_dir.exists() {
        return None;
    }
    let sep = if cfg!(windows) { ";" } else { ":" };
    let mut path = OsString::from(bin_dir.as_os_str());
    if let Some(current) = std::env::var_os("PATH") {
        path.push(sep);
        path.push(current);
    }
    Some(path)
}
