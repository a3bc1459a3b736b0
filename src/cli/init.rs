use crate::cli::progress::info;
use crate::colors::*;
use crate::error::{FsContext, PacmError, Result};
use crate::manifest::{Manifest, MANIFEST_FILE};
use std::path::PathBuf;

pub fn cmd_init(name: Option<String>, _yes: bool) -> Result<()> {
    let path = PathBuf::from(MANIFEST_FILE);
    if path.exists() {
        return Err(PacmError::Argument("package.json already exists".into()));
    }
    let dir_name = std::env::current_dir()
        .fs_context(|| "determine working directory".into())?
        .file_name()
        .and_then(|n| n.to_str().map(String::from))
        .unwrap_or_else(|| "my-app".into());
    let manifest = Manifest::new(name.unwrap_or(dir_name), "1.0.0".into());
    manifest.write(&path)?;
    info(&format!(
        "{C_GREEN}init{C_RESET} created {}@{}",
        manifest.name.as_deref().unwrap_or(""),
        manifest.version.as_deref().unwrap_or("")
    ));
    Ok(())
}
