use crate::cli::progress::info;
use crate::colors::*;
use crate::error::{FsContext, Result};
use crate::lockfile::{Lockfile, LOCKFILE_NAME};

pub fn cmd_list() -> Result<()> {
    let project_dir = std::env::current_dir().fs_context(|| "determine working directory".into())?;
    let lock = Lockfile::load_or_default(&project_dir.join(LOCKFILE_NAME))?;
    if lock.is_empty() {
        info("no lockfile entries. Run 'pacm install' first.");
        return Ok(());
    }
    let count = lock.direct_entries().count();
    info(&format!("direct dependencies ({count}):"));
    for (name, entry, dev) in lock.direct_entries() {
        let origin = if dev { "dev" } else { "prod" };
        println!(
            "{C_GRAY}[pacm]{C_RESET}  {C_DIM}-{C_RESET} {name}@{} {C_DIM}({origin}){C_RESET}",
            entry.version
        );
    }
    Ok(())
}
