use crate::cli::progress::info;
use crate::colors::*;
use crate::cache::CacheStore;
use crate::error::Result;
use crate::fsutil;

pub fn cmd_clean() -> Result<()> {
    let cache = CacheStore::new(fsutil::cache_root());
    match cache.clean()? {
        Some(bytes) => {
            let mib = bytes as f64 / 1024.0 / 1024.0;
            info(&format!(
                "{C_GREEN}cache cleaned{C_RESET} {mib:.2} MiB freed from {}",
                cache.root().display()
            ));
        }
        None => info("cache is empty"),
    }
    Ok(())
}
