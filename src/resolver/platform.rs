/// npm-style platform gating. `os`/`cpu` lists may allow (`linux`) or block
/// (`!linux`); block entries take precedence, and a non-empty allow list
/// must contain the current identifier.
pub fn check(os_list: &[String], cpu_list: &[String]) -> Result<(), String> {
    if !list_allows(os_list, node_os()) {
        return Err(format!("os {os_list:?} excludes {}", node_os()));
    }
    if !list_allows(cpu_list, node_arch()) {
        return Err(format!("cpu {cpu_list:?} excludes {}", node_arch()));
    }
    Ok(())
}

fn list_allows(list: &[String], current: &str) -> bool {
    if list.is_empty() {
        return true;
    }
    let mut allowed: Option<bool> = None;
    let mut blocked = false;
    for entry in list {
        if let Some(negated) = entry.strip_prefix('!') {
            if negated == current {
                blocked = true;
            }
        } else {
            allowed.get_or_insert(false);
            if entry == current {
                allowed = Some(true);
            }
        }
    }
    !blocked && allowed.unwrap_or(true)
}

/// The current platform under node's `process.platform` naming.
pub fn node_os() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "win32"
    }
    #[cfg(target_os = "macos")]
    {
        "darwin"
    }
    #[cfg(target_os = "linux")]
    {
        "linux"
    }
    #[cfg(target_os = "freebsd")]
    {
        "freebsd"
    }
    #[cfg(target_os = "openbsd")]
    {
        "openbsd"
    }
    #[cfg(target_os = "netbsd")]
    {
        "netbsd"
    }
    #[cfg(target_os = "aix")]
    {
        "aix"
    }
    #[cfg(target_os = "solaris")]
    {
        "sunos"
    }
}

/// The current architecture under node's `process.arch` naming.
pub fn node_arch() -> &'static str {
    #[cfg(target_arch = "x86_64")]
    {
        "x64"
    }
    #[cfg(target_arch = "x86")]
    {
        "ia32"
    }
    #[cfg(target_arch = "arm")]
    {
        "arm"
    }
    #[cfg(target_arch = "aarch64")]
    {
        "arm64"
    }
    #[cfg(target_arch = "mips")]
    {
        "mips"
    }
    #[cfg(target_arch = "powerpc")]
    {
        "ppc"
    }
    #[cfg(target_arch = "powerpc64")]
    {
        "ppc64"
    }
    #[cfg(target_arch = "s390x")]
    {
        "s390x"
    }
    #[cfg(target_arch = "riscv64")]
    {
        "riscv64"
    }
}
