use std::path::Path;
use std::process::Command;

/// Run a lifecycle script with the shell, cwd set to the package directory.
/// Callers decide whether a failure is fatal; for postinstall it is not.
pub fn run_script(dir: &Path, script: &str) -> Result<(), String> {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(script);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(script);
        c
    };
    cmd.current_dir(dir);
    match cmd.status() {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(format!("exited with {status}")),
        Err(e) => Err(format!("failed to spawn: {e}")),
    }
}
