use thiserror::Error;

pub type Result<T, E = PacmError> = std::result::Result<T, E>;

/// Registry metadata failures. Transport failures retry before surfacing.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("package '{0}' not found in registry")]
    NotFound(String),
    #[error("registry request failed for '{0}': {1}")]
    Transport(String, String),
    #[error("invalid registry document for '{0}': {1}")]
    Parse(String, String),
}

#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    #[error("no version of '{0}' satisfies '{1}'")]
    NoMatchingVersion(String, String),
    #[error("no dist-tag '{1}' for '{0}'")]
    NoSuchTag(String, String),
    #[error("{0}@{1} is not compatible with this platform ({2})")]
    PlatformIncompatible(String, String, String),
}

/// Tarball cache failures. Variants carry strings so single-flight waiters
/// can share a cloned result.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("download failed for {0}: {1}")]
    Download(String, String),
    #[error("integrity mismatch for {0}: {1}")]
    Integrity(String, String),
    #[error("extract failed for {0}: {1}")]
    Extract(String, String),
    #[error("cache i/o error for {0}: {1}")]
    Io(String, String),
}

#[derive(Debug, Clone, Error)]
pub enum PacmError {
    #[error("{0}")]
    Argument(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("{0}")]
    Filesystem(String),
    #[error("postinstall failed: {0}")]
    PostInstall(String),
}

impl PacmError {
    /// Stable category tag printed on the single fatal error line.
    pub fn tag(&self) -> &'static str {
        match self {
            PacmError::Argument(_) => "PACM_ARG_ERROR",
            PacmError::Registry(_) => "PACM_FETCH_METADATA_ERROR",
            PacmError::Resolution(_) => "PACM_RESOLVE_ERROR",
            PacmError::Cache(_) => "PACM_CACHE_ERROR",
            PacmError::Filesystem(_) => "PACM_FS_ERROR",
            PacmError::PostInstall(_) => "PACM_POSTINSTALL_WARNING",
        }
    }
}

impl From<std::io::Error> for PacmError {
    fn from(err: std::io::Error) -> Self {
        PacmError::Filesystem(err.to_string())
    }
}

/// Attach a short what-failed prefix to filesystem errors, in the spirit of
/// anyhow's `with_context` but landing in the closed taxonomy.
pub trait FsContext<T> {
    fn fs_context(self, what: impl FnOnce() -> String) -> Result<T>;
}

impl<T> FsContext<T> for std::io::Result<T> {
    fn fs_context(self, what: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|e| PacmError::Filesystem(format!("{}: {e}", what())))
    }
}

/// True when the error chain bottoms out in a TCP reset; such failures are
/// the only ones the network layers retry.
pub fn is_connection_reset(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut cur: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = cur {
        if let Some(io_err) = e.downcast_ref::<std::io::Error>() {
            if io_err.kind() == std::io::ErrorKind::ConnectionReset {
                return true;
            }
        }
        cur = e.source();
    }
    false
}
