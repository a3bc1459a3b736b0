use crate::error::{PacmError, Result};

/// A user- or dependency-supplied package request.
///
/// Two shapes are recognized: plain `name[@range]` (scoped names carry one
/// `/` and split on the second `@`) and the alias form
/// `alias@npm:real@range`, where the installed directory uses `alias` but
/// resolution and download use `real`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub range: String,
    pub real_name: Option<String>,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>, range: impl Into<String>) -> Self {
        Self { name: name.into(), range: range.into(), real_name: None }
    }

    /// The name used against the registry (the alias target when present).
    pub fn registry_name(&self) -> &str {
        self.real_name.as_deref().unwrap_or(&self.name)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PacmError::Argument("empty package spec".into()));
        }
        if raw.starts_with("github:") || raw.contains("@github:") {
            return Err(PacmError::Argument(format!(
                "unsupported spec '{raw}': github sources are not supported"
            )));
        }

        if let Some((alias, rest)) = raw.split_once("@npm:") {
            if alias.is_empty() {
                return Err(PacmError::Argument(format!("invalid alias spec '{raw}'")));
            }
            let (real, range) = split_name_range(rest)?;
            return Ok(Self { name: alias.to_string(), range, real_name: Some(real) });
        }

        let (name, range) = split_name_range(raw)?;
        Ok(Self { name, range, real_name: None })
    }

    /// Build a spec from a manifest entry. Alias installs are recorded there
    /// as `"alias": "npm:real@version"`, so an `npm:` value re-targets the
    /// registry name.
    pub fn from_manifest_entry(name: &str, range: &str) -> Self {
        if let Some(rest) = range.strip_prefix("npm:") {
            if let Ok((real, real_range)) = split_name_range(rest) {
                return Self {
                    name: name.to_string(),
                    range: real_range,
                    real_name: Some(real),
                };
            }
        }
        Self::new(name, range)
    }
}

/// Split `name[@range]`; the range `@` of a scoped name is the second one.
/// A missing range defaults to the literal `latest`.
fn split_name_range(raw: &str) -> Result<(String, String)> {
    if raw.is_empty() {
        return Err(PacmError::Argument("empty package name".into()));
    }
    let split_at = if let Some(rest) = raw.strip_prefix('@') {
        // @scope/name[@range]
        rest.find('@').map(|i| i + 1)
    } else {
        raw.find('@')
    };
    let (name, range) = match split_at {
        Some(idx) => {
            let range = &raw[idx + 1..];
            (&raw[..idx], if range.is_empty() { "latest" } else { range })
        }
        None => (raw, "latest"),
    };
    if name.is_empty() {
        return Err(PacmError::Argument(format!("invalid package spec '{raw}'")));
    }
    Ok((name.to_string(), range.to_string()))
}
