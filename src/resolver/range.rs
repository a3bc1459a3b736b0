use crate::error::ResolutionError;
use crate::registry::{PackageMetadata, VersionMetadata};
use semver::{Version, VersionReq};

/// Pick the concrete version for `range` out of a metadata document.
///
/// `latest` goes through dist-tags; anything that compiles as an npm range
/// picks the maximum satisfying version; a tag-looking leftover is tried as
/// a dist-tag.
pub fn pick_version<'a>(
    meta: &'a PackageMetadata,
    name: &str,
    range: &str,
) -> Result<&'a VersionMetadata, ResolutionError> {
    let range = range.trim();
    if range.eq_ignore_ascii_case("latest") {
        return pick_tag(meta, name, "latest");
    }

    match compile_range(range) {
        Some(reqs) => {
            let allow_prerelease =
                reqs.iter().any(|r| r.comparators.iter().any(|c| !c.pre.is_empty()));
            let mut candidates: Vec<(Version, &VersionMetadata)> = meta
                .versions
                .values()
                .filter_map(|vm| Version::parse(&vm.version).ok().map(|v| (v, vm)))
                .collect();
            candidates.sort_by(|a, b| b.0.cmp(&a.0));
            candidates
                .into_iter()
                .find(|(ver, _)| {
                    (ver.pre.is_empty() || allow_prerelease)
                        && reqs.iter().any(|r| r.matches(ver))
                })
                .map(|(_, vm)| vm)
                .ok_or_else(|| {
                    ResolutionError::NoMatchingVersion(name.to_string(), range.to_string())
                })
        }
        None if looks_like_dist_tag(range) => pick_tag(meta, name, range),
        None => Err(ResolutionError::NoMatchingVersion(name.to_string(), range.to_string())),
    }
}

fn pick_tag<'a>(
    meta: &'a PackageMetadata,
    name: &str,
    tag: &str,
) -> Result<&'a VersionMetadata, ResolutionError> {
    let ver = meta
        .dist_tags
        .get(tag)
        .ok_or_else(|| ResolutionError::NoSuchTag(name.to_string(), tag.to_string()))?;
    meta.versions
        .get(ver)
        .ok_or_else(|| ResolutionError::NoMatchingVersion(name.to_string(), ver.to_string()))
}

/// Compile an npm range into semver requirements, one per `||` branch.
pub fn compile_range(range: &str) -> Option<Vec<VersionReq>> {
    let branches: Vec<&str> = if range.contains("||") {
        range.split("||").map(str::trim).filter(|p| !p.is_empty()).collect()
    } else {
        vec![range.trim()]
    };
    if branches.is_empty() {
        return None;
    }
    let mut reqs = Vec::with_capacity(branches.len());
    for branch in branches {
        let canon = canonicalize_npm_range(branch);
        let req = if canon == "*" { VersionReq::STAR } else { VersionReq::parse(&canon).ok()? };
        reqs.push(req);
    }
    Some(reqs)
}

/// Rewrite one npm range branch into the syntax the semver crate accepts:
/// wildcard patterns, bare majors, hyphen ranges and space-separated
/// comparator lists all normalize to comma-joined comparators.
pub fn canonicalize_npm_range(input: &str) -> String {
    let s = input.trim();
    if s.is_empty() || s == "*" || s.eq_ignore_ascii_case("latest") {
        return "*".into();
    }

    // A full version (prerelease/build included) means exact.
    if Version::parse(s).is_ok() {
        return format!("={s}");
    }

    // Hyphen range: "1.2.3 - 2.3.4". Spaces required so prerelease hyphens
    // stay untouched.
    if let Some(idx) = s.find(" - ") {
        let (left, right) = (s[..idx].trim(), s[idx + 3..].trim());
        if is_version_like(left) && is_version_like(right) {
            return format!(">={left}, <={right}");
        }
    }

    let tokens: Vec<&str> = s.split_whitespace().collect();
    if tokens.len() > 1 {
        let mut comparators: Vec<String> = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let tok = tokens[i];
            if is_operator(tok) {
                match tokens.get(i + 1) {
                    Some(ver) => {
                        comparators.push(format!("{tok}{ver}"));
                        i += 2;
                    }
                    // Dangling operator: give up, let the caller fail.
                    None => return s.to_string(),
                }
            } else if tok.starts_with(['^', '~', '>', '<', '=']) {
                comparators.push(tok.to_string());
                i += 1;
            } else if is_version_like(tok) {
                comparators.push(expand_single(tok));
                i += 1;
            } else {
                return s.to_string();
            }
        }
        return comparators.join(", ");
    }

    expand_single(s)
}

/// Expand a single bare token: wildcards, bare major/minor, exact.
fn expand_single(tok: &str) -> String {
    if tok.contains('x') || tok.contains('X') || tok.contains('*') {
        return expand_wildcard(tok);
    }
    if is_numeric(tok) {
        return format!("^{tok}.0.0");
    }
    if tok.chars().all(|c| c.is_ascii_digit() || c == '.') && count_dots(tok) == 1 {
        let (major, minor) = tok.split_once('.').unwrap();
        if let Ok(minor_num) = minor.parse::<u64>() {
            return format!(">={major}.{minor}.0, <{major}.{}.0", minor_num + 1);
        }
    }
    if Version::parse(tok).is_ok() {
        return format!("={tok}");
    }
    tok.to_string()
}

fn expand_wildcard(pattern: &str) -> String {
    let parts: Vec<&str> = pattern.split('.').collect();
    let is_wild = |p: &str| p.eq_ignore_ascii_case("x") || p == "*";
    match parts.as_slice() {
        [major, rest] if is_wild(rest) => {
            if let Ok(major_num) = major.parse::<u64>() {
                return format!(">={major_num}.0.0, <{}.0.0", major_num + 1);
            }
        }
        [major, minor, rest] if is_wild(rest) => {
            if let (Ok(_), Ok(minor_num)) = (major.parse::<u64>(), minor.parse::<u64>()) {
                return format!(">={major}.{minor}.0, <{major}.{}.0", minor_num + 1);
            }
        }
        _ => {}
    }
    pattern.to_string()
}

/// A tag spec is a bare word that is neither a version nor a range.
pub fn looks_like_dist_tag(s: &str) -> bool {
    !s.is_empty()
        && s != "*"
        && !s.eq_ignore_ascii_case("latest")
        && !s.contains(' ')
        && !s.contains("||")
        && !s.contains(',')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && Version::parse(s).is_err()
}

fn is_operator(t: &str) -> bool {
    matches!(t, ">" | "<" | ">=" | "<=" | "=" | "^" | "~")
}

fn is_numeric(t: &str) -> bool {
    !t.is_empty() && t.chars().all(|c| c.is_ascii_digit())
}

fn count_dots(t: &str) -> usize {
    t.chars().filter(|&c| c == '.').count()
}

fn is_version_like(t: &str) -> bool {
    let mut has_digit = false;
    for c in t.chars() {
        if c.is_ascii_digit() {
            has_digit = true;
        } else if !matches!(c, '.' | '-' | '+' | '*' | 'a'..='z' | 'A'..='Z') {
            return false;
        }
    }
    has_digit
}
