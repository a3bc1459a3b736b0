use indexmap::IndexMap;
use pacm::lockfile::{LockEntry, Lockfile};

fn entry(version: &str, deps: &[(&str, &str)]) -> LockEntry {
    LockEntry {
        version: version.to_string(),
        resolved: format!("https://registry.npmjs.org/pkg/-/pkg-{version}.tgz"),
        integrity: "sha512-dGVzdA==".to_string(),
        dependencies: deps.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        peer_dependencies: IndexMap::new(),
    }
}

#[test]
fn lockfile_round_trip_preserves_entries_and_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pacm.lockp");

    let mut lock = Lockfile::default();
    lock.insert("express", entry("4.18.2", &[("accepts", "1.3.8")]), false);
    lock.insert("lodash", entry("4.17.21", &[]), false);
    lock.insert("typescript", entry("5.4.5", &[]), true);
    lock.write(&path).unwrap();

    let loaded = Lockfile::load_or_default(&path).unwrap();
    assert_eq!(loaded, lock);

    let names: Vec<&String> = loaded.dependencies.keys().collect();
    assert_eq!(names, ["express", "lodash"]);
    assert_eq!(
        loaded.dependencies["express"].dependencies.get("accepts").map(String::as_str),
        Some("1.3.8")
    );
}

#[test]
fn empty_lockfile_content_is_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pacm.lockp");
    std::fs::write(&path, "").unwrap();
    assert!(Lockfile::load_or_default(&path).unwrap().is_empty());
}
