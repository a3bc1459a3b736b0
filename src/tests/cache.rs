use super::common::{self, EnvSandbox};
use crate::cache::{verify_integrity, CacheStore};
use crate::error::CacheError;
use crate::fetch::{extract_tarball, TarballFetcher};
use crate::fsutil;
use crate::registry;
use serde_json::json;
use std::fs;
use std::sync::Arc;

#[test]
fn safe_name_flattens_scopes() {
    assert_eq!(CacheStore::safe_name("lodash"), "lodash");
    assert_eq!(CacheStore::safe_name("@types/node"), "@types_node");
}

#[test]
fn lookup_finds_seeded_tarballs_for_scoped_and_plain_names() {
    let _sandbox = EnvSandbox::new();
    let bytes = common::package_tarball(&json!({"name": "a", "version": "1.0.0"}), &[]);
    common::seed_cache_tarball("a", "1.0.0", &bytes);
    common::seed_cache_tarball("@scope/b", "2.1.0", &bytes);

    let cache = CacheStore::new(fsutil::cache_root());
    assert!(cache.lookup("a", "1.0.0").is_some());
    assert!(cache.lookup("@scope/b", "2.1.0").is_some());
    assert!(cache.lookup("a", "9.9.9").is_none());
}

#[test]
fn publish_lands_at_the_layout_path_and_indexes() {
    let sandbox = EnvSandbox::new();
    let bytes = common::package_tarball(&json!({"name": "c", "version": "3.0.0"}), &[]);
    let staged = sandbox.home().join("staged.tgz");
    fs::write(&staged, &bytes).unwrap();

    let cache = CacheStore::new(fsutil::cache_root());
    let published = cache.publish("@scope/c", "3.0.0", &staged).unwrap();
    assert_eq!(published, fsutil::cache_root().join("@scope_c").join("3.0.0.tgz"));
    assert!(published.is_file());
    assert!(cache.lookup("@scope/c", "3.0.0").is_some());
}

#[test]
fn integrity_accepts_matching_digest_for_each_algorithm() {
    let sandbox = EnvSandbox::new();
    let bytes = b"tarball bytes".to_vec();
    let path = sandbox.home().join("t.tgz");
    fs::write(&path, &bytes).unwrap();

    // sha512 of the exact bytes, as the registry would publish it.
    let sha512 = common::integrity_of(&bytes);
    assert!(verify_integrity(&path, &sha512, "t@1").is_ok());
    assert!(verify_integrity(&path, "", "t@1").is_ok(), "empty integrity skips the check");
}

#[test]
fn integrity_mismatch_and_bad_algorithm_fail() {
    let sandbox = EnvSandbox::new();
    let path = sandbox.home().join("t.tgz");
    fs::write(&path, b"tarball bytes").unwrap();

    let wrong = common::integrity_of(b"other bytes");
    assert!(matches!(
        verify_integrity(&path, &wrong, "t@1"),
        Err(CacheError::Integrity(_, _))
    ));
    assert!(matches!(
        verify_integrity(&path, "md5-AAAA", "t@1"),
        Err(CacheError::Integrity(_, _))
    ));
}

#[test]
fn extract_strips_leading_package_component() {
    let sandbox = EnvSandbox::new();
    let bytes = common::package_tarball(
        &json!({"name": "d", "version": "1.0.0"}),
        &[("lib/index.js", "module.exports = 1;\n")],
    );
    let tarball = sandbox.home().join("d.tgz");
    fs::write(&tarball, &bytes).unwrap();

    let dest = sandbox.home().join("out");
    extract_tarball(&tarball, &dest).unwrap();
    assert!(dest.join("package.json").is_file());
    assert!(dest.join("lib").join("index.js").is_file());
    assert!(!dest.join("package").exists());
}

#[test]
fn concurrent_requesters_share_one_flight() {
    let registry = common::FakeRegistry::start();
    let _sandbox = EnvSandbox::new();
    let manifest = json!({"name": "flight", "version": "1.0.0"});
    let integrity = registry.publish_package("flight", "1.0.0", &manifest, &[]);
    let url = format!("{}/tarballs/flight/1.0.0.tgz", registry.url());

    let cache = Arc::new(CacheStore::new(fsutil::cache_root()));
    let fetcher = TarballFetcher::new(registry::http_client(), cache, 3);

    let baseline = registry.hits();
    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                fetcher
                    .ensure_tarball("flight", "1.0.0", &url, &integrity)
                    .expect("tarball fetch");
            });
        }
    });
    assert_eq!(registry.hits() - baseline, 1, "exactly one download for eight requesters");
}

#[test]
fn corrupt_download_is_rejected_and_not_cached() {
    let registry = common::FakeRegistry::start();
    let _sandbox = EnvSandbox::new();
    let manifest = json!({"name": "bad", "version": "1.0.0"});
    registry.publish_package("bad", "1.0.0", &manifest, &[]);
    let url = format!("{}/tarballs/bad/1.0.0.tgz", registry.url());
    // Integrity of different bytes: the download must fail verification.
    let wrong = common::integrity_of(b"not the tarball");

    let cache = Arc::new(CacheStore::new(fsutil::cache_root()));
    let fetcher = TarballFetcher::new(registry::http_client(), cache.clone(), 3);
    let err = fetcher.ensure_tarball("bad", "1.0.0", &url, &wrong).unwrap_err();
    assert!(matches!(err, CacheError::Integrity(_, _)));
    assert!(cache.lookup("bad", "1.0.0").is_none());
}
