use crate::resolver::spec::PackageSpec;

#[test]
fn plain_name_defaults_to_latest() {
    let spec = PackageSpec::parse("lodash").unwrap();
    assert_eq!(spec.name, "lodash");
    assert_eq!(spec.range, "latest");
    assert_eq!(spec.real_name, None);
}

#[test]
fn plain_name_with_range() {
    let spec = PackageSpec::parse("lodash@^4.17.0").unwrap();
    assert_eq!((spec.name.as_str(), spec.range.as_str()), ("lodash", "^4.17.0"));
}

#[test]
fn scoped_name_splits_on_second_at() {
    let spec = PackageSpec::parse("@types/node@^20.1.0").unwrap();
    assert_eq!(spec.name, "@types/node");
    assert_eq!(spec.range, "^20.1.0");

    let bare = PackageSpec::parse("@types/node").unwrap();
    assert_eq!(bare.name, "@types/node");
    assert_eq!(bare.range, "latest");
}

#[test]
fn trailing_at_means_latest() {
    let spec = PackageSpec::parse("chalk@").unwrap();
    assert_eq!(spec.range, "latest");
}

#[test]
fn alias_spec_targets_real_package() {
    let spec = PackageSpec::parse("my-lodash@npm:lodash@^4").unwrap();
    assert_eq!(spec.name, "my-lodash");
    assert_eq!(spec.range, "^4");
    assert_eq!(spec.real_name.as_deref(), Some("lodash"));
    assert_eq!(spec.registry_name(), "lodash");
}

#[test]
fn alias_spec_with_scoped_target() {
    let spec = PackageSpec::parse("node-types@npm:@types/node@20.0.0").unwrap();
    assert_eq!(spec.name, "node-types");
    assert_eq!(spec.real_name.as_deref(), Some("@types/node"));
    assert_eq!(spec.range, "20.0.0");
}

#[test]
fn github_specs_are_rejected() {
    assert!(PackageSpec::parse("github:expressjs/express").is_err());
    assert!(PackageSpec::parse("express@github:expressjs/express").is_err());
}

#[test]
fn parse_round_trips_name_and_range() {
    for (raw, name, range) in [
        ("react@18.2.0", "react", "18.2.0"),
        ("@scope/pkg@1.x", "@scope/pkg", "1.x"),
        ("tap@>=1.0.0 <2.0.0", "tap", ">=1.0.0 <2.0.0"),
    ] {
        let spec = PackageSpec::parse(raw).unwrap();
        assert_eq!((spec.name.as_str(), spec.range.as_str()), (name, range));
    }
}

#[test]
fn manifest_entry_recovers_alias() {
    let spec = PackageSpec::from_manifest_entry("my-lodash", "npm:lodash@4.17.21");
    assert_eq!(spec.name, "my-lodash");
    assert_eq!(spec.real_name.as_deref(), Some("lodash"));
    assert_eq!(spec.range, "4.17.21");

    let plain = PackageSpec::from_manifest_entry("chalk", "^5.0.0");
    assert_eq!(plain.real_name, None);
    assert_eq!(plain.range, "^5.0.0");
}
