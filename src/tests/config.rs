use super::common::EnvSandbox;
use crate::config::{Config, DEFAULT_REGISTRY};
use crate::manifest::{Manifest, PublishConfig};
use std::fs;

#[test]
fn default_registry_when_nothing_configured() {
    let sandbox = EnvSandbox::new();
    let project = sandbox.project_root();
    let config = Config::discover(&project, None);
    assert_eq!(config.registry, DEFAULT_REGISTRY);
}

#[test]
fn project_npmrc_wins_over_user_npmrc() {
    let sandbox = EnvSandbox::new();
    let project = sandbox.project_root();
    fs::write(sandbox.home().join(".npmrc"), "registry = https://user.example\n").unwrap();
    fs::write(project.join(".npmrc"), "# local override\nregistry=https://project.example/\n")
        .unwrap();
    let config = Config::discover(&project, None);
    assert_eq!(config.registry, "https://project.example");
}

#[test]
fn user_npmrc_wins_over_publish_config() {
    let sandbox = EnvSandbox::new();
    let project = sandbox.project_root();
    fs::write(sandbox.home().join(".npmrc"), "registry = https://user.example\n").unwrap();
    let mut manifest = Manifest::default();
    manifest.publish_config = Some(PublishConfig {
        registry: Some("https://manifest.example".into()),
        ..PublishConfig::default()
    });
    let config = Config::discover(&project, Some(&manifest));
    assert_eq!(config.registry, "https://user.example");
}

#[test]
fn publish_config_wins_over_default() {
    let sandbox = EnvSandbox::new();
    let project = sandbox.project_root();
    let mut manifest = Manifest::default();
    manifest.publish_config = Some(PublishConfig {
        registry: Some("https://manifest.example".into()),
        ..PublishConfig::default()
    });
    let config = Config::discover(&project, Some(&manifest));
    assert_eq!(config.registry, "https://manifest.example");
}

#[test]
fn unrelated_npmrc_lines_are_ignored() {
    let sandbox = EnvSandbox::new();
    let project = sandbox.project_root();
    fs::write(
        project.join(".npmrc"),
        "; comment\nsave-exact=true\nregistry = https://inline.example\nfund=false\n",
    )
    .unwrap();
    let config = Config::discover(&project, None);
    assert_eq!(config.registry, "https://inline.example");
}
