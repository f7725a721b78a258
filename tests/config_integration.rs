//! ---
//! ems_section: "15-testing-qa-runbook"
//! ems_subsection: "integration-tests"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Checks on the shipped configuration samples."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;
use std::time::Duration;

use pisim_common::config::AppConfig;

fn read(path: &str) -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let full = Path::new(manifest_dir).join("..").join(path);
    fs::read_to_string(&full)
        .unwrap_or_else(|err| panic!("failed to read {}: {}", full.display(), err))
}

#[test]
fn example_config_is_valid() {
    let config: AppConfig = read("configs/pisim.example.toml").parse().unwrap();
    config.validate().unwrap();
    assert_eq!(config.generator.count, 1);
    assert_eq!(config.generator.pacing, Duration::from_millis(200));
    assert!(config.upload.timeout.is_none());
}

#[test]
fn example_config_carries_frontmatter() {
    let content = read("configs/pisim.example.toml");
    assert!(content.starts_with("# ---"));
}

#[test]
fn endpoint_is_required_once_removed() {
    let mut config: AppConfig = read("configs/pisim.example.toml").parse().unwrap();
    config.upload.endpoint.clear();
    assert!(config.validate().is_err());
}
