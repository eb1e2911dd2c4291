//! Settings files, environment overrides and the wiring they drive.

use std::fs;

use docent::Settings;
use docent::chunking::BreakpointScope;
use docent::config::{CONFIG_DIR, SETTINGS_FILE};
use docent::vector::DistanceMetric;
use tempfile::TempDir;

#[test]
fn test_init_writes_loadable_template() {
    let dir = TempDir::new().unwrap();
    let path = Settings::init_config_file(dir.path(), false).unwrap();
    assert_eq!(path, dir.path().join(CONFIG_DIR).join(SETTINGS_FILE));

    let settings = Settings::load_from(&path).unwrap();
    let defaults = Settings::default();
    assert_eq!(settings.index_path, defaults.index_path);
    assert_eq!(settings.chunking, defaults.chunking);
    assert_eq!(settings.retrieval, defaults.retrieval);
    assert_eq!(settings.ingest, defaults.ingest);
    assert_eq!(settings.generation, defaults.generation);

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("api_key_env"));
    assert!(!text.to_lowercase().contains("api_key ="));
}

#[test]
fn test_env_overrides_nested_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(&path, "[embedding]\nrate_limit_delay_ms = 900\n").unwrap();

    // Only this test reads embedding.rate_limit_delay_ms from a loaded file
    unsafe {
        std::env::set_var("DOCENT_EMBEDDING__RATE_LIMIT_DELAY_MS", "250");
    }
    let settings = Settings::load_from(&path);
    unsafe {
        std::env::remove_var("DOCENT_EMBEDDING__RATE_LIMIT_DELAY_MS");
    }

    assert_eq!(settings.unwrap().embedding.rate_limit_delay_ms, 250);
}

#[test]
fn test_settings_drive_pipeline_options() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(
        &path,
        r#"
[embedding]
model = "text-embedding-3-small"
batch_size = 16

[chunking]
breakpoint_percentile = 80.0
scope = "corpus"

[index]
metric = "euclidean"
partition_threshold = 500
probe_clusters = 6
"#,
    )
    .unwrap();

    let settings = Settings::load_from(&path).unwrap();

    let chunker = settings.chunker_options();
    assert_eq!(chunker.breakpoint_percentile, 80.0);
    assert_eq!(chunker.scope, BreakpointScope::Corpus);
    assert_eq!(chunker.batch_size, 16);

    let index = settings.index_options();
    assert_eq!(index.metric, DistanceMetric::Euclidean);
    assert_eq!(index.model, "text-embedding-3-small");
    assert_eq!(index.partition_threshold, 500);
    assert_eq!(index.probe_clusters, 6);
}

#[test]
fn test_invalid_values_are_config_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(&path, "[ingest]\nextensions = []\n").unwrap();

    let err = Settings::load_from(&path).unwrap_err();
    assert_eq!(err.status_code(), "CONFIG_ERROR");
    assert!(!err.recovery_suggestions().is_empty());
}
