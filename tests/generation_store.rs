//! Loading generations from disk, publishing them, and hot reload.

use std::fs;
use std::time::Duration;

use gateway_config_engine::config::loader::load_sources;
use gateway_config_engine::config::{ConfigWatcher, GenerationStore, LoadError};
use tempfile::tempdir;

mod common;

fn proxy_id(sources: &gateway_config_engine::GenerationSources) -> Option<&str> {
    sources.global.tree.get("proxy").and_then(|p| p.get("id")).and_then(|v| v.as_str())
}

#[test]
fn test_generation_loaded_from_disk() {
    let dir = tempdir().unwrap();
    let config = common::write_generation(
        dir.path(),
        common::GLOBAL_CONFIG,
        &[("main.toml", common::PIPELINE_MAIN)],
    );

    let sources = load_sources(&config, None, &[]).unwrap();
    assert_eq!(sources.pipelines.len(), 1);
    assert!(sources.pipelines[0].name.ends_with("main.toml"));

    let store = GenerationStore::new();
    let report = store.apply(&common::engine(), sources);
    assert!(report.is_valid(), "{}", report);

    let live = store.current().unwrap();
    assert_eq!(live.id, 1);
    assert!(live.resolved.pipelines[0].resolved.backend("my_api").is_some());
}

#[test]
fn test_unreadable_pipeline_is_a_load_error() {
    let dir = tempdir().unwrap();
    let config = common::write_generation(dir.path(), common::GLOBAL_CONFIG, &[("bad.toml", "[pipelines.x")]);

    let err = load_sources(&config, None, &[]).unwrap_err();
    assert!(matches!(err, LoadError::Parse { .. }));
}

#[test]
fn test_rejected_generation_keeps_live_one() {
    let engine = common::engine();
    let store = GenerationStore::new();

    let good = common::sources(common::GLOBAL_CONFIG, &[("main.toml", common::PIPELINE_MAIN)]);
    assert!(store.apply(&engine, good).is_valid());

    let broken_pipeline = common::PIPELINE_MAIN.replace("target_ref = \"api\"", "target_ref = \"missing-id\"");
    let bad = common::sources(common::GLOBAL_CONFIG, &[("main.toml", broken_pipeline.as_str())]);
    let report = store.apply(&engine, bad);
    assert!(!report.is_valid());

    let live = store.current().unwrap();
    assert_eq!(live.id, 1);
    let backend = live.resolved.pipelines[0].resolved.backend("my_api").unwrap();
    assert_eq!(backend.inherits.as_deref(), Some("targets.api"));
}

#[tokio::test]
async fn test_watcher_reloads_on_change() {
    let dir = tempdir().unwrap();
    let config = common::write_generation(
        dir.path(),
        common::GLOBAL_CONFIG,
        &[("main.toml", common::PIPELINE_MAIN)],
    );

    let (watcher, mut updates) = ConfigWatcher::new(&config, None);
    let _watcher = watcher.with_poll_interval(Duration::from_millis(100)).run().unwrap();

    let changed = common::GLOBAL_CONFIG.replace("gateway-01", "gateway-02");
    fs::write(&config, changed).unwrap();

    let sources = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match updates.recv().await {
                Some(sources) if proxy_id(&sources) == Some("gateway-02") => break Some(sources),
                Some(_) => continue,
                None => break None,
            }
        }
    })
    .await
    .expect("reload within timeout")
    .expect("watcher channel open");

    assert_eq!(sources.pipelines.len(), 1);
}
