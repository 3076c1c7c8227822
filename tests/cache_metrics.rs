mod support;

use std::collections::HashSet;
use std::sync::Arc;

use menusync::cache::MemoryCacheStore;
use menusync::domain::input::MenuInput;
use metrics_util::debugging::DebuggingRecorder;
use serial_test::serial;

use support::{DownCacheStore, Harness, StaticSnapshot, dish, menu, submenu};

#[tokio::test]
#[serial]
async fn cache_and_sync_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    // hit, miss, invalidation
    let harness = Harness::new();
    harness
        .menus
        .create(MenuInput {
            title: "Breakfast".to_string(),
            description: None,
        })
        .await
        .expect("menu");
    harness.menus.get_list().await.expect("miss");
    harness.menus.get_list().await.expect("hit");

    // backend errors
    let down = Harness::with_store(
        Arc::new(MemoryCacheStore::new()),
        Arc::new(DownCacheStore::default()),
    );
    down.menus.get_list().await.expect("read through outage");

    // sync outcomes
    let source = StaticSnapshot::new(vec![menu(
        1,
        "Lunch",
        vec![submenu(2, "Soups", vec![dish(3, "Borscht", "5.00", Some("10"))])],
    )]);
    harness.synchronizer.run(&source).await.expect("applied");
    harness.synchronizer.run(&source).await.expect("noop");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "menusync_cache_hit_total",
        "menusync_cache_miss_total",
        "menusync_cache_error_total",
        "menusync_cache_invalidated_keys_total",
        "menusync_sync_runs_total",
        "menusync_sync_duration_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
