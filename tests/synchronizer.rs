mod support;

use std::sync::atomic::Ordering;
use std::time::Duration;

use menusync::application::snapshot::SnapshotSource;
use menusync::application::sync::SyncError;
use menusync::cache::{CacheKey, CacheStore};
use menusync::domain::tree::MenuTree;

use support::{Harness, StaticSnapshot, decimal, dish, id, menu, submenu};

fn lunch() -> Vec<MenuTree> {
    vec![menu(
        1,
        "Lunch",
        vec![
            submenu(
                10,
                "Mains",
                vec![
                    dish(100, "Goulash", "10.00", Some("20")),
                    dish(101, "Pilaf", "7.50", None),
                ],
            ),
            submenu(11, "Soups", vec![dish(110, "Borscht", "5.00", None)]),
        ],
    )]
}

fn without_discounts(mut tree: Vec<MenuTree>) -> Vec<MenuTree> {
    for dish in tree
        .iter_mut()
        .flat_map(|menu| menu.submenus.iter_mut())
        .flat_map(|submenu| submenu.dishes.iter_mut())
    {
        dish.discount = None;
    }
    tree
}

async fn run_until_settled(harness: &Harness, source: &dyn SnapshotSource) -> usize {
    for pass in 1..=4 {
        let report = harness.synchronizer.run(source).await.expect("sync pass");
        if report.is_noop() {
            return pass;
        }
    }
    panic!("sync did not settle");
}

#[tokio::test]
async fn fresh_snapshot_is_created_in_full() {
    let harness = Harness::new();
    let source = StaticSnapshot::new(lunch());

    let report = harness.synchronizer.run(&source).await.expect("sync");

    assert_eq!(report.menus.created, 1);
    assert_eq!(report.submenus.created, 2);
    assert_eq!(report.dishes.created, 3);
    assert_eq!(report.discounts_written, 1);
    assert_eq!(harness.repos.tables().tree(), without_discounts(lunch()));
    assert_eq!(
        harness.cache.get_discount(id(100)).await,
        Some(decimal("8.00"))
    );
}

#[tokio::test]
async fn second_pass_over_the_same_snapshot_is_a_noop() {
    let harness = Harness::new();
    let source = StaticSnapshot::new(lunch());
    harness.synchronizer.run(&source).await.expect("first pass");
    let commits = harness.repos.commits.load(Ordering::SeqCst);

    let report = harness.synchronizer.run(&source).await.expect("second pass");

    assert!(report.is_noop());
    assert_eq!(harness.repos.commits.load(Ordering::SeqCst), commits);
}

#[tokio::test]
async fn edits_deletions_and_title_swaps_converge() {
    let harness = Harness::new();
    let source = StaticSnapshot::new(lunch());
    harness.synchronizer.run(&source).await.expect("seed");

    let edited = vec![
        menu(
            1,
            "Lunch",
            vec![submenu(
                10,
                "Mains",
                vec![
                    dish(101, "Goulash", "7.50", None),
                    dish(100, "Pilaf", "11.00", Some("20")),
                ],
            )],
        ),
        menu(2, "Supper", vec![submenu(20, "Cold", vec![dish(200, "Aspic", "3.00", None)])]),
    ];
    source.replace(edited.clone());

    let passes = run_until_settled(&harness, &source).await;

    assert!(passes >= 2);
    assert_eq!(harness.repos.tables().tree(), without_discounts(edited));
    assert_eq!(
        harness.cache.get_discount(id(100)).await,
        Some(decimal("8.80"))
    );
}

#[tokio::test]
async fn dishes_missing_from_the_snapshot_are_removed() {
    let harness = Harness::new();
    let source = StaticSnapshot::new(lunch());
    harness.synchronizer.run(&source).await.expect("seed");
    harness
        .dishes
        .get_list(id(1), id(11))
        .await
        .expect("warm dish list");

    let mut trimmed = lunch();
    trimmed[0].submenus[1].dishes.clear();
    source.replace(trimmed);
    let report = harness.synchronizer.run(&source).await.expect("sync");

    assert_eq!(report.dishes.deleted, 1);
    assert!(harness.repos.tables().dishes.iter().all(|d| d.id != id(110)));
    let list_key = CacheKey::dish_list(id(1), id(11)).render();
    assert!(report.invalidated_keys.contains(&list_key));
    assert!(!harness.store.contains(&list_key));
}

#[tokio::test]
async fn orphaned_menus_are_deleted_with_their_cached_views() {
    let harness = Harness::new();
    let mut both = lunch();
    both.push(menu(2, "Supper", vec![submenu(20, "Cold", vec![])]));
    let source = StaticSnapshot::new(both);
    harness.synchronizer.run(&source).await.expect("seed");
    harness.submenus.get_detail(id(2), id(20)).await.expect("warm");
    harness.menus.get_detail(id(1)).await.expect("warm");

    source.replace(lunch());
    let report = harness.synchronizer.run(&source).await.expect("sync");

    assert_eq!(report.menus.deleted, 1);
    assert!(!harness.store.contains(&CacheKey::submenu(id(2), id(20)).render()));
    assert!(harness.store.contains(&CacheKey::menu(id(1)).render()));
    assert_eq!(harness.repos.tables().menus.len(), 1);
}

#[tokio::test]
async fn new_discount_reprices_and_reorders_warm_lists() {
    let harness = Harness::new();
    let source = StaticSnapshot::new(without_discounts(lunch()));
    harness.synchronizer.run(&source).await.expect("seed");

    let warm = harness.dishes.get_list(id(1), id(10)).await.expect("warm list");
    let ids: Vec<_> = warm.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![id(100), id(101)]);
    harness
        .dishes
        .get_detail(id(1), id(10), id(100))
        .await
        .expect("warm detail");

    source.replace(lunch());
    let report = harness.synchronizer.run(&source).await.expect("discount pass");
    assert_eq!(report.discounts_written, 1);

    let list = harness.dishes.get_list(id(1), id(10)).await.expect("list");
    let listed: Vec<_> = list.iter().map(|d| (d.id, d.price.to_string())).collect();
    assert_eq!(
        listed,
        vec![(id(101), "7.50".to_string()), (id(100), "8.00".to_string())]
    );
    let detail = harness
        .dishes
        .get_detail(id(1), id(10), id(100))
        .await
        .expect("detail");
    assert_eq!(detail.price, decimal("8.00"));
}

#[tokio::test]
async fn dropped_discount_removes_the_overlay() {
    let harness = Harness::new();
    let source = StaticSnapshot::new(lunch());
    harness.synchronizer.run(&source).await.expect("seed");
    assert!(harness.cache.get_discount(id(100)).await.is_some());

    source.replace(without_discounts(lunch()));
    let report = harness.synchronizer.run(&source).await.expect("sync");

    assert!(!report.is_noop());
    assert_eq!(harness.cache.get_discount(id(100)).await, None);
    let list = harness.dishes.get_list(id(1), id(10)).await.expect("list");
    let goulash = list.iter().find(|d| d.id == id(100)).expect("goulash");
    assert_eq!(goulash.price, decimal("10.00"));
}

#[tokio::test]
async fn failed_pass_leaves_both_stores_untouched() {
    let harness = Harness::new();
    let source = StaticSnapshot::new(lunch());
    harness.synchronizer.run(&source).await.expect("seed");
    harness.menus.get_list().await.expect("warm list");
    let before = harness.repos.tables().tree();

    let mut edited = lunch();
    edited[0].title = "Late lunch".to_string();
    edited[0].submenus[0].dishes[1].discount = Some(decimal("50"));
    source.replace(edited);
    harness.repos.fail_at("update");

    let err = harness.synchronizer.run(&source).await.expect_err("injected");

    assert!(matches!(err, SyncError::Apply { stage: "update", .. }));
    assert_eq!(harness.repos.tables().tree(), before);
    assert!(harness.store.contains(&CacheKey::MenuList.render()));
    assert_eq!(harness.cache.get_discount(id(101)).await, None);

    let report = harness.synchronizer.run(&source).await.expect("retry");
    assert_eq!(report.menus.updated, 1);
    assert_eq!(
        harness.cache.get_discount(id(101)).await,
        Some(decimal("3.75"))
    );
}

#[tokio::test]
async fn unreadable_snapshot_aborts_before_touching_storage() {
    let harness = Harness::new();
    let source = StaticSnapshot::new(lunch());
    source.broken.store(true, Ordering::SeqCst);
    harness
        .store
        .set("list_of_menus", b"[]".to_vec(), Duration::from_secs(60))
        .await
        .expect("seed cache");

    let err = harness.synchronizer.run(&source).await.expect_err("broken sheet");

    assert!(matches!(err, SyncError::Snapshot(_)));
    assert!(harness.repos.tables().menus.is_empty());
    assert!(harness.store.contains("list_of_menus"));
}
