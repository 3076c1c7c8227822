//! Reconciliation of the stored tree against a spreadsheet snapshot.
//!
//! A pass applies creates, then deletes, then updates inside one database
//! transaction. Discount overlays are written and cache keys invalidated only
//! after the commit succeeds; a failed pass leaves both stores untouched.

mod flatten;
mod plan;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::application::repos::{RepoError, SyncRepo, SyncUnit};
use crate::application::snapshot::{SnapshotError, SnapshotSource};
use crate::cache::CacheService;

pub use flatten::{FlatDish, FlatTree, Flattened, flatten};
pub use plan::{Deletions, SyncPlan};

const SOURCE: &str = "application::sync";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("sync {stage} failed: {source}")]
    Apply {
        stage: &'static str,
        #[source]
        source: RepoError,
    },
}

impl SyncError {
    fn at(stage: &'static str) -> impl FnOnce(RepoError) -> Self {
        move |source| Self::Apply { stage, source }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub menus: EntityCounts,
    pub submenus: EntityCounts,
    pub dishes: EntityCounts,
    pub discounts_written: usize,
    pub invalidated_keys: BTreeSet<String>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

pub struct Synchronizer {
    repo: Arc<dyn SyncRepo>,
    cache: CacheService,
}

impl Synchronizer {
    pub fn new(repo: Arc<dyn SyncRepo>, cache: CacheService) -> Self {
        Self { repo, cache }
    }

    /// Run one pass against `source`.
    pub async fn run(&self, source: &dyn SnapshotSource) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let result = self.reconcile(source).await;

        let outcome = match &result {
            Ok(report) if report.is_noop() => "noop",
            Ok(_) => "applied",
            Err(_) => "failed",
        };
        counter!("menusync_sync_runs_total", "outcome" => outcome).increment(1);
        histogram!("menusync_sync_duration_ms").record(started.elapsed().as_secs_f64() * 1000.0);

        match &result {
            Ok(report) if report.is_noop() => {
                debug!(target = SOURCE, source = %source.describe(), "snapshot matches storage");
            }
            Ok(report) => info!(
                target = SOURCE,
                source = %source.describe(),
                menus = ?report.menus,
                submenus = ?report.submenus,
                dishes = ?report.dishes,
                discounts = report.discounts_written,
                invalidated = report.invalidated_keys.len(),
                "sync pass applied"
            ),
            Err(err) => error!(
                target = SOURCE,
                source = %source.describe(),
                error = %err,
                "sync pass failed"
            ),
        }

        result
    }

    async fn reconcile(&self, source: &dyn SnapshotSource) -> Result<SyncReport, SyncError> {
        let snapshot = flatten(&source.load().await?);

        let mut unit = self.repo.begin().await.map_err(SyncError::at("begin"))?;
        let stored = unit.load_tree().await.map_err(SyncError::at("load"))?;
        let cached_discounts = self.cache.get_all_discounts().await;

        let plan = SyncPlan::build(&flatten(&stored).tree, &snapshot, &cached_discounts);
        if plan.is_noop() {
            return Ok(SyncReport::default());
        }

        if plan.has_db_writes() {
            apply(unit.as_mut(), &plan).await?;
        }
        unit.commit().await.map_err(SyncError::at("commit"))?;

        for (dish_id, price) in &plan.discount_writes {
            self.cache.set_discount(*dish_id, *price).await;
        }
        let invalidated_keys = self.cache.invalidate(&plan.invalidation).await;

        Ok(report_of(&plan, invalidated_keys))
    }
}

async fn apply(unit: &mut dyn SyncUnit, plan: &SyncPlan) -> Result<(), SyncError> {
    for menu in &plan.create_menus {
        unit.insert_menu(menu).await.map_err(SyncError::at("create"))?;
    }
    for submenu in &plan.create_submenus {
        unit.insert_submenu(submenu)
            .await
            .map_err(SyncError::at("create"))?;
    }
    for dish in &plan.create_dishes {
        unit.insert_dish(dish).await.map_err(SyncError::at("create"))?;
    }

    match &plan.deletions {
        Deletions::None => Ok(()),
        Deletions::Menus(ids) => unit.delete_menus(ids).await,
        Deletions::Submenus(ids) => unit.delete_submenus(ids).await,
        Deletions::Dishes(ids) => unit.delete_dishes(ids).await,
    }
    .map_err(SyncError::at("delete"))?;

    for menu in &plan.update_menus {
        unit.update_menu(menu).await.map_err(SyncError::at("update"))?;
    }
    for submenu in &plan.update_submenus {
        unit.update_submenu(submenu)
            .await
            .map_err(SyncError::at("update"))?;
    }
    for dish in &plan.update_dishes {
        unit.update_dish(dish).await.map_err(SyncError::at("update"))?;
    }
    Ok(())
}

fn report_of(plan: &SyncPlan, invalidated_keys: BTreeSet<String>) -> SyncReport {
    let deleted = |level: fn(&Deletions) -> Option<usize>| level(&plan.deletions).unwrap_or(0);
    SyncReport {
        menus: EntityCounts {
            created: plan.create_menus.len(),
            updated: plan.update_menus.len(),
            deleted: deleted(|d| match d {
                Deletions::Menus(ids) => Some(ids.len()),
                _ => None,
            }),
        },
        submenus: EntityCounts {
            created: plan.create_submenus.len(),
            updated: plan.update_submenus.len(),
            deleted: deleted(|d| match d {
                Deletions::Submenus(ids) => Some(ids.len()),
                _ => None,
            }),
        },
        dishes: EntityCounts {
            created: plan.create_dishes.len(),
            updated: plan.update_dishes.len(),
            deleted: deleted(|d| match d {
                Deletions::Dishes(ids) => Some(ids.len()),
                _ => None,
            }),
        },
        discounts_written: plan.discount_writes.len(),
        invalidated_keys,
    }
}
