//! Cron-driven reconciliation worker.

use std::str::FromStr;
use std::sync::Arc;

use apalis::prelude::{Data, Error as ApalisError};
use apalis_cron::Schedule;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::application::snapshot::SnapshotSource;
use crate::application::sync::Synchronizer;

const SOURCE: &str = "application::jobs::sync";

/// Tick emitted by the cron backend.
/// Must implement `From<chrono::DateTime<chrono::Utc>>` for apalis-cron compatibility.
#[derive(Default, Debug, Clone)]
pub struct SyncJob;

impl From<chrono::DateTime<chrono::Utc>> for SyncJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

#[derive(Clone)]
pub struct SyncJobContext {
    pub synchronizer: Arc<Synchronizer>,
    pub source: Arc<dyn SnapshotSource>,
    running: Arc<Mutex<()>>,
}

impl SyncJobContext {
    pub fn new(synchronizer: Arc<Synchronizer>, source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            synchronizer,
            source,
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Resolves once no pass is in flight.
    pub async fn wait_idle(&self) {
        let _guard = self.running.lock().await;
    }
}

/// Run one pass unless the previous one is still in flight.
///
/// Failures are logged and swallowed; the next tick retries from scratch.
pub async fn process_sync_job(_job: SyncJob, ctx: Data<SyncJobContext>) -> Result<(), ApalisError> {
    let Ok(_guard) = ctx.running.try_lock() else {
        info!(target = SOURCE, "previous sync pass still running, skipping tick");
        return Ok(());
    };

    if let Err(err) = ctx.synchronizer.run(ctx.source.as_ref()).await {
        warn!(target = SOURCE, error = %err, "scheduled sync pass failed");
    }
    Ok(())
}

pub fn sync_schedule(expression: &str) -> Result<Schedule, String> {
    Schedule::from_str(expression).map_err(|err| err.to_string())
}
