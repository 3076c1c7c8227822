//! Snapshot sources backed by spreadsheets.

mod google;
mod xlsx;

use std::sync::Arc;

pub use google::GoogleSheetSource;
pub use xlsx::XlsxFileSource;

use crate::application::snapshot::SnapshotSource;
use crate::config::SyncSource;

use super::error::InfraError;

/// Build the source named by configuration.
pub fn from_settings(source: &SyncSource) -> Result<Arc<dyn SnapshotSource>, InfraError> {
    match source {
        SyncSource::File { path } => Ok(Arc::new(XlsxFileSource::new(path.clone()))),
        SyncSource::Google {
            spreadsheet_id,
            range,
            api_key,
            endpoint,
        } => Ok(Arc::new(GoogleSheetSource::new(
            endpoint,
            spreadsheet_id,
            range,
            api_key.clone(),
        )?)),
    }
}
