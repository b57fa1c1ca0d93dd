use std::io;

use thiserror::Error;

use crate::types::{DownloadToken, SourceId};

/// Error type for source, configuration, export, and IO failures.
///
/// Query-level problems (malformed fragments, unknown operators, type
/// mismatches, missing fields) never surface here; they recover locally.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("record source '{source_id}' is unavailable: {reason}")]
    SourceUnavailable { source_id: SourceId, reason: String },
    #[error("record source '{source_id}' answered with status {status}")]
    UpstreamStatus { source_id: SourceId, status: u16 },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("export failed: {0}")]
    Export(String),
    #[error("download '{token}' could not be scheduled: {reason}")]
    DownloadScheduling {
        token: DownloadToken,
        reason: String,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GridError {
    /// Returns `true` when the failure came from the record source rather
    /// than from local configuration or IO.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::UpstreamStatus { .. }
        )
    }
}
