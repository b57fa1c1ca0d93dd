//! Asynchronous export workflow.
//!
//! Ownership model:
//! - `DownloadService` issues tokens and spawns one completion task per token.
//! - Jobs live in an injectable [`JobStore`]; the completion task is the only
//!   writer of its token's state after the job is created.
//! - [`DownloadPoller`] is the caller-side bounded, cancellable wait.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{DownloadConfig, PollPolicy};
use crate::constants::download::{TOKEN_ALPHABET, TOKEN_PREFIX, TOKEN_RANDOM_LEN};
use crate::constants::status;
use crate::errors::GridError;
use crate::types::DownloadToken;

mod export;
mod poller;
mod store;

pub use export::{csv_data_url, render_csv};
pub use poller::{DownloadPoller, PollOutcome};
pub use store::{DownloadJob, InMemoryJobStore, JobState, JobStore};

/// Answer to a token request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTicket {
    /// Always 200 for an issued token.
    pub status: u16,
    /// Token to poll with.
    pub token: DownloadToken,
}

/// Answer to a status check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum DownloadStatus {
    /// Still rendering (202).
    Pending,
    /// Artifact ready (200).
    Ready {
        /// Artifact URL.
        #[serde(rename = "fileURL")]
        url: String,
    },
    /// Token never issued, already retrieved, or expired (404).
    NotFound,
    /// Rendering failed (500).
    Failed {
        /// Failure reason.
        reason: String,
    },
}

impl DownloadStatus {
    /// HTTP-style status code of this answer.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Pending => status::ACCEPTED,
            Self::Ready { .. } => status::OK,
            Self::NotFound => status::NOT_FOUND,
            Self::Failed { .. } => status::INTERNAL_ERROR,
        }
    }

    /// Artifact URL when ready.
    pub fn file_url(&self) -> Option<&str> {
        match self {
            Self::Ready { url } => Some(url),
            _ => None,
        }
    }

    /// Returns `true` for answers that end a polling loop.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Token issuance and status checks over a job store.
pub struct DownloadService {
    store: Arc<dyn JobStore>,
    config: DownloadConfig,
}

impl DownloadService {
    /// Service backed by a fresh [`InMemoryJobStore`].
    pub fn new(config: DownloadConfig) -> Self {
        Self::with_store(config, Arc::new(InMemoryJobStore::new()))
    }

    /// Service backed by `store`.
    pub fn with_store(config: DownloadConfig, store: Arc<dyn JobStore>) -> Self {
        Self { store, config }
    }

    /// Export settings in use.
    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Job store in use.
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Issue a token and schedule its completion task.
    ///
    /// After a random delay within the configured bounds the task calls
    /// `render` for the CSV payload and marks the job ready with a `data:` URL,
    /// or failed when `render` errors. A job deleted or evicted meanwhile is
    /// not recreated.
    pub fn request_token<F>(&self, render: F) -> Result<DownloadTicket, GridError>
    where
        F: FnOnce() -> Result<String, GridError> + Send + 'static,
    {
        self.evict_expired();
        let token = self.fresh_token();
        self.store.put(DownloadJob::pending(token.clone()));

        let delay = self.ready_delay();
        let store = Arc::clone(&self.store);
        let worker_token = token.clone();
        let spawned = thread::Builder::new()
            .name(format!("download-{token}"))
            .spawn(move || {
                thread::sleep(delay);
                let state = match render() {
                    Ok(csv) => JobState::Ready {
                        url: csv_data_url(&csv),
                    },
                    Err(err) => {
                        warn!(token = %worker_token, error = %err, "export render failed");
                        JobState::Failed {
                            reason: err.to_string(),
                        }
                    }
                };
                if store.update(&worker_token, state) {
                    debug!(token = %worker_token, "download job completed");
                } else {
                    debug!(token = %worker_token, "download job gone before completion");
                }
            });
        if let Err(err) = spawned {
            self.store.delete(&token);
            return Err(GridError::DownloadScheduling {
                token,
                reason: err.to_string(),
            });
        }

        info!(
            token = %token,
            delay_ms = delay.as_millis() as u64,
            "issued download token"
        );
        Ok(DownloadTicket {
            status: status::OK,
            token,
        })
    }

    /// Idempotent status check.
    ///
    /// A `Ready` or `Failed` answer is delivered once, even to concurrent
    /// checkers; the job is removed as it is read and later checks answer
    /// `NotFound`.
    pub fn check_status(&self, token: &str) -> DownloadStatus {
        self.evict_expired();
        let Some(job) = self.store.claim(token) else {
            debug!(token, "unknown download token");
            return DownloadStatus::NotFound;
        };
        match job.state {
            JobState::Pending => DownloadStatus::Pending,
            JobState::Ready { url } => DownloadStatus::Ready { url },
            JobState::Failed { reason } => DownloadStatus::Failed { reason },
        }
    }

    /// Start a background poller for `token`.
    pub fn poll(self: &Arc<Self>, token: impl Into<DownloadToken>, policy: PollPolicy) -> DownloadPoller {
        DownloadPoller::spawn(Arc::clone(self), token.into(), policy)
    }

    fn evict_expired(&self) {
        let removed = self.store.evict_expired(Utc::now(), self.config.ttl);
        if removed > 0 {
            debug!(removed, "evicted expired download jobs");
        }
    }

    fn fresh_token(&self) -> DownloadToken {
        let mut rng = rand::rng();
        loop {
            let mut token = String::with_capacity(TOKEN_PREFIX.len() + TOKEN_RANDOM_LEN);
            token.push_str(TOKEN_PREFIX);
            for _ in 0..TOKEN_RANDOM_LEN {
                let idx = rng.random_range(0..TOKEN_ALPHABET.len());
                token.push(char::from(TOKEN_ALPHABET[idx]));
            }
            if self.store.get(&token).is_none() {
                return token;
            }
        }
    }

    fn ready_delay(&self) -> Duration {
        let min = self.config.ready_delay_min;
        let max = self.config.ready_delay_max;
        if max <= min {
            return min;
        }
        let min_ms = u64::try_from(min.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
    }
}
