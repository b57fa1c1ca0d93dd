use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::DownloadToken;

/// Readiness of an export job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum JobState {
    /// Still rendering.
    Pending,
    /// Rendered; `url` holds the artifact.
    Ready {
        /// Artifact URL.
        url: String,
    },
    /// Rendering failed.
    Failed {
        /// Human readable failure reason.
        reason: String,
    },
}

impl JobState {
    /// Returns `true` for `Ready` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One export job keyed by token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadJob {
    /// Job key.
    pub token: DownloadToken,
    /// Current readiness.
    #[serde(flatten)]
    pub state: JobState,
    /// Issue time, used for TTL eviction.
    pub created_at: DateTime<Utc>,
}

impl DownloadJob {
    /// A pending job created now.
    pub fn pending(token: impl Into<DownloadToken>) -> Self {
        Self {
            token: token.into(),
            state: JobState::Pending,
            created_at: Utc::now(),
        }
    }

    /// Returns `true` when the job is older than `ttl` at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(self.created_at) > ttl
    }
}

/// Injectable storage for export jobs.
///
/// Implementations must allow concurrent reads for many tokens. The only
/// writer of a token's state after `put` is that token's completion task,
/// through `update`.
pub trait JobStore: Send + Sync {
    /// Insert or replace a job.
    fn put(&self, job: DownloadJob);
    /// Cloned job for `token`.
    fn get(&self, token: &str) -> Option<DownloadJob>;
    /// Replace the state of an existing job. Returns `false` when the token is
    /// unknown (deleted or evicted), in which case nothing is stored.
    fn update(&self, token: &str, state: JobState) -> bool;
    /// Remove and return a job.
    fn delete(&self, token: &str) -> Option<DownloadJob>;
    /// Cloned job for `token`, removed in the same step when its state is
    /// terminal. Concurrent claims of a terminal job return it to exactly one
    /// caller.
    fn claim(&self, token: &str) -> Option<DownloadJob>;
    /// Drop jobs older than `ttl` at `now`; returns how many were removed.
    fn evict_expired(&self, now: DateTime<Utc>, ttl: Duration) -> usize;
    /// Number of stored jobs.
    fn len(&self) -> usize;
    /// Returns `true` when no jobs are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local job store behind a read-write lock.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<IndexMap<DownloadToken, DownloadJob>>,
}

impl InMemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InMemoryJobStore {
    fn put(&self, job: DownloadJob) {
        let mut jobs = self.jobs.write().expect("download job store poisoned");
        jobs.insert(job.token.clone(), job);
    }

    fn get(&self, token: &str) -> Option<DownloadJob> {
        let jobs = self.jobs.read().expect("download job store poisoned");
        jobs.get(token).cloned()
    }

    fn update(&self, token: &str, state: JobState) -> bool {
        let mut jobs = self.jobs.write().expect("download job store poisoned");
        match jobs.get_mut(token) {
            Some(job) => {
                job.state = state;
                true
            }
            None => false,
        }
    }

    fn delete(&self, token: &str) -> Option<DownloadJob> {
        let mut jobs = self.jobs.write().expect("download job store poisoned");
        jobs.shift_remove(token)
    }

    fn claim(&self, token: &str) -> Option<DownloadJob> {
        let mut jobs = self.jobs.write().expect("download job store poisoned");
        if jobs.get(token)?.state.is_terminal() {
            jobs.shift_remove(token)
        } else {
            jobs.get(token).cloned()
        }
    }

    fn evict_expired(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let mut jobs = self.jobs.write().expect("download job store poisoned");
        let before = jobs.len();
        jobs.retain(|_, job| !job.is_expired(now, ttl));
        before - jobs.len()
    }

    fn len(&self) -> usize {
        let jobs = self.jobs.read().expect("download job store poisoned");
        jobs.len()
    }
}
