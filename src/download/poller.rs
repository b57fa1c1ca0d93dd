use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::{DownloadService, DownloadStatus};
use crate::config::PollPolicy;
use crate::constants::download::POLL_SLEEP_SLICE_MS;
use crate::types::DownloadToken;

/// How a polling loop ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The artifact is ready.
    Ready {
        /// Artifact URL.
        url: String,
    },
    /// The token is unknown (never issued, already retrieved or expired).
    NotFound,
    /// Rendering failed.
    Failed {
        /// Failure reason.
        reason: String,
    },
    /// Attempt or wall-clock budget exhausted while still pending.
    TimedOut {
        /// Checks performed.
        attempts: usize,
    },
    /// Stopped by the caller.
    Cancelled,
}

/// Background status checks for one token at a fixed interval.
///
/// Stops at a terminal status, after `max_attempts` checks, at the optional
/// deadline, or on [`cancel`](Self::cancel). Dropping the poller cancels it and
/// joins the worker.
pub struct DownloadPoller {
    token: DownloadToken,
    receiver: Option<mpsc::Receiver<PollOutcome>>,
    handle: Option<thread::JoinHandle<()>>,
    cancelled: Arc<AtomicBool>,
    attempts: Arc<AtomicUsize>,
    outcome: Option<PollOutcome>,
}

impl DownloadPoller {
    pub(crate) fn spawn(service: Arc<DownloadService>, token: DownloadToken, policy: PollPolicy) -> Self {
        let (sender, receiver) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let attempts = Arc::new(AtomicUsize::new(0));
        let cancelled_thread = Arc::clone(&cancelled);
        let attempts_thread = Arc::clone(&attempts);
        let worker_token = token.clone();
        let handle = thread::spawn(move || {
            let outcome = run_poll_loop(
                &service,
                &worker_token,
                &policy,
                &cancelled_thread,
                &attempts_thread,
            );
            debug!(token = %worker_token, ?outcome, "download polling finished");
            let _ = sender.send(outcome);
        });
        Self {
            token,
            receiver: Some(receiver),
            handle: Some(handle),
            cancelled,
            attempts,
            outcome: None,
        }
    }

    /// Token being polled.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Status checks performed so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Ask the worker to stop; `wait` then yields `Cancelled` unless the loop
    /// already finished.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Outcome if the loop already finished, without blocking.
    pub fn try_outcome(&mut self) -> Option<PollOutcome> {
        if self.outcome.is_none() {
            let received = self
                .receiver
                .as_ref()
                .and_then(|receiver| receiver.try_recv().ok());
            self.outcome = received;
        }
        self.outcome.clone()
    }

    /// Block until the loop finishes.
    pub fn wait(&mut self) -> PollOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }
        let outcome = self
            .receiver
            .as_ref()
            .and_then(|receiver| receiver.recv().ok())
            .unwrap_or(PollOutcome::Cancelled);
        self.outcome = Some(outcome.clone());
        outcome
    }
}

impl Drop for DownloadPoller {
    fn drop(&mut self) {
        self.cancel();
        self.receiver.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_poll_loop(
    service: &DownloadService,
    token: &str,
    policy: &PollPolicy,
    cancelled: &AtomicBool,
    attempts: &AtomicUsize,
) -> PollOutcome {
    let started = Instant::now();
    loop {
        if cancelled.load(Ordering::Relaxed) {
            return PollOutcome::Cancelled;
        }
        let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
        match service.check_status(token) {
            DownloadStatus::Ready { url } => return PollOutcome::Ready { url },
            DownloadStatus::NotFound => return PollOutcome::NotFound,
            DownloadStatus::Failed { reason } => return PollOutcome::Failed { reason },
            DownloadStatus::Pending => {}
        }
        if attempt >= policy.max_attempts || deadline_passed(started, policy.deadline) {
            return PollOutcome::TimedOut { attempts: attempt };
        }
        if !sleep_unless_cancelled(policy.interval, started, policy.deadline, cancelled) {
            return PollOutcome::Cancelled;
        }
        if deadline_passed(started, policy.deadline) {
            return PollOutcome::TimedOut { attempts: attempt };
        }
    }
}

fn deadline_passed(started: Instant, deadline: Option<Duration>) -> bool {
    deadline.is_some_and(|deadline| started.elapsed() >= deadline)
}

/// Sleep `interval` in short slices. Returns `false` when cancelled.
fn sleep_unless_cancelled(
    interval: Duration,
    started: Instant,
    deadline: Option<Duration>,
    cancelled: &AtomicBool,
) -> bool {
    let slice = Duration::from_millis(POLL_SLEEP_SLICE_MS);
    let wake_at = Instant::now() + interval;
    loop {
        if cancelled.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= wake_at || deadline_passed(started, deadline) {
            return true;
        }
        thread::sleep(slice.min(wake_at - now));
    }
}
