//! Request superseding by sequence number.
//!
//! Every fetch is tagged with a monotonically increasing [`RequestSeq`]. A
//! result whose tag is no longer the latest issued is stale and must be
//! dropped by the caller; in-flight work is never aborted.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic request tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestSeq(u64);

impl RequestSeq {
    /// Raw sequence value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value tagged with the sequence number of the request that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Sequenced<T> {
    /// Tag of the originating request.
    pub seq: RequestSeq,
    /// Result of the request.
    pub value: T,
}

impl<T> Sequenced<T> {
    /// Tag `value` with `seq`.
    pub fn new(seq: RequestSeq, value: T) -> Self {
        Self { seq, value }
    }
}

/// Issues request tags and answers "is this still the latest?".
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    /// Create a sequencer; the first issued tag is `#1`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next tag. It supersedes every earlier tag.
    pub fn issue(&self) -> RequestSeq {
        RequestSeq(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Most recently issued tag, if any.
    pub fn latest(&self) -> Option<RequestSeq> {
        match self.latest.load(Ordering::Acquire) {
            0 => None,
            value => Some(RequestSeq(value)),
        }
    }

    /// Returns `true` when `seq` is the most recently issued tag.
    pub fn is_latest(&self, seq: RequestSeq) -> bool {
        self.latest.load(Ordering::Acquire) == seq.0
    }
}
