//! FIFO correlation of in-flight requests.
//!
//! The encoder pushes one entry per request written to the connection and
//! the decoder pops one per response header. Responses come back in send
//! order, so the queue never reorders; popping from an empty queue means the
//! server answered something that was never asked.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use viewwire_protocol::RequestKind;

use crate::error::{CodecError, ViolationKind};

/// A request waiting for its response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEntry {
    /// Sequence number assigned at push time, for log correlation.
    pub id: u64,
    /// Decode path the response must take.
    pub kind: RequestKind,
}

/// Thread-safe FIFO of [`PendingEntry`] values.
///
/// Pushes may come from any number of caller tasks; pops come from the single
/// task decoding the connection.
#[derive(Debug, Default)]
pub struct PendingRequestQueue {
    entries: Mutex<VecDeque<PendingEntry>>,
    next_id: AtomicU64,
}

impl PendingRequestQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request that has been (or is about to be) written.
    pub fn push(&self, kind: RequestKind) -> PendingEntry {
        let mut entries = self.entries.lock();
        // Assigned under the lock so ids increase in queue order.
        let entry = PendingEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            kind,
        };
        entries.push_back(entry);
        tracing::trace!(id = entry.id, kind = %kind, depth = entries.len(), "request queued");
        entry
    }

    /// Take the oldest outstanding request.
    ///
    /// # Errors
    ///
    /// Returns [`ViolationKind::UnmatchedResponse`] if nothing is outstanding.
    pub fn pop(&self) -> Result<PendingEntry, CodecError> {
        let mut entries = self.entries.lock();
        match entries.pop_front() {
            Some(entry) => {
                tracing::trace!(id = entry.id, kind = %entry.kind, depth = entries.len(), "request dequeued");
                Ok(entry)
            }
            None => Err(CodecError::violation(ViolationKind::UnmatchedResponse)),
        }
    }

    /// Peek at the oldest outstanding request without removing it.
    #[must_use]
    pub fn front(&self) -> Option<PendingEntry> {
        self.entries.lock().front().copied()
    }

    /// Number of outstanding requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if no request is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove and return every outstanding request, oldest first.
    ///
    /// Used when the connection is torn down and no further headers will
    /// arrive.
    pub fn drain(&self) -> Vec<PendingEntry> {
        self.entries.lock().drain(..).collect()
    }
}
