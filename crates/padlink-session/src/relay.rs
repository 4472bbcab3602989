//! The bounded drop-oldest buffer between controllers and the game writer.
//!
//! Controller input is idempotent and time-valued: when the game falls
//! behind, the newest sample is worth more than a complete history. The
//! queue therefore never blocks a producer — on overflow it evicts the
//! oldest entry (one attempt, O(1)) and only drops the incoming payload if
//! even that fails.

use std::collections::VecDeque;

use bytes::Bytes;

/// What happened to a pushed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Push {
    /// Stored without evicting anything.
    Stored,
    /// The oldest queued payload was evicted to make room.
    DroppedOldest,
    /// The queue could not make room; the incoming payload was dropped.
    DroppedLatest,
    /// The queue is closed; the payload was discarded silently.
    Closed,
}

/// Bounded FIFO of relay payloads. Capacity is fixed at construction.
pub(crate) struct RelayQueue {
    buf: VecDeque<Bytes>,
    capacity: usize,
    closed: bool,
}

impl RelayQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
            closed: false,
        }
    }

    /// Pushes a payload using the drop-oldest discipline.
    pub(crate) fn push(&mut self, payload: Bytes) -> Push {
        if self.closed {
            return Push::Closed;
        }
        if self.buf.len() < self.capacity {
            self.buf.push_back(payload);
            return Push::Stored;
        }
        // Full: evict exactly one entry, then retry once.
        if self.buf.pop_front().is_some() && self.buf.len() < self.capacity {
            self.buf.push_back(payload);
            Push::DroppedOldest
        } else {
            Push::DroppedLatest
        }
    }

    /// Takes the oldest queued payload.
    pub(crate) fn pop(&mut self) -> Option<Bytes> {
        self.buf.pop_front()
    }

    /// Closes the queue: pending payloads are discarded and later pushes
    /// report [`Push::Closed`].
    pub(crate) fn close(&mut self) {
        self.closed = true;
        self.buf.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }
}

// =========================================================================
// Tests
// =========================================================================
