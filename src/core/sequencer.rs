//! Arrival sequencing.
//!
//! Every request draws exactly one [`SequenceNumber`] when it is constructed.
//! The counter is private to [`ArrivalSequencer`]; callers only ever see the
//! values handed out by [`ArrivalSequencer::next`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Position of a request in global arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    /// The first number ever issued by a fresh sequencer.
    pub const FIRST: Self = Self(1);

    /// Wrap a raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The number immediately after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Hands out unique, increasing sequence numbers to concurrent callers.
#[derive(Debug)]
pub struct ArrivalSequencer {
    next: AtomicU64,
}

impl ArrivalSequencer {
    /// Create a sequencer whose first value is [`SequenceNumber::FIRST`].
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_at(SequenceNumber::FIRST)
    }

    /// Create a sequencer that starts at `first`.
    #[must_use]
    pub const fn starting_at(first: SequenceNumber) -> Self {
        Self {
            next: AtomicU64::new(first.0),
        }
    }

    /// Draw the next sequence number.
    ///
    /// Ties between racing callers are broken by whichever completes the
    /// atomic increment first.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> SequenceNumber {
        SequenceNumber(self.next.fetch_add(1, Ordering::AcqRel))
    }

    /// The value the next call to [`next`](Self::next) would return.
    #[must_use]
    pub fn peek(&self) -> SequenceNumber {
        SequenceNumber(self.next.load(Ordering::Acquire))
    }
}

impl Default for ArrivalSequencer {
    fn default() -> Self {
        Self::new()
    }
}
