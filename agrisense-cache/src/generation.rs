//! Generations order every change applied to the cache.
//!
//! A generation is a monotonically increasing stamp handed out by the cache.
//! Fetches record one when they start and mutations record one before their
//! request leaves; comparing stamps at settle time decides whether a late
//! result is still allowed to land.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    /// The generation before anything happened.
    pub const ZERO: Generation = Generation(0);

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Check if this generation was issued after another.
    pub fn is_newer_than(&self, other: &Generation) -> bool {
        self.0 > other.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Source of fresh generations. Never hands out the same value twice.
#[derive(Debug, Default)]
pub(crate) struct GenerationSource {
    counter: AtomicU64,
}

impl GenerationSource {
    pub(crate) fn next(&self) -> Generation {
        Generation(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
