//! Wall-clock timestamps in milliseconds since the Unix epoch.
//!
//! Drafts carry `createdAt`/`updatedAt` in this unit and conflict resolution
//! compares them directly, so the only guarantee needed beyond wall time is
//! that a save never moves `updatedAt` backwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millis(u64);

impl Millis {
    /// Current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self(millis)
    }

    /// Creates a timestamp from a raw millisecond count.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the raw millisecond count.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Whole seconds, as used by event `created_at`.
    #[must_use]
    pub const fn as_unix_seconds(&self) -> u64 {
        self.0 / 1000
    }

    /// Returns a timestamp for a save that follows `previous`.
    ///
    /// Normally this is the current time; if the clock has not advanced past
    /// `previous` (same millisecond, or the clock stepped back) the result is
    /// `previous + 1` so the new save still wins last-writer-wins.
    #[must_use]
    pub fn tick_after(previous: Self) -> Self {
        let now = Self::now();
        if now > previous {
            now
        } else {
            Self(previous.0.saturating_add(1))
        }
    }

    /// Milliseconds elapsed between `earlier` and `self` (zero if `earlier` is later).
    #[must_use]
    pub const fn saturating_since(&self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl From<u64> for Millis {
    fn from(millis: u64) -> Self {
        Self(millis)
    }
}
