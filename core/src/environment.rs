//! Dependency seams for filters that need the outside world.
//!
//! Time and identifier generation are abstracted behind traits and injected
//! into the filters that use them, so the same chain is deterministic under
//! test and live in production.
//!
//! Production implementations live in `eventline-runtime`
//! (`SystemClock`, `RandomIdGenerator`); deterministic ones in
//! `eventline-testing` (`FixedClock`, `SequentialIdGenerator`).

use chrono::{DateTime, Utc};

/// Abstracts time for testability.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Abstracts identifier generation for testability.
///
/// Used by the correlation filter to mint per-publish correlation ids.
pub trait IdGenerator: Send + Sync {
    /// Produce the next identifier.
    fn next_id(&self) -> String;
}
