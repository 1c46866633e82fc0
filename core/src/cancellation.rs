//! Cooperative cancellation for in-flight publish calls.
//!
//! The chain itself never polls the token; filters and transports that
//! perform slow or asynchronous work are expected to check it and abort
//! early with [`PublishError::Cancelled`](crate::publisher::PublishError).
//!
//! # Example
//!
//! ```
//! use eventline_core::cancellation::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let handle = token.clone();
//!
//! assert!(!token.is_cancelled());
//! handle.cancel();
//! assert!(token.is_cancelled());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// A clonable cancellation flag shared between a caller and the links of a
/// publish chain.
///
/// Cancellation is one-way and permanent: once [`cancel`](Self::cancel) has
/// been called, every clone observes the token as cancelled forever.
///
/// The `Default` token is simply one that nobody holds a cancelling handle
/// to, matching the "no cancellation requested" case.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    /// Create a new, not-yet-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    ///
    /// Wakes every task currently waiting in [`cancelled`](Self::cancelled).
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancellation is requested.
    ///
    /// Completes immediately if the token is already cancelled. Intended for
    /// use in `tokio::select!` against a slow delivery future.
    pub async fn cancelled(&self) {
        let mut notified = std::pin::pin!(self.inner.notify.notified());
        // Register interest before re-checking the flag so a concurrent
        // cancel() cannot slip between the check and the await.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}
