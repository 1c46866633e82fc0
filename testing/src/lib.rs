//! # Eventline Testing
//!
//! Test doubles and helpers for exercising publish chains without a broker:
//!
//! - Transports that record or fail deliveries on demand
//! - A filter that short-circuits chosen event types
//! - Deterministic [`Clock`] and [`IdGenerator`] implementations
//!
//! ## Example
//!
//! ```ignore
//! use eventline_core::publisher::IntegrationEventPublisher;
//! use eventline_testing::mocks::RecordingTransport;
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn my_chain_delivers() {
//!     let transport = Arc::new(RecordingTransport::new());
//!     let publisher = IntegrationEventPublisher::builder()
//!         .transport_arc(transport.clone())
//!         .build()?;
//!
//!     publisher.publish(&MyEvent).await?;
//!
//!     assert_eq!(transport.delivery_count(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use eventline_core::environment::{Clock, IdGenerator};

/// Mock transports, filters, and environment implementations.
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Utc};
    use eventline_core::context::{Headers, PublishContext};
    use eventline_core::event::EventEnvelope;
    use eventline_core::filter::{Next, PublishFilter, PublishFuture};
    use eventline_core::publisher::{PublishError, PublishOutcome};
    use eventline_core::transport::PublishTransport;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    /// One delivery captured by a [`RecordingTransport`]: the envelope plus
    /// a snapshot of the headers as the terminal saw them.
    #[derive(Debug, Clone)]
    pub struct DeliveredEvent {
        /// The envelope handed to the terminal.
        pub envelope: EventEnvelope,
        /// The cumulative headers at delivery time.
        pub headers: Headers,
    }

    /// A terminal transport that records every delivery.
    ///
    /// Observes the cancellation token like a real transport: a publish with
    /// an already-cancelled token fails with [`PublishError::Cancelled`]
    /// instead of being recorded.
    #[derive(Debug, Default)]
    pub struct RecordingTransport {
        deliveries: Mutex<Vec<DeliveredEvent>>,
    }

    impl RecordingTransport {
        /// Create an empty recording transport.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Snapshot of everything delivered so far.
        #[must_use]
        #[allow(clippy::expect_used)] // Panics: tests fail loudly on poisoned locks
        pub fn delivered(&self) -> Vec<DeliveredEvent> {
            self.deliveries
                .lock()
                .expect("recording lock poisoned")
                .clone()
        }

        /// Number of deliveries recorded so far.
        #[must_use]
        #[allow(clippy::expect_used)] // Panics: tests fail loudly on poisoned locks
        pub fn delivery_count(&self) -> usize {
            self.deliveries
                .lock()
                .expect("recording lock poisoned")
                .len()
        }
    }

    impl PublishTransport for RecordingTransport {
        #[allow(clippy::expect_used)] // Panics: tests fail loudly on poisoned locks
        fn deliver<'a>(&'a self, ctx: &'a mut PublishContext) -> PublishFuture<'a> {
            Box::pin(async move {
                if ctx.cancellation().is_cancelled() {
                    return Err(PublishError::Cancelled);
                }
                self.deliveries
                    .lock()
                    .expect("recording lock poisoned")
                    .push(DeliveredEvent {
                        envelope: ctx.envelope().clone(),
                        headers: ctx.headers().clone(),
                    });
                Ok(PublishOutcome::Delivered)
            })
        }
    }

    /// A terminal transport that fails deliveries on demand.
    #[derive(Debug)]
    pub struct FailingTransport {
        /// `None` means every attempt fails.
        fail_first: Option<usize>,
        attempts: AtomicUsize,
    }

    impl FailingTransport {
        /// Fail the first `n` attempts, then deliver.
        #[must_use]
        pub const fn failing_times(n: usize) -> Self {
            Self {
                fail_first: Some(n),
                attempts: AtomicUsize::new(0),
            }
        }

        /// Fail every attempt.
        #[must_use]
        pub const fn always_failing() -> Self {
            Self {
                fail_first: None,
                attempts: AtomicUsize::new(0),
            }
        }

        /// How many delivery attempts have been made.
        #[must_use]
        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl PublishTransport for FailingTransport {
        fn deliver<'a>(&'a self, ctx: &'a mut PublishContext) -> PublishFuture<'a> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail_first.is_none_or(|n| attempt < n);
            let destination = ctx.envelope().event_type.clone();

            Box::pin(async move {
                if fail {
                    Err(PublishError::DeliveryFailed {
                        destination,
                        reason: format!("simulated failure on attempt {attempt}"),
                    })
                } else {
                    Ok(PublishOutcome::Delivered)
                }
            })
        }
    }

    /// A filter that short-circuits publishes of one event type and
    /// forwards everything else.
    #[derive(Debug, Clone)]
    pub struct ShortCircuitFilter {
        event_type: String,
        reason: String,
    }

    impl ShortCircuitFilter {
        /// Short-circuit publishes whose envelope carries this event type.
        #[must_use]
        pub fn for_event_type(event_type: impl Into<String>, reason: impl Into<String>) -> Self {
            Self {
                event_type: event_type.into(),
                reason: reason.into(),
            }
        }
    }

    impl PublishFilter for ShortCircuitFilter {
        fn name(&self) -> &'static str {
            "short-circuit"
        }

        fn on_publish<'a>(&'a self, ctx: &'a mut PublishContext, next: Next) -> PublishFuture<'a> {
            if ctx.envelope().event_type == self.event_type {
                let reason = self.reason.clone();
                return Box::pin(async move {
                    Ok(PublishOutcome::short_circuited("short-circuit", reason))
                });
            }
            next.run(ctx)
        }
    }

    /// Fixed clock for deterministic tests.
    ///
    /// Always returns the same time, making header stamps reproducible.
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2026-01-01 00:00:00 UTC).
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Sequential identifiers (`id-1`, `id-2`, ...) for predictable
    /// correlation headers in tests.
    #[derive(Debug, Default)]
    pub struct SequentialIdGenerator {
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Create a generator starting at `id-1`.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> String {
            format!("id-{}", self.next.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }
}

/// Test helpers.
pub mod helpers {
    /// Initialize a fmt tracing subscriber honoring `RUST_LOG`.
    ///
    /// Safe to call from every test; only the first call installs.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

// Re-export commonly used items
pub use helpers::init_tracing;
pub use mocks::{
    DeliveredEvent, FailingTransport, FixedClock, RecordingTransport, SequentialIdGenerator,
    ShortCircuitFilter, test_clock,
};
