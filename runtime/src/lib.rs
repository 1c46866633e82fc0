//! # Eventline Runtime
//!
//! Resilience and observability filters for the Eventline publish chain,
//! plus production implementations of the core environment seams.
//!
//! The core chain deliberately performs no retry, suppression, or
//! measurement of its own; those concerns are expressed as ordinary filters
//! composed into the chain like any other:
//!
//! - [`retry::RetryFilter`] — bounded retry with exponential backoff for
//!   transient delivery faults
//! - [`circuit_breaker::CircuitBreakerFilter`] — fail fast while the
//!   transport is unhealthy
//! - [`trace::TraceFilter`] — structured logs per traversal
//! - [`metrics::MetricsFilter`] — Prometheus counters and latency histogram
//!
//! ## Example
//!
//! ```ignore
//! use eventline_core::publisher::IntegrationEventPublisher;
//! use eventline_runtime::{metrics::MetricsFilter, retry::{RetryFilter, RetryPolicy}, trace::TraceFilter};
//!
//! let publisher = IntegrationEventPublisher::builder()
//!     .filter(TraceFilter::new())
//!     .filter(MetricsFilter::new())
//!     .filter(RetryFilter::new(RetryPolicy::default()))
//!     .transport(transport)
//!     .build()?;
//! ```

/// Retry with exponential backoff, as a publish filter
pub mod retry;

/// Circuit breaker for shielding an unhealthy transport
pub mod circuit_breaker;

/// Structured logging around publish traversals
pub mod trace;

/// Prometheus metrics for the publish chain
pub mod metrics;

/// Production Clock and IdGenerator implementations
pub mod environment;

pub use circuit_breaker::{BreakerConfig, BreakerState, CircuitBreakerFilter};
pub use environment::{RandomIdGenerator, SystemClock};
pub use metrics::{MetricsFilter, MetricsServer};
pub use retry::{RetryFilter, RetryPolicy};
pub use trace::TraceFilter;
