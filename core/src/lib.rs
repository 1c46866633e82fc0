//! # Eventline Core
//!
//! Core traits and the filter-chain publisher for integration events.
//!
//! This crate provides the mechanism at the center of Eventline: an ordered,
//! short-circuiting chain of interceptors around a terminal delivery action.
//!
//! ## Core Concepts
//!
//! - **Event**: a serializable fact crossing a service boundary
//!   ([`IntegrationEvent`], erased into an [`EventEnvelope`] per call)
//! - **Context**: the per-call bundle of envelope + mutable headers +
//!   cancellation token ([`PublishContext`])
//! - **Filter**: an interceptor that may mutate headers and decides whether
//!   to forward ([`PublishFilter`])
//! - **Transport**: the terminal action that actually delivers
//!   ([`PublishTransport`])
//! - **Publisher**: the composed chain with one typed entry point
//!   ([`IntegrationEventPublisher`])
//!
//! ## Chain Model
//!
//! The chain is composed once, at construction, by folding the filter
//! sequence in reverse over the terminal transport. At invocation time the
//! filters therefore run in declaration order, each one free to observe and
//! rewrite the headers before forwarding, and the transport runs last — at
//! most once per call, and only if every filter forwarded.
//!
//! ```text
//! builder order:   [f1, f2, f3] + transport
//! composed as:     f1( f2( f3( transport ) ) )
//! runs as:         f1 → f2 → f3 → transport
//! ```
//!
//! A filter that does not forward ends the traversal with its own result
//! (a *short-circuit*, which is not an error). Any fault raised by a link
//! propagates to the caller unwrapped.
//!
//! ## Concurrency
//!
//! The composed chain holds no mutable state between calls. Overlapping
//! `publish` calls each get a fresh context and cannot observe each other's
//! header mutations; filters and transports must merely be safe to call
//! concurrently.

pub mod cancellation;
pub mod context;
pub mod environment;
pub mod event;
pub mod filter;
pub mod filters;
pub mod publisher;
pub mod transport;

pub use cancellation::CancellationToken;
pub use context::{Headers, PublishContext};
pub use environment::{Clock, IdGenerator};
pub use event::{EventEnvelope, EventError, IntegrationEvent};
pub use filter::{Next, PublishFilter, PublishFuture};
pub use filters::{CorrelationFilter, HeaderFilter};
pub use publisher::{
    IntegrationEventPublisher, PublishError, PublishOutcome, PublishResult, PublisherBuilder,
};
pub use transport::PublishTransport;
