//! The filter-chain integration event publisher.
//!
//! The publisher owns a single composed chain: an ordered sequence of
//! [`PublishFilter`]s wrapped around one terminal [`PublishTransport`]. The
//! chain is assembled exactly once, at construction, by folding the filter
//! sequence in **reverse** over the terminal link — so at invocation time
//! filters run in the order they were declared, and the transport runs last,
//! at most once, only if every filter forwards.
//!
//! ```text
//! publish(event)
//!      │
//!      ▼
//! ┌───────────┐    ┌───────────┐    ┌─────────────┐
//! │ filter 1  │───▶│ filter 2  │───▶│  transport  │
//! │           │◀───│           │◀───│ (terminal)  │
//! └───────────┘    └───────────┘    └─────────────┘
//!   each link may mutate headers, short-circuit, or fail
//! ```
//!
//! Each call to [`IntegrationEventPublisher::publish`] starts a fresh
//! traversal with a fresh [`PublishContext`]; the chain holds no mutable
//! state between calls, so overlapping publishes are independent.
//!
//! # Example
//!
//! ```
//! use eventline_core::publisher::{IntegrationEventPublisher, PublishOutcome};
//! use eventline_core::filters::HeaderFilter;
//! # use eventline_core::context::PublishContext;
//! # use eventline_core::filter::PublishFuture;
//! # use eventline_core::transport::PublishTransport;
//! # use serde::{Serialize, Deserialize};
//! # struct NullTransport;
//! # impl PublishTransport for NullTransport {
//! #     fn deliver<'a>(&'a self, _ctx: &'a mut PublishContext) -> PublishFuture<'a> {
//! #         Box::pin(async { Ok(PublishOutcome::Delivered) })
//! #     }
//! # }
//! # #[derive(Serialize, Deserialize)]
//! # struct Ping;
//! # impl eventline_core::event::IntegrationEvent for Ping {
//! #     fn event_type(&self) -> &'static str { "Ping.v1" }
//! # }
//! # async fn example() -> Result<(), eventline_core::publisher::PublishError> {
//! let publisher = IntegrationEventPublisher::builder()
//!     .filter(HeaderFilter::new().set("x-source", Some("orders".to_string())))
//!     .transport(NullTransport)
//!     .build()?;
//!
//! let outcome = publisher.publish(&Ping).await?;
//! assert!(outcome.is_delivered());
//! # Ok(())
//! # }
//! ```

use crate::cancellation::CancellationToken;
use crate::context::PublishContext;
use crate::event::{EventEnvelope, IntegrationEvent};
use crate::filter::{Link, PublishFilter};
use crate::transport::PublishTransport;
use serde::Serialize;
use smallvec::SmallVec;
use std::sync::Arc;
use thiserror::Error;

/// How one publish traversal ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The terminal transport delivered the event.
    Delivered,

    /// A link deliberately ended the traversal before delivery. Not an
    /// error: the filter chose not to forward, and its result is returned
    /// to the caller verbatim.
    ShortCircuited {
        /// Name of the link that stopped the chain.
        filter: &'static str,
        /// Why the chain was stopped.
        reason: String,
    },
}

impl PublishOutcome {
    /// Convenience constructor for a short-circuit outcome.
    #[must_use]
    pub const fn short_circuited(filter: &'static str, reason: String) -> Self {
        Self::ShortCircuited { filter, reason }
    }

    /// Whether the event reached the terminal transport.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Errors that can end a publish traversal.
///
/// Faults propagate through the chain to the original caller unwrapped; the
/// chain performs no retry or suppression of its own. A filter wanting to
/// recover from a downstream fault catches the error from its forwarding
/// call and decides what to return instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The event was rejected before the chain ran.
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// The event could not be serialized into an envelope.
    #[error("Failed to encode event '{event_type}': {reason}")]
    EncodingFailed {
        /// The event type that failed to encode.
        event_type: String,
        /// The reason for the failure.
        reason: String,
    },

    /// The terminal transport failed to deliver the event.
    #[error("Delivery to '{destination}' failed: {reason}")]
    DeliveryFailed {
        /// Where delivery was attempted.
        destination: String,
        /// The reason for the failure.
        reason: String,
    },

    /// A filter refused the publish (e.g., an open circuit breaker).
    #[error("Publish rejected by '{filter}': {reason}")]
    Rejected {
        /// Name of the rejecting filter.
        filter: &'static str,
        /// The reason for the rejection.
        reason: String,
    },

    /// A link observed the cancellation token and aborted.
    #[error("Publish was cancelled")]
    Cancelled,

    /// The publisher was built with an incomplete configuration.
    #[error("Publisher misconfigured: {0}")]
    Misconfigured(String),
}

/// Result of one publish traversal.
pub type PublishResult = Result<PublishOutcome, PublishError>;

/// Publishes integration events through a fixed filter chain.
///
/// Cheap to clone via `Arc` internals; the composed chain is immutable and
/// shared by all clones. See the [module docs](self) for the chain model.
#[derive(Clone)]
pub struct IntegrationEventPublisher {
    chain: Arc<Link>,
}

impl IntegrationEventPublisher {
    /// Create a publisher with no filters around the given transport.
    pub fn new(transport: impl PublishTransport + 'static) -> Self {
        Self {
            chain: Arc::new(Link::Terminal(Arc::new(transport))),
        }
    }

    /// Create a builder for a publisher with filters.
    #[must_use]
    pub fn builder() -> PublisherBuilder {
        PublisherBuilder::default()
    }

    /// Publish an event with no cancellation signal.
    ///
    /// Equivalent to [`publish_with`](Self::publish_with) with a default
    /// (never-cancelled) token.
    ///
    /// # Errors
    ///
    /// See [`publish_with`](Self::publish_with).
    pub async fn publish<E>(&self, event: &E) -> PublishResult
    where
        E: IntegrationEvent + Serialize,
    {
        self.publish_with(event, CancellationToken::default()).await
    }

    /// Publish an event through the chain.
    ///
    /// Wraps the event and an empty header map into a fresh
    /// [`PublishContext`] and drives it through the prebuilt chain once.
    ///
    /// # Errors
    ///
    /// - [`PublishError::InvalidEvent`] if the event type name is empty.
    /// - [`PublishError::EncodingFailed`] if the event cannot be serialized.
    /// - Whatever fault any filter or the transport raises, unwrapped.
    pub async fn publish_with<E>(
        &self,
        event: &E,
        cancellation: CancellationToken,
    ) -> PublishResult
    where
        E: IntegrationEvent + Serialize,
    {
        let event_type = event.event_type();
        if event_type.trim().is_empty() {
            return Err(PublishError::InvalidEvent(
                "event type name is empty".to_string(),
            ));
        }

        let envelope = EventEnvelope::from_event(event).map_err(|e| {
            PublishError::EncodingFailed {
                event_type: event_type.to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut ctx = PublishContext::new(envelope, cancellation);
        self.chain.invoke(&mut ctx).await
    }
}

/// Builder for an [`IntegrationEventPublisher`].
///
/// Filters run in the order they are added. The chain itself is composed in
/// `build()` by folding the sequence in reverse over the terminal transport.
#[derive(Default)]
pub struct PublisherBuilder {
    filters: SmallVec<[Arc<dyn PublishFilter>; 4]>,
    transport: Option<Arc<dyn PublishTransport>>,
}

impl PublisherBuilder {
    /// Append a filter to the chain.
    #[must_use]
    pub fn filter(mut self, filter: impl PublishFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Append an already-shared filter to the chain.
    #[must_use]
    pub fn filter_arc(mut self, filter: Arc<dyn PublishFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set the terminal transport.
    #[must_use]
    pub fn transport(mut self, transport: impl PublishTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set an already-shared terminal transport.
    #[must_use]
    pub fn transport_arc(mut self, transport: Arc<dyn PublishTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Compose the chain and build the publisher.
    ///
    /// Folds the filter sequence in reverse over the terminal link, so the
    /// first filter added becomes the outermost link and runs first.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Misconfigured`] if no transport was set.
    pub fn build(self) -> Result<IntegrationEventPublisher, PublishError> {
        let transport = self.transport.ok_or_else(|| {
            PublishError::Misconfigured("no transport configured".to_string())
        })?;

        let mut link = Arc::new(Link::Terminal(transport));
        for filter in self.filters.into_iter().rev() {
            link = Arc::new(Link::Filter { filter, next: link });
        }

        Ok(IntegrationEventPublisher { chain: link })
    }
}
