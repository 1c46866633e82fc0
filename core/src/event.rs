//! Integration event trait and the type-erased envelope threaded through the
//! publish chain.
//!
//! Integration events are facts crossing a service boundary. They are
//! serialized with `bincode` before entering the chain, so filters and
//! transports operate on a uniform envelope regardless of the concrete event
//! type.
//!
//! # Example
//!
//! ```
//! use eventline_core::event::IntegrationEvent;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum OrderEvent {
//!     OrderPaid { order_id: String, amount_cents: u64 },
//! }
//!
//! impl IntegrationEvent for OrderEvent {
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             OrderEvent::OrderPaid { .. } => "OrderPaid.v1",
//!         }
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event encoding and decoding.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize an event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize an event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// An event published across a service boundary.
///
/// # Event Naming Convention
///
/// `event_type()` must return a stable identifier with a version suffix
/// (`"OrderPaid.v1"`). The name is used as the envelope type, as the broker
/// message key, and by default as the destination topic, so renaming it is a
/// wire-format change.
///
/// # Serialization
///
/// Events are serialized to binary with `bincode`. The default method
/// implementations cover any type implementing `Serialize` and
/// `DeserializeOwned`.
pub trait IntegrationEvent: Send + Sync + 'static {
    /// Returns the stable, versioned type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the event cannot be
    /// serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the bytes do not
    /// decode into this event type.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// The type-erased form of an event inside one publish call.
///
/// Filters and transports see the envelope, not the concrete event type.
/// The envelope is immutable once built; per-call mutable state (headers,
/// cancellation) lives on the publish context instead.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// The event type identifier (e.g., `"OrderPaid.v1"`).
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,
}

impl EventEnvelope {
    /// Create an envelope from raw parts.
    #[must_use]
    pub const fn new(event_type: String, data: Vec<u8>) -> Self {
        Self { event_type, data }
    }

    /// Create an envelope from an [`IntegrationEvent`].
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the event cannot be
    /// serialized.
    pub fn from_event<E: IntegrationEvent + Serialize>(event: &E) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
        })
    }
}

impl fmt::Display for EventEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EventEnvelope {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}
