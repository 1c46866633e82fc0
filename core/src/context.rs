//! The per-call payload bundle threaded through the publish chain.

use crate::cancellation::CancellationToken;
use crate::event::EventEnvelope;
use std::collections::HashMap;

/// Header map carried alongside an event for one publish call.
///
/// Keys are header names; a `None` value is a header that is present but
/// deliberately empty, which some broker header schemes distinguish from an
/// absent key.
pub type Headers = HashMap<String, Option<String>>;

/// Everything one traversal of the chain can see and touch.
///
/// A fresh context is created for every top-level publish call and is
/// exclusively owned by that traversal: filters receive it by mutable
/// reference, may rewrite the headers in place, and must not retain it
/// beyond the call. Header mutations made by one filter are visible to every
/// link further down the chain, including the terminal transport.
#[derive(Debug)]
pub struct PublishContext {
    envelope: EventEnvelope,
    headers: Headers,
    cancellation: CancellationToken,
}

impl PublishContext {
    /// Create a context with an empty header map.
    #[must_use]
    pub fn new(envelope: EventEnvelope, cancellation: CancellationToken) -> Self {
        Self {
            envelope,
            headers: Headers::new(),
            cancellation,
        }
    }

    /// The event being published. Read-only for the whole traversal.
    #[must_use]
    pub const fn envelope(&self) -> &EventEnvelope {
        &self.envelope
    }

    /// The headers accumulated so far.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to the headers.
    pub const fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Insert or overwrite a single header.
    pub fn set_header(&mut self, key: impl Into<String>, value: Option<String>) {
        self.headers.insert(key.into(), value);
    }

    /// The cancellation token supplied by the caller.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> EventEnvelope {
        EventEnvelope::new("TestEvent.v1".to_string(), vec![1, 2, 3])
    }

    #[test]
    fn new_context_has_empty_headers() {
        let ctx = PublishContext::new(envelope(), CancellationToken::default());

        assert!(ctx.headers().is_empty());
        assert_eq!(ctx.envelope().event_type, "TestEvent.v1");
    }

    #[test]
    fn set_header_overwrites_existing_value() {
        let mut ctx = PublishContext::new(envelope(), CancellationToken::default());

        ctx.set_header("x-tenant", Some("a".to_string()));
        ctx.set_header("x-tenant", Some("b".to_string()));

        assert_eq!(
            ctx.headers().get("x-tenant"),
            Some(&Some("b".to_string()))
        );
    }

    #[test]
    fn headers_distinguish_empty_from_absent() {
        let mut ctx = PublishContext::new(envelope(), CancellationToken::default());

        ctx.set_header("x-flag", None);

        assert_eq!(ctx.headers().get("x-flag"), Some(&None));
        assert_eq!(ctx.headers().get("x-other"), None);
    }
}
