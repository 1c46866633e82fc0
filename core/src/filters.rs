//! Built-in filters shipped with the core crate.
//!
//! These cover the common pre-delivery concerns: stamping fixed headers and
//! propagating correlation metadata. Resilience filters (retry, circuit
//! breaking) and observability filters live in `eventline-runtime`.

use crate::context::{Headers, PublishContext};
use crate::environment::{Clock, IdGenerator};
use crate::filter::{Next, PublishFilter, PublishFuture};
use std::sync::Arc;

/// Header carrying the correlation id linking related events.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Header carrying the RFC 3339 timestamp of the publish call.
pub const PUBLISHED_AT_HEADER: &str = "x-published-at";

/// Sets a fixed set of headers on every publish, then forwards.
///
/// Later filters and the transport see these values; a later filter may
/// overwrite them.
///
/// # Example
///
/// ```
/// use eventline_core::filters::HeaderFilter;
///
/// let filter = HeaderFilter::new()
///     .set("x-source", Some("billing".to_string()))
///     .set("x-schema", Some("v2".to_string()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct HeaderFilter {
    headers: Headers,
}

impl HeaderFilter {
    /// Create a filter with no headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header to stamp on every publish.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        self.headers.insert(key.into(), value);
        self
    }
}

impl PublishFilter for HeaderFilter {
    fn name(&self) -> &'static str {
        "headers"
    }

    fn on_publish<'a>(&'a self, ctx: &'a mut PublishContext, next: Next) -> PublishFuture<'a> {
        for (key, value) in &self.headers {
            ctx.set_header(key.clone(), value.clone());
        }
        next.run(ctx)
    }
}

/// Propagates correlation metadata: a correlation id (minted only when the
/// caller has not already set one upstream) and a publish timestamp.
pub struct CorrelationFilter {
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl CorrelationFilter {
    /// Create a correlation filter over the given id and time sources.
    #[must_use]
    pub fn new(ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self { ids, clock }
    }
}

impl PublishFilter for CorrelationFilter {
    fn name(&self) -> &'static str {
        "correlation"
    }

    fn on_publish<'a>(&'a self, ctx: &'a mut PublishContext, next: Next) -> PublishFuture<'a> {
        if !ctx.headers().contains_key(CORRELATION_ID_HEADER) {
            ctx.set_header(CORRELATION_ID_HEADER, Some(self.ids.next_id()));
        }
        ctx.set_header(PUBLISHED_AT_HEADER, Some(self.clock.now().to_rfc3339()));
        next.run(ctx)
    }
}
