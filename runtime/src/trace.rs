//! Structured logging around publish traversals.

use eventline_core::context::PublishContext;
use eventline_core::filter::{Next, PublishFilter, PublishFuture};
use eventline_core::publisher::PublishOutcome;
use std::time::Instant;

/// A filter that logs how each traversal ended, with its duration.
///
/// Place it first in the chain to cover everything downstream, or after a
/// retry filter to log each individual attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceFilter;

impl TraceFilter {
    /// Create a trace filter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PublishFilter for TraceFilter {
    fn name(&self) -> &'static str {
        "trace"
    }

    fn on_publish<'a>(&'a self, ctx: &'a mut PublishContext, next: Next) -> PublishFuture<'a> {
        Box::pin(async move {
            let started = Instant::now();
            let result = next.run(ctx).await;
            let elapsed_ms = started.elapsed().as_millis();
            let event_type = &ctx.envelope().event_type;

            match &result {
                Ok(PublishOutcome::Delivered) => {
                    tracing::debug!(
                        event_type = %event_type,
                        elapsed_ms,
                        "Event published"
                    );
                }
                Ok(PublishOutcome::ShortCircuited { filter, reason }) => {
                    tracing::debug!(
                        event_type = %event_type,
                        filter = %filter,
                        reason = %reason,
                        elapsed_ms,
                        "Publish short-circuited"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        event_type = %event_type,
                        error = %err,
                        elapsed_ms,
                        "Publish failed"
                    );
                }
            }

            result
        })
    }
}
