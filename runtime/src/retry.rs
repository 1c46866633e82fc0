//! Retry with exponential backoff, packaged as a publish filter.
//!
//! The chain itself never retries; recovery from transient delivery faults
//! is the job of a filter that catches the downstream error and re-invokes
//! the rest of the chain with bounded attempts. Only
//! [`PublishError::DeliveryFailed`] is considered transient — validation,
//! rejection, and cancellation faults are returned immediately.
//!
//! # Example
//!
//! ```
//! use eventline_runtime::retry::{RetryFilter, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::builder()
//!     .max_retries(5)
//!     .initial_delay(Duration::from_millis(100))
//!     .max_delay(Duration::from_secs(10))
//!     .multiplier(2.0)
//!     .build();
//!
//! let filter = RetryFilter::new(policy);
//! ```

use eventline_core::context::PublishContext;
use eventline_core::filter::{Next, PublishFilter, PublishFuture};
use eventline_core::publisher::PublishError;
use std::time::Duration;
use tokio::time::sleep;

/// Retry policy configuration for exponential backoff.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `initial_delay`: 100ms
/// - `max_delay`: 30 seconds
/// - `multiplier`: 2.0 (delay doubles each retry)
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: usize,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries (cap for exponential backoff)
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            max_retries: None,
            initial_delay: None,
            max_delay: None,
            multiplier: None,
        }
    }

    /// Calculate delay for a given attempt number.
    ///
    /// Uses exponential backoff: delay = `initial_delay` * (multiplier ^
    /// attempt), capped at `max_delay`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }

        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);

        let delay = Duration::from_millis(delay_ms as u64);

        if delay > self.max_delay {
            self.max_delay
        } else {
            delay
        }
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_retries: Option<usize>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
}

impl RetryPolicyBuilder {
    /// Set maximum number of retries.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set initial delay before first retry.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set maximum delay (cap for exponential backoff).
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set multiplier for exponential backoff.
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Build the [`RetryPolicy`].
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            initial_delay: self.initial_delay.unwrap_or(defaults.initial_delay),
            max_delay: self.max_delay.unwrap_or(defaults.max_delay),
            multiplier: self.multiplier.unwrap_or(defaults.multiplier),
        }
    }
}

/// A filter that retries transient delivery faults with exponential backoff.
///
/// Re-invokes the rest of the chain for each attempt, so downstream filters
/// run again too; the terminal transport still runs at most once per
/// forwarding. Between attempts the filter observes the context's
/// cancellation token and aborts with [`PublishError::Cancelled`].
#[derive(Debug, Clone)]
pub struct RetryFilter {
    policy: RetryPolicy,
}

impl RetryFilter {
    /// Create a retry filter with the given policy.
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    const fn is_retryable(error: &PublishError) -> bool {
        matches!(error, PublishError::DeliveryFailed { .. })
    }
}

impl Default for RetryFilter {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl PublishFilter for RetryFilter {
    fn name(&self) -> &'static str {
        "retry"
    }

    fn on_publish<'a>(&'a self, ctx: &'a mut PublishContext, next: Next) -> PublishFuture<'a> {
        Box::pin(async move {
            let mut attempt = 0;

            loop {
                match next.run(ctx).await {
                    Ok(outcome) => {
                        if attempt > 0 {
                            tracing::info!(attempt, "Publish succeeded after retry");
                        }
                        return Ok(outcome);
                    }
                    Err(err) => {
                        if !Self::is_retryable(&err) {
                            tracing::warn!(
                                error = %err,
                                "Publish fault is not retryable, failing immediately"
                            );
                            return Err(err);
                        }

                        if attempt >= self.policy.max_retries {
                            tracing::error!(
                                attempt,
                                error = %err,
                                "Publish failed after max retries"
                            );
                            return Err(err);
                        }

                        let delay = self.policy.delay_for_attempt(attempt);
                        tracing::warn!(
                            attempt,
                            delay_ms = delay.as_millis(),
                            error = %err,
                            "Publish failed, retrying..."
                        );

                        tokio::select! {
                            () = sleep(delay) => {}
                            () = ctx.cancellation().cancelled() => {
                                return Err(PublishError::Cancelled);
                            }
                        }
                        attempt += 1;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)] // Panics: tests fail loudly on setup errors
mod tests {
    use super::*;
    use eventline_core::cancellation::CancellationToken;
    use eventline_core::event::IntegrationEvent;
    use eventline_core::publisher::IntegrationEventPublisher;
    use eventline_testing::mocks::FailingTransport;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct Ping;

    impl IntegrationEvent for Ping {
        fn event_type(&self) -> &'static str {
            "Ping.v1"
        }
    }

    fn fast_policy(max_retries: usize) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(max_retries)
            .initial_delay(Duration::from_millis(10))
            .build()
    }

    #[test]
    fn delay_calculation_doubles_each_attempt() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(100))
            .multiplier(2.0)
            .max_delay(Duration::from_secs(10))
            .build();

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(800));
    }

    #[test]
    fn delay_is_capped_at_max_delay() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(1000))
            .multiplier(10.0)
            .max_delay(Duration::from_secs(2))
            .build();

        // 1000ms * 10^5 is far beyond the cap
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn delivers_after_transient_failures() {
        let transport = Arc::new(FailingTransport::failing_times(2));
        let publisher = IntegrationEventPublisher::builder()
            .filter(RetryFilter::new(fast_policy(3)))
            .transport_arc(transport.clone())
            .build()
            .expect("build should succeed");

        let outcome = publisher.publish(&Ping).await.expect("publish should succeed");

        assert!(outcome.is_delivered());
        assert_eq!(transport.attempts(), 3); // 2 failures + 1 success
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let transport = Arc::new(FailingTransport::always_failing());
        let publisher = IntegrationEventPublisher::builder()
            .filter(RetryFilter::new(fast_policy(2)))
            .transport_arc(transport.clone())
            .build()
            .expect("build should succeed");

        let result = publisher.publish(&Ping).await;

        assert!(matches!(result, Err(PublishError::DeliveryFailed { .. })));
        assert_eq!(transport.attempts(), 3); // initial + 2 retries
    }

    #[tokio::test]
    async fn does_not_retry_non_transient_faults() {
        use eventline_core::transport::PublishTransport;
        use std::sync::atomic::{AtomicUsize, Ordering};

        #[derive(Default)]
        struct RejectingTransport {
            attempts: AtomicUsize,
        }

        impl PublishTransport for RejectingTransport {
            fn deliver<'a>(&'a self, _ctx: &'a mut PublishContext) -> PublishFuture<'a> {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                Box::pin(async {
                    Err(PublishError::Rejected {
                        filter: "quota",
                        reason: "tenant over quota".to_string(),
                    })
                })
            }
        }

        let transport = Arc::new(RejectingTransport::default());
        let publisher = IntegrationEventPublisher::builder()
            .filter(RetryFilter::new(fast_policy(3)))
            .transport_arc(transport.clone())
            .build()
            .expect("build should succeed");

        let result = publisher.publish(&Ping).await;

        assert!(matches!(result, Err(PublishError::Rejected { .. })));
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_between_attempts_aborts() {
        let transport = Arc::new(FailingTransport::always_failing());
        let publisher = IntegrationEventPublisher::builder()
            .filter(RetryFilter::new(
                RetryPolicy::builder()
                    .max_retries(10)
                    .initial_delay(Duration::from_secs(60))
                    .build(),
            ))
            .transport_arc(transport.clone())
            .build()
            .expect("build should succeed");

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let result = publisher.publish_with(&Ping, token).await;

        assert_eq!(result, Err(PublishError::Cancelled));
        assert_eq!(transport.attempts(), 1); // cancelled during the first backoff
    }
}
