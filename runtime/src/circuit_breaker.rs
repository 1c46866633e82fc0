//! Circuit breaker for shielding an unhealthy transport, packaged as a
//! publish filter.
//!
//! The breaker watches delivery results flowing through the chain and
//! "opens" when consecutive failures reach a threshold. While open, publish
//! calls are rejected immediately with [`PublishError::Rejected`] instead of
//! hitting the transport; after a cooldown a limited number of probe calls
//! are let through to test recovery.
//!
//! # States
//!
//! - **Closed**: normal operation, failures are counted.
//! - **Open**: requests rejected immediately until the cooldown elapses.
//! - **HalfOpen**: probe requests allowed; enough successes close the
//!   circuit, any failure reopens it.
//!
//! # Example
//!
//! ```
//! use eventline_runtime::circuit_breaker::{BreakerConfig, CircuitBreakerFilter};
//! use std::time::Duration;
//!
//! let config = BreakerConfig::builder()
//!     .failure_threshold(5)
//!     .cooldown(Duration::from_secs(60))
//!     .success_threshold(2)
//!     .build();
//!
//! let filter = CircuitBreakerFilter::new(config);
//! ```

use eventline_core::context::PublishContext;
use eventline_core::filter::{Next, PublishFilter, PublishFuture};
use eventline_core::publisher::PublishError;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive delivery failures before opening the circuit
    pub failure_threshold: usize,
    /// How long to stay open before allowing probe calls
    pub cooldown: Duration,
    /// Successful probes required to close the circuit again
    pub success_threshold: usize,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
            success_threshold: 2,
        }
    }
}

impl BreakerConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub const fn builder() -> BreakerConfigBuilder {
        BreakerConfigBuilder {
            failure_threshold: None,
            cooldown: None,
            success_threshold: None,
        }
    }
}

/// Builder for [`BreakerConfig`].
#[derive(Debug, Clone)]
pub struct BreakerConfigBuilder {
    failure_threshold: Option<usize>,
    cooldown: Option<Duration>,
    success_threshold: Option<usize>,
}

impl BreakerConfigBuilder {
    /// Set how many consecutive failures open the circuit.
    #[must_use]
    pub const fn failure_threshold(mut self, threshold: usize) -> Self {
        self.failure_threshold = Some(threshold);
        self
    }

    /// Set how long the circuit stays open before probing.
    #[must_use]
    pub const fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    /// Set how many successful probes close the circuit.
    #[must_use]
    pub const fn success_threshold(mut self, threshold: usize) -> Self {
        self.success_threshold = Some(threshold);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> BreakerConfig {
        let defaults = BreakerConfig::default();
        BreakerConfig {
            failure_threshold: self.failure_threshold.unwrap_or(defaults.failure_threshold),
            cooldown: self.cooldown.unwrap_or(defaults.cooldown),
            success_threshold: self.success_threshold.unwrap_or(defaults.success_threshold),
        }
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Normal operation, publishes pass through
    Closed,
    /// Publishes are rejected immediately
    Open,
    /// Probing whether the transport recovered
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    failure_count: usize,
    success_count: usize,
    opened_at: Option<Instant>,
}

/// A filter that rejects publishes while the transport looks unhealthy.
///
/// Only [`PublishError::DeliveryFailed`] counts as a failure; validation,
/// cancellation, and rejection faults pass through without moving the state
/// machine, since they say nothing about transport health. Both delivered
/// and short-circuited outcomes count as success.
#[derive(Clone)]
pub struct CircuitBreakerFilter {
    config: Arc<BreakerConfig>,
    inner: Arc<RwLock<BreakerInner>>,
    total_rejections: Arc<AtomicU64>,
}

impl CircuitBreakerFilter {
    /// Create a breaker filter with the given configuration.
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config: Arc::new(config),
            inner: Arc::new(RwLock::new(BreakerInner {
                state: BreakerState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
            })),
            total_rejections: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The current state of the circuit.
    pub async fn state(&self) -> BreakerState {
        self.inner.read().await.state
    }

    /// How many publishes have been rejected while open.
    #[must_use]
    pub fn rejections(&self) -> u64 {
        self.total_rejections.load(Ordering::Relaxed)
    }

    /// Force the circuit back to closed. Intended for tests and manual
    /// intervention.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        tracing::info!("Circuit breaker manually reset to CLOSED");
        inner.state = BreakerState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.opened_at = None;
    }

    async fn can_attempt(&self) -> bool {
        let mut inner = self.inner.write().await;

        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => match inner.opened_at {
                Some(opened_at) if opened_at.elapsed() >= self.config.cooldown => {
                    tracing::info!("Circuit breaker transitioning OPEN -> HALF_OPEN");
                    inner.state = BreakerState::HalfOpen;
                    inner.success_count = 0;
                    true
                }
                _ => false,
            },
        }
    }

    async fn on_success(&self) {
        let mut inner = self.inner.write().await;

        match inner.state {
            BreakerState::Closed => {
                inner.failure_count = 0;
            }
            BreakerState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    tracing::info!(
                        successes = inner.success_count,
                        "Circuit breaker transitioning HALF_OPEN -> CLOSED"
                    );
                    inner.state = BreakerState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    inner.opened_at = None;
                }
            }
            BreakerState::Open => {
                inner.failure_count = 0;
            }
        }
    }

    async fn on_failure(&self) {
        let mut inner = self.inner.write().await;

        match inner.state {
            BreakerState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    tracing::warn!(
                        failures = inner.failure_count,
                        threshold = self.config.failure_threshold,
                        "Circuit breaker transitioning CLOSED -> OPEN"
                    );
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            BreakerState::HalfOpen => {
                tracing::warn!("Circuit breaker transitioning HALF_OPEN -> OPEN (probe failed)");
                inner.state = BreakerState::Open;
                inner.failure_count = 1;
                inner.success_count = 0;
                inner.opened_at = Some(Instant::now());
            }
            BreakerState::Open => {
                inner.failure_count += 1;
            }
        }
    }
}

impl PublishFilter for CircuitBreakerFilter {
    fn name(&self) -> &'static str {
        "circuit-breaker"
    }

    fn on_publish<'a>(&'a self, ctx: &'a mut PublishContext, next: Next) -> PublishFuture<'a> {
        Box::pin(async move {
            if !self.can_attempt().await {
                self.total_rejections.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    event_type = %ctx.envelope().event_type,
                    "Circuit breaker is OPEN, rejecting publish"
                );
                return Err(PublishError::Rejected {
                    filter: self.name(),
                    reason: "circuit is open".to_string(),
                });
            }

            let result = next.run(ctx).await;
            match &result {
                Ok(_) => self.on_success().await,
                Err(PublishError::DeliveryFailed { .. }) => self.on_failure().await,
                Err(_) => {}
            }
            result
        })
    }
}
