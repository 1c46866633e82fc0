//! Redpanda terminal transport for Eventline.
//!
//! This crate provides the production [`PublishTransport`] that hands
//! integration events to a Kafka-compatible broker via rdkafka. It is the
//! innermost link of the chain: it runs after every filter has forwarded,
//! sees the cumulative header mutations, and maps them onto Kafka message
//! headers.
//!
//! # Why Redpanda?
//!
//! - **Kafka-compatible**: standard Kafka protocol, works with Redpanda,
//!   Apache Kafka, or any compatible hosted service
//! - **Simpler operations**: Redpanda is easier to deploy and operate
//! - **Self-hostable**: Docker, Kubernetes, bare metal
//!
//! # Topic Routing
//!
//! By default each event is sent to the topic named after its event type
//! (`"OrderPaid.v1"` goes to topic `OrderPaid.v1`). Deployments that funnel
//! everything through one topic set a fixed override on the builder. The
//! event type is always used as the message key, so events of the same type
//! stay ordered within their partition.
//!
//! # Example
//!
//! ```no_run
//! use eventline_core::publisher::IntegrationEventPublisher;
//! use eventline_redpanda::RedpandaTransport;
//!
//! # fn example() -> Result<(), eventline_core::publisher::PublishError> {
//! let transport = RedpandaTransport::builder()
//!     .brokers("localhost:9092")
//!     .producer_acks("all")
//!     .compression("lz4")
//!     .topic("integration-events")
//!     .build()?;
//!
//! let publisher = IntegrationEventPublisher::new(transport);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use eventline_core::context::PublishContext;
use eventline_core::filter::PublishFuture;
use eventline_core::publisher::{PublishError, PublishOutcome};
use eventline_core::transport::PublishTransport;
use rdkafka::config::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;

/// Kafka-compatible terminal transport.
///
/// Delivery semantics:
///
/// - **Payload**: the bincode-serialized [`EventEnvelope`]
/// - **Key**: the event type, for per-type partition ordering
/// - **Headers**: the publish context's header map, value-preserving
///   (a header present with no value stays valueless on the wire)
/// - **Cancellation**: checked before the send and raced against the
///   in-flight send, surfacing as [`PublishError::Cancelled`]
///
/// [`EventEnvelope`]: eventline_core::event::EventEnvelope
pub struct RedpandaTransport {
    /// Kafka producer for publishing events
    producer: FutureProducer,
    /// Broker addresses
    brokers: String,
    /// Producer send timeout
    timeout: Duration,
    /// Fixed destination topic; `None` routes by event type
    topic: Option<String>,
}

impl RedpandaTransport {
    /// Create a transport with default configuration.
    ///
    /// # Parameters
    ///
    /// - `brokers`: Comma-separated list of broker addresses
    ///   (e.g., "localhost:9092")
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Misconfigured`] if the producer cannot be
    /// created from the given configuration.
    pub fn new(brokers: &str) -> Result<Self, PublishError> {
        Self::builder().brokers(brokers).build()
    }

    /// Create a new builder for configuring the transport.
    #[must_use]
    pub fn builder() -> RedpandaTransportBuilder {
        RedpandaTransportBuilder::default()
    }

    /// Get a reference to the brokers string.
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }

    fn destination_for(&self, event_type: &str) -> String {
        self.topic
            .clone()
            .unwrap_or_else(|| event_type.to_string())
    }
}

/// Builder for configuring a [`RedpandaTransport`].
///
/// # Example
///
/// ```no_run
/// use eventline_redpanda::RedpandaTransport;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), eventline_core::publisher::PublishError> {
/// let transport = RedpandaTransport::builder()
///     .brokers("localhost:9092,localhost:9093")
///     .producer_acks("all")
///     .compression("lz4")
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct RedpandaTransportBuilder {
    brokers: Option<String>,
    producer_acks: Option<String>,
    compression: Option<String>,
    timeout: Option<Duration>,
    topic: Option<String>,
}

impl RedpandaTransportBuilder {
    /// Set the broker addresses.
    ///
    /// # Parameters
    ///
    /// - `brokers`: Comma-separated list of broker addresses
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Set the producer acknowledgment mode.
    ///
    /// # Parameters
    ///
    /// - `acks`: "0" (no acks), "1" (leader ack), "all" (all replicas ack)
    ///
    /// Default: "1"
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.producer_acks = Some(acks.into());
        self
    }

    /// Set the compression codec.
    ///
    /// # Parameters
    ///
    /// - `compression`: "none", "gzip", "snappy", "lz4", "zstd"
    ///
    /// Default: "none"
    #[must_use]
    pub fn compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    /// Set the producer send timeout.
    ///
    /// Default: 5 seconds
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Route every event to one fixed topic instead of the per-event-type
    /// default.
    #[must_use]
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Build the [`RedpandaTransport`].
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Misconfigured`] if brokers are not set or the
    /// producer cannot be created.
    pub fn build(self) -> Result<RedpandaTransport, PublishError> {
        let brokers = self
            .brokers
            .ok_or_else(|| PublishError::Misconfigured("brokers not configured".to_string()))?;

        let mut producer_config = ClientConfig::new();
        producer_config
            .set("bootstrap.servers", &brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", self.producer_acks.as_deref().unwrap_or("1"))
            .set(
                "compression.type",
                self.compression.as_deref().unwrap_or("none"),
            );

        let producer: FutureProducer = producer_config.create().map_err(|e| {
            PublishError::Misconfigured(format!("Failed to create producer: {e}"))
        })?;

        tracing::info!(
            brokers = %brokers,
            acks = self.producer_acks.as_deref().unwrap_or("1"),
            compression = self.compression.as_deref().unwrap_or("none"),
            topic = self.topic.as_deref().unwrap_or("<event type>"),
            "RedpandaTransport created successfully"
        );

        Ok(RedpandaTransport {
            producer,
            brokers,
            timeout: self.timeout.unwrap_or(Duration::from_secs(5)),
            topic: self.topic,
        })
    }
}

impl PublishTransport for RedpandaTransport {
    fn deliver<'a>(&'a self, ctx: &'a mut PublishContext) -> PublishFuture<'a> {
        Box::pin(async move {
            if ctx.cancellation().is_cancelled() {
                return Err(PublishError::Cancelled);
            }

            let topic = self.destination_for(&ctx.envelope().event_type);

            let payload = bincode::serialize(ctx.envelope()).map_err(|e| {
                PublishError::DeliveryFailed {
                    destination: topic.clone(),
                    reason: format!("Failed to serialize envelope: {e}"),
                }
            })?;

            let mut headers = OwnedHeaders::new();
            for (key, value) in ctx.headers() {
                headers = headers.insert(Header {
                    key,
                    value: value.as_deref(),
                });
            }

            // Key by event type so events of the same type stay ordered
            // within their partition
            let record = FutureRecord::to(&topic)
                .payload(&payload)
                .key(ctx.envelope().event_type.as_bytes())
                .headers(headers);

            let send_result = tokio::select! {
                result = self.producer.send(record, Timeout::After(self.timeout)) => result,
                () = ctx.cancellation().cancelled() => {
                    tracing::warn!(topic = %topic, "Publish cancelled while sending");
                    return Err(PublishError::Cancelled);
                }
            };

            match send_result {
                Ok((partition, offset)) => {
                    tracing::debug!(
                        topic = %topic,
                        partition,
                        offset,
                        event_type = %ctx.envelope().event_type,
                        "Event published successfully"
                    );
                    Ok(PublishOutcome::Delivered)
                }
                Err((kafka_error, _)) => {
                    tracing::error!(
                        topic = %topic,
                        error = %kafka_error,
                        "Failed to publish event"
                    );
                    Err(PublishError::DeliveryFailed {
                        destination: topic,
                        reason: kafka_error.to_string(),
                    })
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)] // Panics: tests fail loudly on setup errors
mod tests {
    use super::*;

    #[test]
    fn redpanda_transport_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RedpandaTransport>();
        assert_sync::<RedpandaTransport>();
    }

    #[test]
    fn builder_requires_brokers() {
        let result = RedpandaTransport::builder().build();
        assert!(matches!(result, Err(PublishError::Misconfigured(_))));
    }

    #[test]
    fn destination_defaults_to_event_type() {
        let transport = RedpandaTransport::new("localhost:9092")
            .expect("producer creation should not need a live broker");
        assert_eq!(transport.destination_for("OrderPaid.v1"), "OrderPaid.v1");
    }

    #[test]
    fn destination_honors_fixed_topic() {
        let transport = RedpandaTransport::builder()
            .brokers("localhost:9092")
            .topic("integration-events")
            .build()
            .expect("producer creation should not need a live broker");
        assert_eq!(
            transport.destination_for("OrderPaid.v1"),
            "integration-events"
        );
    }

    #[tokio::test]
    async fn pre_cancelled_token_aborts_before_sending() {
        use eventline_core::cancellation::CancellationToken;
        use eventline_core::event::IntegrationEvent;
        use eventline_core::publisher::IntegrationEventPublisher;
        use serde::{Deserialize, Serialize};

        #[derive(Clone, Debug, Serialize, Deserialize)]
        struct Ping;

        impl IntegrationEvent for Ping {
            fn event_type(&self) -> &'static str {
                "Ping.v1"
            }
        }

        let transport = RedpandaTransport::new("localhost:19092")
            .expect("producer creation should not need a live broker");
        let publisher = IntegrationEventPublisher::new(transport);

        let token = CancellationToken::new();
        token.cancel();

        let result = publisher.publish_with(&Ping, token).await;
        assert_eq!(result, Err(PublishError::Cancelled));
    }
}
