//! Integration tests for [`RedpandaTransport`] with a real Kafka instance.
//!
//! These use testcontainers to spin up Kafka and drive a full filter chain
//! through the transport, then read the messages back with a plain consumer
//! to validate payload, key, and header mapping.
//!
//! # Running These Tests
//!
//! They are `#[ignore]`d by default because they:
//! - Require Docker to be running (for testcontainers)
//! - Take 15-60 seconds per test to spin up Kafka
//! - Can be flaky due to Kafka's distributed nature and timing
//!
//! To run explicitly:
//! ```bash
//! cargo test -p eventline-redpanda --test integration_tests -- --ignored
//! ```
//!
//! # Panics
//!
//! Setup failures use `expect()` and `panic!()`, which is acceptable in
//! test code.

#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use eventline_core::event::{EventEnvelope, IntegrationEvent};
use eventline_core::filters::{
    CORRELATION_ID_HEADER, CorrelationFilter, HeaderFilter, PUBLISHED_AT_HEADER,
};
use eventline_core::publisher::IntegrationEventPublisher;
use eventline_redpanda::RedpandaTransport;
use eventline_testing::mocks::{SequentialIdGenerator, test_clock};
use futures::StreamExt;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{Headers as _, Message};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::kafka::{KAFKA_PORT, Kafka};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
enum OrderEvent {
    Warmup,
    OrderPaid { order_id: String, amount_cents: u64 },
}

impl IntegrationEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Warmup => "Warmup.v1",
            OrderEvent::OrderPaid { .. } => "OrderPaid.v1",
        }
    }
}

/// Wait until the broker accepts publishes through a bare publisher.
async fn wait_for_kafka_ready(publisher: &IntegrationEventPublisher) {
    let max_attempts = 60;
    for attempt in 1..=max_attempts {
        if publisher.publish(&OrderEvent::Warmup).await.is_ok() {
            // Give Kafka time to fully initialize and propagate metadata
            tokio::time::sleep(Duration::from_secs(2)).await;
            return;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(
            attempt != max_attempts,
            "Kafka failed to become ready after {max_attempts} attempts"
        );
    }
}

fn consumer_for(brokers: &str, group: &str) -> StreamConsumer {
    ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .set("group.id", group)
        .set("auto.offset.reset", "earliest")
        .set("enable.partition.eof", "false")
        .set("session.timeout.ms", "6000")
        .create()
        .expect("Failed to create consumer")
}

#[tokio::test]
#[ignore]
async fn full_chain_round_trip_with_headers() {
    // Start Kafka container
    let kafka = Kafka::default()
        .with_env_var("KAFKA_AUTO_CREATE_TOPICS_ENABLE", "true")
        .start()
        .await
        .expect("Failed to start Kafka container");

    let host = kafka.get_host().await.expect("Failed to get host");
    let port = kafka
        .get_host_port_ipv4(KAFKA_PORT)
        .await
        .expect("Failed to get port");
    let brokers = format!("{host}:{port}");

    let transport = RedpandaTransport::builder()
        .brokers(&brokers)
        .topic("integration-events")
        .build()
        .expect("Failed to create transport");
    let transport = Arc::new(transport);

    let warmup_publisher = IntegrationEventPublisher::builder()
        .transport_arc(transport.clone())
        .build()
        .expect("Failed to build warmup publisher");
    wait_for_kafka_ready(&warmup_publisher).await;

    // The chain under test: fixed headers + deterministic correlation
    let publisher = IntegrationEventPublisher::builder()
        .filter(HeaderFilter::new().set("x-source", Some("orders".to_string())))
        .filter(CorrelationFilter::new(
            Arc::new(SequentialIdGenerator::new()),
            Arc::new(test_clock()),
        ))
        .transport_arc(transport.clone())
        .build()
        .expect("Failed to build publisher");

    let event = OrderEvent::OrderPaid {
        order_id: "ord-42".to_string(),
        amount_cents: 1299,
    };
    let outcome = publisher.publish(&event).await.expect("Failed to publish");
    assert!(outcome.is_delivered());

    // Read it back with a plain consumer
    let consumer = consumer_for(&brokers, "round-trip-test");
    consumer
        .subscribe(&["integration-events"])
        .expect("Failed to subscribe");

    let mut stream = consumer.stream();
    let received = tokio::time::timeout(Duration::from_secs(15), async {
        loop {
            let message = stream
                .next()
                .await
                .expect("Stream ended unexpectedly")
                .expect("Failed to receive message");

            let payload = message.payload().expect("Message has no payload");
            let envelope: EventEnvelope =
                bincode::deserialize(payload).expect("Failed to decode envelope");
            if envelope.event_type == "Warmup.v1" {
                continue;
            }

            let headers: HashMap<String, Option<String>> = message
                .headers()
                .expect("Message has no headers")
                .iter()
                .map(|h| {
                    (
                        h.key.to_string(),
                        h.value
                            .map(|v| String::from_utf8(v.to_vec()).expect("non-utf8 header")),
                    )
                })
                .collect();

            let key = message
                .key()
                .map(|k| String::from_utf8(k.to_vec()).expect("non-utf8 key"));

            return (envelope, headers, key);
        }
    })
    .await
    .expect("Timeout waiting for event");

    let (envelope, headers, key) = received;
    assert_eq!(envelope.event_type, "OrderPaid.v1");
    assert_eq!(
        OrderEvent::from_bytes(&envelope.data).expect("Failed to decode event"),
        event
    );
    assert_eq!(key, Some("OrderPaid.v1".to_string()));

    // Headers accumulated by the chain arrive as Kafka headers
    assert_eq!(headers.get("x-source"), Some(&Some("orders".to_string())));
    assert_eq!(
        headers.get(CORRELATION_ID_HEADER),
        Some(&Some("id-1".to_string()))
    );
    assert_eq!(
        headers.get(PUBLISHED_AT_HEADER),
        Some(&Some("2026-01-01T00:00:00+00:00".to_string()))
    );
}

#[tokio::test]
#[ignore]
async fn events_route_to_event_type_topic_by_default() {
    // Start Kafka container
    let kafka = Kafka::default()
        .with_env_var("KAFKA_AUTO_CREATE_TOPICS_ENABLE", "true")
        .start()
        .await
        .expect("Failed to start Kafka container");

    let host = kafka.get_host().await.expect("Failed to get host");
    let port = kafka
        .get_host_port_ipv4(KAFKA_PORT)
        .await
        .expect("Failed to get port");
    let brokers = format!("{host}:{port}");

    // No topic override: destination is the event type name
    let transport = RedpandaTransport::new(&brokers).expect("Failed to create transport");
    let publisher = IntegrationEventPublisher::new(transport);
    wait_for_kafka_ready(&publisher).await;

    let event = OrderEvent::OrderPaid {
        order_id: "ord-7".to_string(),
        amount_cents: 500,
    };
    publisher.publish(&event).await.expect("Failed to publish");

    let consumer = consumer_for(&brokers, "topic-routing-test");
    consumer
        .subscribe(&["OrderPaid.v1"])
        .expect("Failed to subscribe");

    let mut stream = consumer.stream();
    let envelope = tokio::time::timeout(Duration::from_secs(15), async {
        loop {
            let message = stream
                .next()
                .await
                .expect("Stream ended unexpectedly")
                .expect("Failed to receive message");
            let payload = message.payload().expect("Message has no payload");
            let envelope: EventEnvelope =
                bincode::deserialize(payload).expect("Failed to decode envelope");
            if envelope.event_type != "Warmup.v1" {
                return envelope;
            }
        }
    })
    .await
    .expect("Timeout waiting for event");

    assert_eq!(envelope.event_type, "OrderPaid.v1");
}
