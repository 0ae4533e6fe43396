//! Integration tests for [`RedpandaEventBus`] against a real Kafka broker.
//!
//! # Running These Tests
//!
//! These tests are ignored by default because they need Docker and take a
//! while to start Kafka:
//!
//! ```bash
//! cargo test -p order-stream-redpanda --test integration_tests -- --ignored
//! ```

#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use futures::StreamExt;
use order_stream_core::event::EventRecord;
use order_stream_core::event_bus::{EventBus, EventStream};
use order_stream_redpanda::{OffsetReset, RedpandaEventBus};
use std::time::Duration;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::kafka::{KAFKA_PORT, Kafka};

const WARMUP_KEY: &str = "warmup";

fn record(key: &str, payload: &serde_json::Value, timestamp: Option<i64>) -> EventRecord {
    EventRecord::new(
        Some(key.to_string()),
        serde_json::to_vec(payload).expect("serializable"),
        timestamp,
    )
}

/// Start Kafka and return the container together with its broker address.
async fn start_kafka() -> (ContainerAsync<Kafka>, String) {
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
    (kafka, format!("{host}:{port}"))
}

/// Publish warmup records until the broker accepts them, creating `topic`.
async fn ensure_topic_exists(event_bus: &RedpandaEventBus, topic: &str) {
    let warmup = EventRecord::new(Some(WARMUP_KEY.to_string()), b"{}".to_vec(), None);
    for attempt in 1..=60 {
        if event_bus.publish(topic, &warmup).await.is_ok() {
            // Topic metadata needs a moment to propagate.
            tokio::time::sleep(Duration::from_secs(3)).await;
            return;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(attempt != 60, "Failed to create topic {topic}");
    }
}

/// Read `count` non-warmup records from `stream`, or panic after `timeout`.
async fn receive(stream: &mut EventStream, count: usize, timeout: Duration) -> Vec<EventRecord> {
    let mut received = Vec::new();
    tokio::time::timeout(timeout, async {
        while received.len() < count {
            match stream.next().await {
                Some(Ok(record)) if record.key.as_deref() != Some(WARMUP_KEY) => {
                    received.push(record);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => panic!("stream error: {e}"),
                None => panic!("stream ended"),
            }
        }
    })
    .await
    .expect("Timeout waiting for records");
    received
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn publish_and_subscribe_round_trip() {
    let (_kafka, brokers) = start_kafka().await;

    let event_bus = RedpandaEventBus::builder()
        .brokers(&brokers)
        .client_id("order-api")
        .offset_reset(OffsetReset::Earliest)
        .build()
        .expect("Failed to create event bus");

    ensure_topic_exists(&event_bus, "orders").await;

    let mut stream = event_bus
        .subscribe(&["orders"])
        .await
        .expect("Failed to subscribe");

    let first = record("o-1", &serde_json::json!({"orderId": "o-1", "price": 10.5}), Some(1_735_689_600_000));
    let second = record("o-2", &serde_json::json!({"orderId": "o-2", "price": 3}), None);
    event_bus.publish("orders", &first).await.expect("publish first");
    event_bus.publish("orders", &second).await.expect("publish second");

    let received = receive(&mut stream, 2, Duration::from_secs(20)).await;

    assert_eq!(received[0].key.as_deref(), Some("o-1"));
    assert_eq!(received[0].payload, first.payload);
    assert_eq!(received[0].timestamp, Some(1_735_689_600_000));
    assert_eq!(received[1].key.as_deref(), Some("o-2"));
    assert!(received[1].timestamp.is_some());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn records_with_same_key_keep_their_order() {
    let (_kafka, brokers) = start_kafka().await;

    let event_bus = RedpandaEventBus::builder()
        .brokers(&brokers)
        .consumer_group("ordering-test")
        .offset_reset(OffsetReset::Earliest)
        .build()
        .expect("Failed to create event bus");

    ensure_topic_exists(&event_bus, "order-stats").await;

    let mut stream = event_bus
        .subscribe(&["order-stats"])
        .await
        .expect("Failed to subscribe");

    for total in 1..=5 {
        event_bus
            .publish(
                "order-stats",
                &record("global", &serde_json::json!({"totalOrders": total}), None),
            )
            .await
            .expect("Failed to publish");
    }

    let totals: Vec<i64> = receive(&mut stream, 5, Duration::from_secs(20))
        .await
        .into_iter()
        .map(|r| {
            r.decode_json::<serde_json::Value>().expect("json")["totalOrders"]
                .as_i64()
                .expect("number")
        })
        .collect();
    assert_eq!(totals, vec![1, 2, 3, 4, 5]);
}

/// Poll past the last received record so its offset is committed.
async fn finish(stream: &mut EventStream) {
    let _ = tokio::time::timeout(Duration::from_millis(500), stream.next()).await;
    // Give the async commit time to reach the broker.
    tokio::time::sleep(Duration::from_secs(2)).await;
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn committed_offsets_are_not_redelivered() {
    let (_kafka, brokers) = start_kafka().await;

    let build = || {
        RedpandaEventBus::builder()
            .brokers(&brokers)
            .consumer_group("at-least-once-test")
            .offset_reset(OffsetReset::Earliest)
            .build()
            .expect("Failed to create event bus")
    };

    let event_bus = build();
    ensure_topic_exists(&event_bus, "orders").await;

    {
        let mut stream = event_bus
            .subscribe(&["orders"])
            .await
            .expect("Failed to subscribe");
        event_bus
            .publish("orders", &record("first", &serde_json::json!({}), None))
            .await
            .expect("Failed to publish");
        let received = receive(&mut stream, 1, Duration::from_secs(20)).await;
        assert_eq!(received[0].key.as_deref(), Some("first"));
        finish(&mut stream).await;
    }

    let event_bus = build();
    let mut stream = event_bus
        .subscribe(&["orders"])
        .await
        .expect("Failed to resubscribe");
    event_bus
        .publish("orders", &record("second", &serde_json::json!({}), None))
        .await
        .expect("Failed to publish");

    let received = receive(&mut stream, 1, Duration::from_secs(30)).await;
    assert_eq!(received[0].key.as_deref(), Some("second"));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn producer_settings_are_accepted() {
    let (_kafka, brokers) = start_kafka().await;

    let event_bus = RedpandaEventBus::builder()
        .brokers(&brokers)
        .client_id("order-api")
        .producer_acks("all")
        .compression("lz4")
        .timeout(Duration::from_secs(10))
        .buffer_size(0)
        .build()
        .expect("Failed to create event bus");

    assert_eq!(event_bus.client_id(), "order-api");
    ensure_topic_exists(&event_bus, "orders").await;
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn record_in_progress_is_redelivered() {
    let (_kafka, brokers) = start_kafka().await;

    let build = || {
        RedpandaEventBus::builder()
            .brokers(&brokers)
            .consumer_group("in-progress-test")
            .offset_reset(OffsetReset::Earliest)
            .build()
            .expect("Failed to create event bus")
    };

    let event_bus = build();
    ensure_topic_exists(&event_bus, "orders").await;
    event_bus
        .publish("orders", &record("first", &serde_json::json!({}), None))
        .await
        .expect("Failed to publish");

    {
        let mut stream = event_bus
            .subscribe(&["orders"])
            .await
            .expect("Failed to subscribe");
        let received = receive(&mut stream, 1, Duration::from_secs(20)).await;
        assert_eq!(received[0].key.as_deref(), Some("first"));
        // Dropped before asking for the next record: "first" is not done.
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    let event_bus = build();
    let mut stream = event_bus
        .subscribe(&["orders"])
        .await
        .expect("Failed to resubscribe");
    let received = receive(&mut stream, 1, Duration::from_secs(30)).await;
    assert_eq!(received[0].key.as_deref(), Some("first"));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn uncommitted_group_replays_from_earliest() {
    let (_kafka, brokers) = start_kafka().await;

    let build = || {
        RedpandaEventBus::builder()
            .brokers(&brokers)
            .consumer_group("replay-test")
            .offset_reset(OffsetReset::Earliest)
            .commit_offsets(false)
            .build()
            .expect("Failed to create event bus")
    };

    let event_bus = build();
    ensure_topic_exists(&event_bus, "orders").await;
    for key in ["first", "second"] {
        event_bus
            .publish("orders", &record(key, &serde_json::json!({}), None))
            .await
            .expect("Failed to publish");
    }

    {
        let mut stream = event_bus
            .subscribe(&["orders"])
            .await
            .expect("Failed to subscribe");
        receive(&mut stream, 2, Duration::from_secs(20)).await;
        finish(&mut stream).await;
    }

    let event_bus = build();
    let mut stream = event_bus
        .subscribe(&["orders"])
        .await
        .expect("Failed to resubscribe");
    let keys: Vec<_> = receive(&mut stream, 2, Duration::from_secs(30))
        .await
        .into_iter()
        .filter_map(|r| r.key)
        .collect();
    assert_eq!(keys, vec!["first", "second"]);
}
