//! The aggregator running under an `EventConsumer`, fed through the bus.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::float_cmp)]

use order_stream_aggregator::{STATS_KEY, StatsAggregator};
use order_stream_core::environment::Clock;
use order_stream_core::{EventBus, EventRecord, NewOrder, Order, OrderStats};
use order_stream_runtime::EventConsumer;
use order_stream_testing::{InMemoryEventBus, test_clock};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

async fn publish_order(bus: &InMemoryEventBus, region: &str, cents: i64) {
    let input = NewOrder::new("user-1", "store-7", region, Decimal::new(cents, 2)).unwrap();
    let order = Order::create(input, test_clock().now());
    let record = EventRecord::json(
        Some(order.order_id.to_string()),
        &order,
        Some(order.created_at),
    )
    .unwrap();
    bus.publish("orders", &record).await.unwrap();
}

#[tokio::test]
async fn orders_topic_becomes_order_stats() {
    let bus = Arc::new(InMemoryEventBus::new());
    let aggregator = Arc::new(StatsAggregator::new(bus.clone(), "order-stats"));
    let (shutdown_tx, _) = broadcast::channel(1);

    let consumer = EventConsumer::builder()
        .name("aggregator")
        .topics(vec!["orders".to_string()])
        .event_bus(bus.clone())
        .handler(aggregator.clone())
        .shutdown(shutdown_tx.subscribe())
        .retry_delay(Duration::from_millis(10))
        .build()
        .unwrap();
    let handle = consumer.spawn();

    for _ in 0..200 {
        if bus.subscriber_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    publish_order(&bus, "Seoul", 12_000).await;
    bus.publish(
        "orders",
        &EventRecord::new(Some("junk".to_string()), b"not an order".to_vec(), None),
    )
    .await
    .unwrap();
    publish_order(&bus, "Jeju", 3_050).await;

    for _ in 0..200 {
        if bus.published_to("order-stats").len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let snapshots = bus.published_to("order-stats");
    assert_eq!(snapshots.len(), 2);
    assert!(snapshots.iter().all(|r| r.key.as_deref() == Some(STATS_KEY)));

    let latest: OrderStats = snapshots[1].decode_json().unwrap();
    assert_eq!(latest.total_orders, 2);
    assert_eq!(latest.total_sales, 150.5);
    assert_eq!(latest.by_region["Jeju"].sales, 30.5);
    assert_eq!(aggregator.current(), latest);

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("consumer stopped")
        .unwrap();
}

#[tokio::test]
async fn redelivered_orders_do_not_inflate_totals() {
    let bus = Arc::new(InMemoryEventBus::new());
    let aggregator = Arc::new(StatsAggregator::new(bus.clone(), "order-stats"));
    let (shutdown_tx, _) = broadcast::channel(1);

    let consumer = EventConsumer::builder()
        .name("aggregator")
        .topics(vec!["orders".to_string()])
        .event_bus(bus.clone())
        .handler(aggregator.clone())
        .shutdown(shutdown_tx.subscribe())
        .retry_delay(Duration::from_millis(10))
        .build()
        .unwrap();
    let handle = consumer.spawn();

    for _ in 0..200 {
        if bus.subscriber_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let input = NewOrder::new("user-1", "store-7", "Seoul", Decimal::new(2_000, 2)).unwrap();
    let order = Order::create(input, test_clock().now());
    let record = EventRecord::json(Some(order.order_id.to_string()), &order, None).unwrap();
    bus.publish("orders", &record).await.unwrap();
    bus.publish("orders", &record).await.unwrap();
    publish_order(&bus, "Seoul", 1_000).await;

    for _ in 0..200 {
        if bus.published_to("order-stats").len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let snapshots = bus.published_to("order-stats");
    assert_eq!(snapshots.len(), 2);
    let latest: OrderStats = snapshots[1].decode_json().unwrap();
    assert_eq!(latest.total_orders, 2);
    assert_eq!(latest.total_sales, 30.0);
    assert_eq!(latest.by_region["Seoul"].orders, 2);

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("consumer stopped")
        .unwrap();
}
