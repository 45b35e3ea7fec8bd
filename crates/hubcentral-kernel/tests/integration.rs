//! Integration tests for the hubcentral-kernel crate.
//!
//! These tests drive the event bus end to end: producers on several tasks,
//! condition triggers that publish follow-up events, and the shutdown drain.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use hubcentral_kernel::{BusConfig, EventBus, EventType, Priority};
use serde_json::{Value, json};

fn bus() -> EventBus {
    EventBus::with_config(BusConfig::new().with_idle_backoff_ms(5))
}

// ═══════════════════════════════════════════════════════════════════════
//  Producers
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn concurrent_producers_all_dispatched() {
    let bus = bus();
    let counter = Arc::new(AtomicU32::new(0));

    let c = Arc::clone(&counter);
    bus.register_handler(EventType::FileChange, move |_| {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        }
    });
    bus.start().await;

    let mut producers = Vec::new();
    for p in 0..4 {
        let bus = bus.clone();
        producers.push(tokio::spawn(async move {
            for i in 0..25 {
                bus.create_event(
                    EventType::FileChange,
                    format!("producer-{p}"),
                    json!({ "i": i }),
                    Priority::Normal,
                )
                .await;
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    bus.stop().await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 100);

    let status = bus.get_status().await;
    // 100 file changes + startup + shutdown
    assert_eq!(status.events_processed, 102);
    assert_eq!(status.queue_depth, 0);
}

// ═══════════════════════════════════════════════════════════════════════
//  Condition triggers
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn trigger_action_can_publish_follow_up_events() {
    let bus = bus();
    let notifications = Arc::new(AtomicU32::new(0));

    let n = Arc::clone(&notifications);
    bus.register_handler(EventType::Notification, move |_| {
        let n = Arc::clone(&n);
        async move {
            n.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        }
    });

    let weak = bus.downgrade();
    bus.register_trigger(
        "webhook-to-notification",
        |event| event.event_type == EventType::Webhook,
        move |event| {
            let weak = weak.clone();
            async move {
                let bus = weak.upgrade().ok_or("bus dropped")?;
                bus.create_event(
                    EventType::Notification,
                    "trigger",
                    json!({ "from": event.source }),
                    Priority::High,
                )
                .await;
                Ok(Value::Null)
            }
        },
    )
    .await;

    bus.start().await;
    bus.create_event(EventType::Webhook, "n8n", json!({}), Priority::Normal)
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    bus.stop().await.unwrap();

    assert_eq!(notifications.load(Ordering::SeqCst), 1);
    let status = bus.get_status().await;
    assert_eq!(status.triggers, 1);
    assert_eq!(status.triggers_fired, 1);
    assert_eq!(status.errors, 0);
}

// ═══════════════════════════════════════════════════════════════════════
//  Lifecycle
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn stop_drains_pending_backlog() {
    let bus = bus();
    let counter = Arc::new(AtomicU32::new(0));

    let c = Arc::clone(&counter);
    bus.register_handler(EventType::Scheduled, move |_| {
        let c = Arc::clone(&c);
        async move {
            tokio::time::sleep(Duration::from_millis(2)).await;
            c.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        }
    });

    for i in 0..20 {
        bus.create_event(EventType::Scheduled, "timer", json!({ "i": i }), Priority::Background)
            .await;
    }
    bus.start().await;
    bus.stop().await.unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 20);
    assert!(bus.history(100).await.iter().all(|e| e.processed));
}

#[tokio::test]
async fn stop_times_out_on_stuck_handler() {
    let bus = EventBus::with_config(
        BusConfig::new()
            .with_idle_backoff_ms(5)
            .with_shutdown_timeout_secs(1),
    );
    bus.register_handler(EventType::UserRequest, |_| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Value::Null)
    });

    bus.start().await;
    bus.create_event(EventType::UserRequest, "user", json!({}), Priority::Normal)
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = bus.stop().await.unwrap_err();
    assert!(err.to_string().contains("did not stop"));
}
