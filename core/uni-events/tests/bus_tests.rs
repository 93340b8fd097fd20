use pretty_assertions::assert_eq;
use serde_json::json;
use uni_events::{EventBus, UniEvent};

fn update(key: &str, value: serde_json::Value) -> UniEvent {
    UniEvent::StorageUpdate {
        key: key.to_string(),
        value,
    }
}

// ── Event names ─────────────────────────────────────────────────

#[test]
fn event_names_match_web_front_end() {
    assert_eq!(update("k", json!(1)).name(), "uni.event.storage.update");
    assert_eq!(
        UniEvent::StorageDelete { key: "k".into() }.name(),
        "uni.event.storage.delete"
    );
    assert_eq!(
        UniEvent::EntityDeleted {
            endpoint: "/user".into(),
            id: "u1".into()
        }
        .name(),
        "uni.event.entity.deleted"
    );
}

#[test]
fn storage_key_only_for_storage_events() {
    assert_eq!(update("k", json!(1)).storage_key(), Some("k"));
    assert_eq!(
        UniEvent::EntityDeleted {
            endpoint: "/user".into(),
            id: "u1".into()
        }
        .storage_key(),
        None
    );
}

#[test]
fn event_serializes_tagged() {
    let value = serde_json::to_value(UniEvent::StorageDelete { key: "k".into() }).unwrap();
    assert_eq!(value, json!({"type": "storage_delete", "key": "k"}));
}

// ── Publish / subscribe ─────────────────────────────────────────

#[test]
fn publish_without_subscribers_is_dropped() {
    let bus = EventBus::new();
    assert_eq!(bus.publish(update("k", json!(1))), 0);
}

#[tokio::test]
async fn subscriber_receives_events_in_order() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe();

    assert_eq!(bus.publish(update("a", json!(1))), 1);
    bus.publish(update("b", json!(2)));

    assert_eq!(sub.recv().await, Some(update("a", json!(1))));
    assert_eq!(sub.recv().await, Some(update("b", json!(2))));
    assert_eq!(sub.try_recv(), None);
}

#[tokio::test]
async fn every_subscriber_sees_every_event() {
    let bus = EventBus::new();
    let mut first = bus.subscribe();
    let mut second = bus.clone().subscribe();
    assert_eq!(bus.subscriber_count(), 2);

    bus.publish(update("k", json!("v")));

    assert_eq!(first.recv().await, Some(update("k", json!("v"))));
    assert_eq!(second.recv().await, Some(update("k", json!("v"))));
}

#[test]
fn key_subscription_filters_other_keys() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe_key("wanted");

    bus.publish(update("other", json!(1)));
    bus.publish(UniEvent::EntityDeleted {
        endpoint: "/user".into(),
        id: "u1".into(),
    });
    bus.publish(UniEvent::StorageDelete {
        key: "wanted".into(),
    });

    assert_eq!(
        sub.try_recv(),
        Some(UniEvent::StorageDelete {
            key: "wanted".into()
        })
    );
    assert_eq!(sub.try_recv(), None);
}

#[test]
fn lagged_subscriber_resumes_with_newest_events() {
    let bus = EventBus::with_capacity(2);
    let mut sub = bus.subscribe();

    for i in 0..5 {
        bus.publish(update("k", json!(i)));
    }

    assert_eq!(sub.try_recv(), Some(update("k", json!(3))));
    assert_eq!(sub.try_recv(), Some(update("k", json!(4))));
    assert_eq!(sub.try_recv(), None);
}

#[tokio::test]
async fn recv_ends_when_bus_dropped() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe();
    drop(bus);
    assert_eq!(sub.recv().await, None);
}
