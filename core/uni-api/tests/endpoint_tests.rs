use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use uni_api::{ApiConfig, EntityEndpoint, HttpClient, ProcessTracker, RemoteClient};
use uni_events::{EventBus, KvStore, UniEvent};
use uni_types::{DatabaseModel, FindQuery, User};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoint_for(server: &MockServer, bus: EventBus) -> EntityEndpoint {
    let store = Arc::new(KvStore::in_memory(bus.clone()));
    let config = ApiConfig {
        server_url: server.uri(),
        ..Default::default()
    };
    let client: Arc<dyn RemoteClient> = Arc::new(HttpClient::new(config, store).unwrap());
    EntityEndpoint::new(client, "/user").with_bus(bus)
}

// ── Paths ───────────────────────────────────────────────────────

#[tokio::test]
async fn paths_are_built_from_module() {
    let server = MockServer::start().await;
    let endpoint = endpoint_for(&server, EventBus::new());
    assert_eq!(endpoint.path(), "/user");
    assert_eq!(endpoint.get_path("u1"), "/user/get?entity_id=u1");
    assert_eq!(endpoint.update_path(), "/user/update");
}

#[tokio::test]
async fn get_path_escapes_id() {
    let server = MockServer::start().await;
    let endpoint = endpoint_for(&server, EventBus::new());
    assert_eq!(endpoint.get_path("a b&c"), "/user/get?entity_id=a%20b%26c");
}

// ── CRUD ────────────────────────────────────────────────────────

#[tokio::test]
async fn get_decodes_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/get"))
        .and(query_param("entity_id", "u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "email": "ada@example.com",
            "updated": {"user_id": "u1", "timestamp": 100}
        })))
        .mount(&server)
        .await;

    let endpoint = endpoint_for(&server, EventBus::new());
    let user: User = endpoint.get("u1").await.unwrap();
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.base.updated.unwrap().timestamp, Some(100));
}

#[tokio::test]
async fn get_with_wrong_shape_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3])))
        .mount(&server)
        .await;

    let endpoint = endpoint_for(&server, EventBus::new());
    let err = endpoint.get::<DatabaseModel>("u1").await.unwrap_err();
    assert_eq!(err.text, "decode error");
}

#[tokio::test]
async fn update_posts_partial_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/update"))
        .and(body_json(json!({"id": "u1", "note": "b"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = endpoint_for(&server, EventBus::new());
    endpoint.update(json!({"id": "u1", "note": "b"})).await.unwrap();
}

#[tokio::test]
async fn create_posts_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/create"))
        .and(body_json(json!({"id": "new", "name": "Ada"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "new"})))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = endpoint_for(&server, EventBus::new());
    let mut record = DatabaseModel::new("new");
    record.name = Some("Ada".into());
    let created = endpoint.create(&record).await.unwrap();
    assert_eq!(created["id"], json!("new"));
}

#[tokio::test]
async fn delete_announces_on_bus() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/delete"))
        .and(query_param("entity_id", "u1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let bus = EventBus::new();
    let mut sub = bus.subscribe();
    let endpoint = endpoint_for(&server, bus);

    endpoint.delete("u1").await.unwrap();

    assert_eq!(
        sub.try_recv(),
        Some(UniEvent::EntityDeleted {
            endpoint: "/user".into(),
            id: "u1".into()
        })
    );
}

#[tokio::test]
async fn failed_delete_announces_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/delete"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "forbidden"})))
        .mount(&server)
        .await;

    let bus = EventBus::new();
    let mut sub = bus.subscribe();
    let endpoint = endpoint_for(&server, bus);

    let err = endpoint.delete("u1").await.unwrap_err();
    assert_eq!(err.status, 403);
    assert_eq!(sub.try_recv(), None);
}

#[tokio::test]
async fn find_and_count_send_query() {
    let server = MockServer::start().await;
    let query = FindQuery::new().with_filters(vec![json!(["enabled", "==", true])]);
    let body = serde_json::to_value(&query).unwrap();

    Mock::given(method("POST"))
        .and(path("/user/count"))
        .and(body_json(body.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(2)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user/find"))
        .and(body_json(body))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "a"}, {"id": "b"}])),
        )
        .mount(&server)
        .await;

    let endpoint = endpoint_for(&server, EventBus::new());
    assert_eq!(endpoint.count(&query).await.unwrap(), 2);

    let found: Vec<DatabaseModel> = endpoint.find(&query).await.unwrap();
    assert_eq!(
        found.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
        vec!["a", "b"]
    );
}

// ── ProcessTracker ──────────────────────────────────────────────

#[test]
fn process_tracker_counts_running() {
    let tracker = ProcessTracker::new();
    assert!(!tracker.is_running());

    let a = tracker.start();
    let b = tracker.clone().start();
    assert_ne!(a.id(), b.id());
    assert_eq!(tracker.count(), 2);

    drop(a);
    assert!(tracker.is_running());
    assert_eq!(tracker.count(), 1);
    drop(b);
    assert!(!tracker.is_running());
}
