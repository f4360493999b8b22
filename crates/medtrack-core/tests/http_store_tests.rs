//! HTTP store tests against a mock inventory API.

use std::sync::Arc;
use std::time::Duration;

use medtrack_core::models::{ItemDraft, SalesMetric, Unit};
use medtrack_core::store::{HttpStore, InventoryStore, StoreError, USER_EMAIL_HEADER};
use medtrack_core::{ExpiryPolicy, InventoryController};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store(server: &MockServer) -> HttpStore {
    HttpStore::new(
        &server.uri(),
        Some("pharmacist@example.com".into()),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn backend_item(id: &str, name: &str, quantity: u32) -> serde_json::Value {
    json!({
        "_id": id,
        "name": name,
        "name_lower": name.to_lowercase(),
        "description": "Pain relief tablets",
        "quantity": quantity,
        "unit": "tablets",
        "use_period": 365,
        "price": 5.99,
        "reorder_level": 200,
        "created_at": "2024-06-01T00:00:00",
        "updated_at": "2024-06-01T00:00:00",
        "user_email": "pharmacist@example.com"
    })
}

#[tokio::test]
async fn test_list_items_sends_user_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/inventory"))
        .and(header(USER_EMAIL_HEADER, "pharmacist@example.com"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([backend_item("665b1f77", "Paracetamol 500mg", 1000)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let items = store(&server).list_items().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "665b1f77");
    assert_eq!(items[0].unit, Unit::Tablets);
}

#[tokio::test]
async fn test_rejection_carries_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/inventory/abc/sell"))
        .and(body_json(json!({ "quantity": 5000 })))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "detail": "Insufficient stock: only 1000 available" })),
        )
        .mount(&server)
        .await;

    let err = store(&server).sell("abc", 5000).await.unwrap_err();
    match &err {
        StoreError::Rejected { status, detail } => {
            assert_eq!(*status, 400);
            assert_eq!(detail.as_deref(), Some("Insufficient stock: only 1000 available"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.user_message(), "Insufficient stock: only 1000 available");
}

#[tokio::test]
async fn test_rejection_without_detail() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/inventory/abc"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let err = store(&server).delete_item("abc").await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Rejected {
            status: 500,
            detail: None
        }
    ));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/inventory/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = store(&server).list_activities().await.unwrap_err();
    assert!(matches!(err, StoreError::Decode(_)));
}

#[tokio::test]
async fn test_create_and_update_payloads() {
    let server = MockServer::start().await;
    let draft = ItemDraft {
        name: "Cetirizine 10mg".into(),
        description: "Allergy relief tablets".into(),
        quantity: 300,
        unit: Unit::Tablets,
        price: 4.99,
        use_period: 365,
        reorder_level: 60,
    };
    let payload = json!({
        "name": "Cetirizine 10mg",
        "description": "Allergy relief tablets",
        "quantity": 300,
        "unit": "tablets",
        "price": 4.99,
        "use_period": 365,
        "reorder_level": 60
    });

    Mock::given(method("POST"))
        .and(path("/api/inventory"))
        .and(body_json(payload.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "new" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/inventory/new"))
        .and(body_json(payload))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "new" })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store(&server);
    store.create_item(&draft).await.unwrap();
    store.update_item("new", &draft).await.unwrap();
}

#[tokio::test]
async fn test_reports() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/inventory/sales-over-time"))
        .and(query_param("by", "revenue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "date": "2024-06-01", "sales": 119.8 },
            { "date": "2024-06-02", "sales": 59.9 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/inventory/top-selling"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "Paracetamol 500mg", "sold": 30 }
        ])))
        .mount(&server)
        .await;

    let store = store(&server);
    let points = store.sales_over_time(SalesMetric::Revenue).await.unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].date, "2024-06-01");

    let top = store.top_selling().await.unwrap();
    assert_eq!(top[0].sold, 30);
    assert_eq!(top[0].revenue, None);
}

#[tokio::test]
async fn test_exchange_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/google-auth"))
        .and(query_param("code", "4/0Ab"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {
                "id": "108",
                "email": "pharmacist@example.com",
                "name": "Pharmacist",
                "picture": "https://example.com/avatar.png"
            }
        })))
        .mount(&server)
        .await;

    let user = store(&server).exchange_code("4/0Ab").await.unwrap();
    assert_eq!(user.email, "pharmacist@example.com");
    assert_eq!(user.picture.as_deref(), Some("https://example.com/avatar.png"));
}

#[tokio::test]
async fn test_failed_activity_fetch_fails_the_load() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/inventory"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([backend_item("a", "Paracetamol 500mg", 1000)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/inventory/activities"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "detail": "Database unavailable" })),
        )
        .mount(&server)
        .await;

    let mut controller =
        InventoryController::new(Arc::new(store(&server)), ExpiryPolicy::default());
    assert!(controller.refresh().await.is_err());
    assert!(controller.snapshot().items.is_empty());
    assert_eq!(controller.last_error(), Some("Database unavailable"));
}

#[tokio::test]
async fn test_mutation_then_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/inventory/a/restock"))
        .and(body_json(json!({ "quantity": 50 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "a" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/inventory"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([backend_item("a", "Paracetamol 500mg", 1050)])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/inventory/activities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "item_id": "a",
            "action": "restocked",
            "details": "Restocked 50 tablets of Paracetamol 500mg",
            "timestamp": "2024-06-03T08:00:00"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let mut controller =
        InventoryController::new(Arc::new(store(&server)), ExpiryPolicy::default());
    let notice = controller.restock("a", 50).await;

    assert!(!notice.is_error(), "{:?}", notice);
    assert_eq!(controller.snapshot().items[0].quantity, 1050);
    assert_eq!(controller.snapshot().activities.len(), 1);
}
