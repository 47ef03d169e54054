#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use farmlink_api::{
    config::AppConfig,
    db,
    events::{self, EventSender},
    repositories::{OrderStore, SeaOrmOrderStore},
    services::parties::InMemoryPartyDirectory,
    AppState,
};

/// Opens a fresh migrated in-memory SQLite database. A single connection
/// keeps every query on the same database.
pub async fn sqlite_store() -> Arc<SeaOrmOrderStore> {
    let mut cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .expect("failed to create test database");
    db::run_migrations(&pool)
        .await
        .expect("failed to run migrations in tests");

    Arc::new(SeaOrmOrderStore::new(Arc::new(pool)))
}

/// Helper harness for spinning up the full router over an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub parties: Arc<InMemoryPartyDirectory>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let store: Arc<dyn OrderStore> = sqlite_store().await;
        Self::with_store(store)
    }

    pub fn with_store(store: Arc<dyn OrderStore>) -> Self {
        let cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
        let (event_sender, event_rx) = EventSender::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let parties = Arc::new(InMemoryPartyDirectory::new());

        let state = AppState::new(cfg, store, parties.clone(), Some(event_sender));
        let router = farmlink_api::app_router(state.clone());

        Self {
            router,
            state,
            parties,
            _event_task: event_task,
        }
    }

    /// Send a request against the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };
        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a request and returns the status with the parsed JSON body.
    pub async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body is not JSON")
        };
        (status, value)
    }

    /// Submits an order and returns its `data` payload.
    pub async fn submit_order(&self, seller_id: &str, farmer_id: &str) -> Value {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/v1/orders",
                Some(order_payload(seller_id, farmer_id)),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "submit failed: {body}");
        body["data"].clone()
    }

    pub async fn decide(&self, order_id: &str, decision: &str) -> (StatusCode, Value) {
        self.json(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/decision"),
            Some(json!({ "status": decision })),
        )
        .await
    }

    pub async fn accept(&self, order_id: &str, deliveryman_id: &str) -> (StatusCode, Value) {
        self.json(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/accept"),
            Some(json!({ "deliverymanId": deliveryman_id })),
        )
        .await
    }

    pub async fn advance(&self, order_id: &str, delivery_status: &str) -> (StatusCode, Value) {
        self.json(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/delivery-status"),
            Some(json!({ "deliveryStatus": delivery_status })),
        )
        .await
    }
}

pub fn order_payload(seller_id: &str, farmer_id: &str) -> Value {
    json!({
        "sellerId": seller_id,
        "farmerId": farmer_id,
        "item": "Samba rice",
        "category": "grain",
        "quantity": 10,
        "price": 500,
        "district": "Kurunegala",
        "company": "Lanka Mills",
        "mobile": "0771234567",
        "email": "orders@lankamills.example",
        "address": "45 Mill Road",
        "sellerNote": "Need by end of month"
    })
}
