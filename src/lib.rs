//! FarmLink API Library
//!
//! Order lifecycle backend for a produce marketplace: sellers submit orders
//! to farmers, farmers decide them, deliverymen claim and deliver them.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod tracing;

use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::timeout::TimeoutLayer;
use utoipa::ToSchema;

use crate::events::EventSender;
use crate::repositories::OrderStore;
use crate::services::{
    order_queries::{OrderQueryService, PageLimits},
    orders::OrderService,
    parties::PartyDirectory,
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::AppConfig>,
    pub store: Arc<dyn OrderStore>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wires the order services over one store.
    pub fn new(
        config: config::AppConfig,
        store: Arc<dyn OrderStore>,
        parties: Arc<dyn PartyDirectory>,
        event_sender: Option<EventSender>,
    ) -> Self {
        let limits = PageLimits {
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        };
        let services = handlers::AppServices {
            orders: Arc::new(OrderService::new(store.clone(), event_sender)),
            queries: Arc::new(OrderQueryService::new(store.clone(), parties, limits)),
        };
        Self {
            config: Arc::new(config),
            store,
            services,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

pub fn api_v1_routes() -> Router<AppState> {
    use handlers::orders;

    Router::new()
        .route(
            "/orders",
            get(orders::list_orders).post(orders::create_order),
        )
        .route("/orders/available", get(orders::list_available_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/decision", put(orders::decide_order))
        .route("/orders/:id/accept", put(orders::accept_delivery))
        .route(
            "/orders/:id/delivery-status",
            put(orders::update_delivery_status),
        )
}

/// Full HTTP surface: v1 API, health, Swagger UI, request ids, tracing and
/// timeouts. CORS is left to the binary.
pub fn app_router(state: AppState) -> Router {
    let timeout = state.config.request_timeout();

    Router::<AppState>::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(TimeoutLayer::new(timeout))
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }
}
