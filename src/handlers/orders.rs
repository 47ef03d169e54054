use std::collections::HashMap;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Json, Path, Query, State,
    },
    response::Response,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common::{created_response, json_body, path_param, query_params, total_pages};
use crate::{
    entities::order::{DeliveryStatus, Model as OrderModel, OrderStatus},
    errors::ServiceError,
    services::{
        order_queries::{ListOrders, OrderListing},
        order_state::Decision,
        orders::SubmitOrder,
        parties::PartyProfile,
    },
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub seller_id: String,
    pub farmer_id: String,
    pub item: String,
    #[schema(value_type = String, example = "10")]
    pub quantity: Decimal,
    /// Price per unit. Also accepted as `price`.
    #[serde(alias = "price")]
    #[schema(value_type = String, example = "500")]
    pub unit_price: Decimal,
    pub name: Option<String>,
    pub category: Option<String>,
    pub product_image: Option<String>,
    pub district: Option<String>,
    pub company: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub expire_date: Option<NaiveDate>,
    pub seller_note: Option<String>,
}

impl From<CreateOrderRequest> for SubmitOrder {
    fn from(request: CreateOrderRequest) -> Self {
        SubmitOrder {
            seller_id: request.seller_id,
            farmer_id: request.farmer_id,
            item: request.item,
            quantity: request.quantity,
            unit_price: request.unit_price,
            name: request.name,
            category: request.category,
            product_image: request.product_image,
            district: request.district,
            company: request.company,
            mobile: request.mobile,
            email: request.email,
            address: request.address,
            expire_date: request.expire_date,
            seller_note: request.seller_note,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub status: Decision,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptDeliveryRequest {
    pub deliveryman_id: String,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStatusRequest {
    pub delivery_status: DeliveryStatus,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersQuery {
    /// seller, farmer or deliveryman
    pub role: Option<String>,
    /// Party id for the chosen role
    pub id: Option<String>,
    /// Order status, or delivery status when role=deliveryman
    pub status: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// `parties` resolves party references into profiles
    pub expand: Option<String>,
}

fn wants_parties(expand: Option<&str>) -> bool {
    expand
        .map(|value| value.split(',').any(|part| part.trim() == "parties"))
        .unwrap_or(false)
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailableOrdersQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub expand: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub item: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_image: Option<String>,
    #[schema(value_type = String)]
    pub quantity: Decimal,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub total_price: Decimal,
    pub seller_id: String,
    pub farmer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliveryman_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub accepted_by_deliveryman: bool,
    pub delivery_status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farmer_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliveryman_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farmer_approval_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_accepted_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_completed_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderModel> for OrderResponse {
    fn from(order: OrderModel) -> Self {
        Self {
            id: order.id,
            item: order.item,
            name: order.name,
            category: order.category,
            product_image: order.product_image,
            quantity: order.quantity,
            unit_price: order.unit_price,
            total_price: order.total_price,
            seller_id: order.seller_id,
            farmer_id: order.farmer_id,
            deliveryman_id: order.deliveryman_id,
            district: order.district,
            company: order.company,
            mobile: order.mobile,
            email: order.email,
            address: order.address,
            expire_date: order.expire_date,
            status: order.status,
            accepted_by_deliveryman: order.accepted_by_deliveryman,
            delivery_status: order.delivery_status,
            seller_note: order.seller_note,
            farmer_note: order.farmer_note,
            deliveryman_note: order.deliveryman_note,
            farmer_approval_date: order.farmer_approval_date,
            delivery_accepted_date: order.delivery_accepted_date,
            delivery_completed_date: order.delivery_completed_date,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// One page of orders, optionally with the referenced parties resolved.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderListResponse {
    pub items: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parties: Option<HashMap<String, PartyProfile>>,
}

async fn list_response(
    state: &AppState,
    listing: OrderListing,
    expand: bool,
) -> Result<OrderListResponse, ServiceError> {
    let parties = if expand {
        Some(state.services.queries.expand_parties(&listing.items).await?)
    } else {
        None
    };

    Ok(OrderListResponse {
        total_pages: total_pages(listing.total, listing.limit),
        items: listing.items.into_iter().map(OrderResponse::from).collect(),
        total: listing.total,
        page: listing.page,
        limit: listing.limit,
        parties,
    })
}

/// Submit a new order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Submit order",
    description = "Seller submits an order to a farmer. The order starts pending and unaccepted.",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order submitted", body = ApiResponse<OrderResponse>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid order data", body = crate::errors::ErrorResponse),
        (status = 500, description = "Order store unavailable", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let request = json_body(payload)?;
    let order = state.services.orders.submit_order(request.into()).await?;
    Ok(created_response(ApiResponse::success(OrderResponse::from(
        order,
    ))))
}

/// Get an order by id
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order found", body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let id = path_param(id)?;
    let order = state.services.queries.by_id(id).await?;
    Ok(Json(ApiResponse::success(order.into())))
}

/// Farmer approves or disapproves a pending order
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/decision",
    summary = "Decide order",
    description = "Repeating the recorded decision is a no-op. A different decision on a decided order is rejected.",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Decision recorded", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid decision", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order already decided differently", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn decide_order(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let id = path_param(id)?;
    let request = json_body(payload)?;
    let order = state
        .services
        .orders
        .decide(id, request.status, request.note)
        .await?;
    Ok(Json(ApiResponse::success(order.into())))
}

/// Deliveryman accepts an approved order
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/accept",
    summary = "Accept delivery",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = AcceptDeliveryRequest,
    responses(
        (status = 200, description = "Delivery accepted", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Missing deliveryman id", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order not approved or accepted by another deliveryman", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn accept_delivery(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AcceptDeliveryRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let id = path_param(id)?;
    let request = json_body(payload)?;
    let order = state
        .services
        .orders
        .accept_delivery(id, &request.deliveryman_id, request.note)
        .await?;
    Ok(Json(ApiResponse::success(order.into())))
}

/// Deliveryman reports delivery progress
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/delivery-status",
    summary = "Update delivery status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = DeliveryStatusRequest,
    responses(
        (status = 200, description = "Delivery status updated", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Unknown delivery status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Delivery not accepted or step not allowed", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn update_delivery_status(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<DeliveryStatusRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let id = path_param(id)?;
    let request = json_body(payload)?;
    let order = state
        .services
        .orders
        .advance_delivery(id, request.delivery_status, request.note)
        .await?;
    Ok(Json(ApiResponse::success(order.into())))
}

/// List orders, optionally for one party
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    summary = "List orders",
    description = "Newest first. `role` requires `id`; without `role` every order is listed.",
    params(ListOrdersQuery),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<OrderListResponse>),
        (status = 400, description = "Invalid query", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<OrderListResponse>>, ServiceError> {
    let query = query_params(query)?;
    let expand = wants_parties(query.expand.as_deref());
    let listing = state
        .services
        .queries
        .list(ListOrders {
            role: query.role,
            party_id: query.id,
            status: query.status,
            page: query.page,
            limit: query.limit,
        })
        .await?;
    Ok(Json(ApiResponse::success(
        list_response(&state, listing, expand).await?,
    )))
}

/// Approved orders no deliveryman has accepted yet
#[utoipa::path(
    get,
    path = "/api/v1/orders/available",
    summary = "Orders available for delivery",
    params(AvailableOrdersQuery),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<OrderListResponse>),
        (status = 400, description = "Invalid query", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn list_available_orders(
    State(state): State<AppState>,
    query: Result<Query<AvailableOrdersQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<OrderListResponse>>, ServiceError> {
    let query = query_params(query)?;
    let expand = wants_parties(query.expand.as_deref());
    let queries = &state.services.queries;
    let page = queries.limits().resolve(query.page, query.limit)?;
    let listing = queries.available_for_delivery(page).await?;
    Ok(Json(ApiResponse::success(
        list_response(&state, listing, expand).await?,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_accepts_price_alias() {
        let request: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "sellerId": "s1",
            "farmerId": "f1",
            "item": "Carrots",
            "quantity": 10,
            "price": "500.50",
            "expireDate": "2099-01-31"
        }))
        .unwrap();
        assert_eq!(request.unit_price, Decimal::new(50050, 2));
        assert_eq!(
            request.expire_date,
            NaiveDate::from_ymd_opt(2099, 1, 31)
        );
    }

    #[test]
    fn expand_flag_is_a_list() {
        assert!(wants_parties(Some("notes, parties")));
        assert!(!wants_parties(Some("party")));
        assert!(!wants_parties(None));
    }
}
