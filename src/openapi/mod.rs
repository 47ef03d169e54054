use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::order::{DeliveryStatus, OrderStatus};
use crate::errors::ErrorResponse;
use crate::handlers::{health, orders};
use crate::services::{order_state::{Decision, Lifecycle}, parties::PartyProfile};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FarmLink API",
        version = "1.0.0",
        description = r#"
# FarmLink order API

Sellers submit produce orders to farmers. Farmers approve or disapprove
them, and deliverymen claim approved orders and report delivery progress.

## Conflicts

A request that cannot be applied to the order's current lifecycle is
answered with `409 Conflict`. The error body carries the order's current
lifecycle in `current`, so clients can reconcile without another read.
Repeating a request that already took effect returns `200` with the
unchanged order.

## Pagination

List endpoints accept `page` (default 1) and `limit` (default 50, max 100)
and return orders newest first.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    paths(
        orders::create_order,
        orders::get_order,
        orders::decide_order,
        orders::accept_delivery,
        orders::update_delivery_status,
        orders::list_orders,
        orders::list_available_orders,
        health::health_check,
    ),
    components(schemas(
        orders::CreateOrderRequest,
        orders::DecisionRequest,
        orders::AcceptDeliveryRequest,
        orders::DeliveryStatusRequest,
        orders::OrderResponse,
        orders::OrderListResponse,
        health::HealthResponse,
        health::ComponentStatus,
        OrderStatus,
        DeliveryStatus,
        Decision,
        Lifecycle,
        PartyProfile,
        ErrorResponse,
    )),
    tags(
        (name = "orders", description = "Order lifecycle and role views"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDocV1::openapi())
}
