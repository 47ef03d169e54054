use std::sync::Arc;

use crate::services::{order_queries::OrderQueryService, orders::OrderService};

pub mod common;
pub mod health;
pub mod orders;

/// Services shared by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub queries: Arc<OrderQueryService>,
}
