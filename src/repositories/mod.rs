use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::order::{DeliveryStatus, Model as OrderModel, OrderStatus};
use crate::errors::ServiceError;
use crate::services::order_state::{CasGuard, LifecyclePatch};

pub mod memory_store;
pub mod sea_orm_store;

pub use memory_store::InMemoryOrderStore;
pub use sea_orm_store::SeaOrmOrderStore;

/// Equality filters over the indexed order fields. Unset fields match anything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub seller_id: Option<String>,
    pub farmer_id: Option<String>,
    pub deliveryman_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub accepted_by_deliveryman: Option<bool>,
    pub delivery_status: Option<DeliveryStatus>,
}

impl OrderFilter {
    pub fn matches(&self, order: &OrderModel) -> bool {
        fn eq<T: PartialEq>(expected: &Option<T>, actual: &T) -> bool {
            expected.as_ref().map_or(true, |value| value == actual)
        }

        eq(&self.seller_id, &order.seller_id)
            && eq(&self.farmer_id, &order.farmer_id)
            && self
                .deliveryman_id
                .as_ref()
                .map_or(true, |id| order.deliveryman_id.as_ref() == Some(id))
            && eq(&self.status, &order.status)
            && eq(&self.accepted_by_deliveryman, &order.accepted_by_deliveryman)
            && eq(&self.delivery_status, &order.delivery_status)
    }
}

/// One-based page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

#[derive(Clone, Debug, Default)]
pub struct OrderPage {
    pub items: Vec<OrderModel>,
    pub total: u64,
}

/// Persistence seam for orders.
///
/// Listing is ordered newest first (`created_at` desc, then `id` desc).
/// `compare_and_set` writes the patch only while the stored order still
/// matches the guard, and returns the updated order, or `None` when the
/// guard missed or the order is gone.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: OrderModel) -> Result<OrderModel, ServiceError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OrderModel>, ServiceError>;

    async fn find(&self, filter: &OrderFilter, page: PageRequest)
        -> Result<OrderPage, ServiceError>;

    async fn compare_and_set(
        &self,
        id: Uuid,
        guard: &CasGuard,
        patch: &LifecyclePatch,
    ) -> Result<Option<OrderModel>, ServiceError>;

    async fn ping(&self) -> Result<(), ServiceError>;
}
