//! In-memory order store.
//!
//! Backs tests and local development. Conditional writes run under the
//! map's shard lock, so concurrent compare-and-set calls on one order are
//! serialized the same way a single SQL `UPDATE` would be.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::{OrderFilter, OrderPage, OrderStore, PageRequest};
use crate::entities::order::Model as OrderModel;
use crate::errors::ServiceError;
use crate::services::order_state::{CasGuard, LifecyclePatch};

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: DashMap<Uuid, OrderModel>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: OrderModel) -> Result<OrderModel, ServiceError> {
        match self.orders.entry(order.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(ServiceError::Conflict(format!(
                "Order with ID {} already exists",
                order.id
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(order.clone());
                Ok(order)
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OrderModel>, ServiceError> {
        Ok(self.orders.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<OrderPage, ServiceError> {
        let mut matching: Vec<OrderModel> = self
            .orders
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();

        Ok(OrderPage { items, total })
    }

    async fn compare_and_set(
        &self,
        id: Uuid,
        guard: &CasGuard,
        patch: &LifecyclePatch,
    ) -> Result<Option<OrderModel>, ServiceError> {
        let Some(mut entry) = self.orders.get_mut(&id) else {
            return Ok(None);
        };
        if !guard.matches(entry.value()) {
            return Ok(None);
        }
        patch.apply_to(entry.value_mut());
        Ok(Some(entry.value().clone()))
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}
