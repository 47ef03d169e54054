use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use tracing::debug;
use uuid::Uuid;

use super::{OrderFilter, OrderPage, OrderStore, PageRequest};
use crate::entities::order::{
    ActiveModel as OrderActiveModel, Column, Entity as Order, Model as OrderModel,
};
use crate::errors::ServiceError;
use crate::services::order_state::{CasGuard, LifecyclePatch, RoleNote};

/// SQL-backed order store.
#[derive(Clone, Debug)]
pub struct SeaOrmOrderStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmOrderStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn condition(filter: &OrderFilter) -> Condition {
        let mut condition = Condition::all();
        if let Some(seller_id) = &filter.seller_id {
            condition = condition.add(Column::SellerId.eq(seller_id.as_str()));
        }
        if let Some(farmer_id) = &filter.farmer_id {
            condition = condition.add(Column::FarmerId.eq(farmer_id.as_str()));
        }
        if let Some(deliveryman_id) = &filter.deliveryman_id {
            condition = condition.add(Column::DeliverymanId.eq(deliveryman_id.as_str()));
        }
        if let Some(status) = filter.status {
            condition = condition.add(Column::Status.eq(status));
        }
        if let Some(accepted) = filter.accepted_by_deliveryman {
            condition = condition.add(Column::AcceptedByDeliveryman.eq(accepted));
        }
        if let Some(delivery_status) = filter.delivery_status {
            condition = condition.add(Column::DeliveryStatus.eq(delivery_status));
        }
        condition
    }

    fn patch_active_model(patch: &LifecyclePatch) -> OrderActiveModel {
        let mut active = OrderActiveModel {
            updated_at: Set(patch.updated_at),
            ..Default::default()
        };
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(accepted) = patch.accepted_by_deliveryman {
            active.accepted_by_deliveryman = Set(accepted);
        }
        if let Some(deliveryman_id) = &patch.deliveryman_id {
            active.deliveryman_id = Set(Some(deliveryman_id.clone()));
        }
        if let Some(delivery_status) = patch.delivery_status {
            active.delivery_status = Set(delivery_status);
        }
        if let Some(at) = patch.farmer_approval_date {
            active.farmer_approval_date = Set(Some(at));
        }
        if let Some(at) = patch.delivery_accepted_date {
            active.delivery_accepted_date = Set(Some(at));
        }
        if let Some(at) = patch.delivery_completed_date {
            active.delivery_completed_date = Set(Some(at));
        }
        match &patch.note {
            Some(RoleNote::Seller(note)) => active.seller_note = Set(Some(note.clone())),
            Some(RoleNote::Farmer(note)) => active.farmer_note = Set(Some(note.clone())),
            Some(RoleNote::Deliveryman(note)) => {
                active.deliveryman_note = Set(Some(note.clone()))
            }
            None => {}
        }
        active
    }
}

#[async_trait]
impl OrderStore for SeaOrmOrderStore {
    async fn insert(&self, order: OrderModel) -> Result<OrderModel, ServiceError> {
        let active: OrderActiveModel = order.into_active_model();
        Ok(active.insert(self.db.as_ref()).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OrderModel>, ServiceError> {
        Ok(Order::find_by_id(id).one(self.db.as_ref()).await?)
    }

    async fn find(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<OrderPage, ServiceError> {
        let query = Order::find().filter(Self::condition(filter));
        let total = query.clone().count(self.db.as_ref()).await?;

        let items = query
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .offset(page.offset())
            .limit(page.limit)
            .all(self.db.as_ref())
            .await?;

        Ok(OrderPage { items, total })
    }

    async fn compare_and_set(
        &self,
        id: Uuid,
        guard: &CasGuard,
        patch: &LifecyclePatch,
    ) -> Result<Option<OrderModel>, ServiceError> {
        let result = Order::update_many()
            .set(Self::patch_active_model(patch))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(guard.status))
            .filter(Column::AcceptedByDeliveryman.eq(guard.accepted_by_deliveryman))
            .filter(Column::DeliveryStatus.eq(guard.delivery_status))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            debug!(order_id = %id, "compare-and-set guard missed");
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    async fn ping(&self) -> Result<(), ServiceError> {
        Ok(self.db.ping().await?)
    }
}
