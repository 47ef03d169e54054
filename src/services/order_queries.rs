//! Read-only order views for each role.
//!
//! Every view is ordered newest first and paginated. Party references stay
//! opaque unless the caller explicitly asks for them to be expanded.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::entities::order::{DeliveryStatus, Model as OrderModel, OrderStatus};
use crate::errors::ServiceError;
use crate::repositories::{OrderFilter, OrderStore, PageRequest};
use crate::services::parties::{PartyDirectory, PartyProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OrderRole {
    Seller,
    Farmer,
    Deliveryman,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 100,
        }
    }
}

impl PageLimits {
    /// Resolves optional query values. Oversized limits are clamped; zero
    /// pages or limits are rejected.
    pub fn resolve(&self, page: Option<u64>, limit: Option<u64>) -> Result<PageRequest, ServiceError> {
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(ServiceError::BadRequest("page must be at least 1".into()));
        }
        let limit = limit.unwrap_or(self.default_page_size);
        if limit == 0 {
            return Err(ServiceError::BadRequest("limit must be at least 1".into()));
        }
        let request = PageRequest {
            page,
            limit: limit.min(self.max_page_size),
        };
        let within_store_range = (page - 1)
            .checked_mul(request.limit)
            .is_some_and(|offset| offset <= i64::MAX as u64);
        if !within_store_range {
            return Err(ServiceError::BadRequest(format!("page {} is out of range", page)));
        }
        Ok(request)
    }
}

#[derive(Debug, Clone)]
pub struct OrderListing {
    pub items: Vec<OrderModel>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// Unparsed listing query as it arrives from the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct ListOrders {
    pub role: Option<String>,
    pub party_id: Option<String>,
    pub status: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Clone)]
pub struct OrderQueryService {
    store: Arc<dyn OrderStore>,
    parties: Arc<dyn PartyDirectory>,
    limits: PageLimits,
}

fn parse_status<T: FromStr>(value: Option<&str>, what: &str) -> Result<Option<T>, ServiceError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ServiceError::BadRequest(format!("unknown {} '{}'", what, raw))),
    }
}

fn party_id(value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::BadRequest("party id must not be blank".into()));
    }
    Ok(trimmed.to_string())
}

impl OrderQueryService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        parties: Arc<dyn PartyDirectory>,
        limits: PageLimits,
    ) -> Self {
        Self {
            store,
            parties,
            limits,
        }
    }

    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    async fn run(&self, filter: OrderFilter, page: PageRequest) -> Result<OrderListing, ServiceError> {
        let result = self.store.find(&filter, page).await?;
        Ok(OrderListing {
            items: result.items,
            total: result.total,
            page: page.page,
            limit: page.limit,
        })
    }

    #[instrument(skip(self))]
    pub async fn by_id(&self, order_id: Uuid) -> Result<OrderModel, ServiceError> {
        self.store
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| ServiceError::order_not_found(order_id))
    }

    #[instrument(skip(self))]
    pub async fn by_seller(
        &self,
        seller_id: &str,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<OrderListing, ServiceError> {
        let filter = OrderFilter {
            seller_id: Some(party_id(seller_id)?),
            status,
            ..Default::default()
        };
        self.run(filter, page).await
    }

    #[instrument(skip(self))]
    pub async fn by_farmer(
        &self,
        farmer_id: &str,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<OrderListing, ServiceError> {
        let filter = OrderFilter {
            farmer_id: Some(party_id(farmer_id)?),
            status,
            ..Default::default()
        };
        self.run(filter, page).await
    }

    #[instrument(skip(self))]
    pub async fn by_deliveryman(
        &self,
        deliveryman_id: &str,
        delivery_status: Option<DeliveryStatus>,
        page: PageRequest,
    ) -> Result<OrderListing, ServiceError> {
        let filter = OrderFilter {
            deliveryman_id: Some(party_id(deliveryman_id)?),
            delivery_status,
            ..Default::default()
        };
        self.run(filter, page).await
    }

    /// Approved orders no deliveryman has claimed yet.
    #[instrument(skip(self))]
    pub async fn available_for_delivery(
        &self,
        page: PageRequest,
    ) -> Result<OrderListing, ServiceError> {
        let filter = OrderFilter {
            status: Some(OrderStatus::Approved),
            accepted_by_deliveryman: Some(false),
            ..Default::default()
        };
        self.run(filter, page).await
    }

    #[instrument(skip(self))]
    pub async fn all(
        &self,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<OrderListing, ServiceError> {
        let filter = OrderFilter {
            status,
            ..Default::default()
        };
        self.run(filter, page).await
    }

    /// Dispatches a raw listing query to the matching view. The `status`
    /// value is a delivery status for the deliveryman view and an order
    /// status everywhere else.
    pub async fn list(&self, query: ListOrders) -> Result<OrderListing, ServiceError> {
        let page = self.limits.resolve(query.page, query.limit)?;
        let status = query.status.as_deref();

        let Some(role) = query.role.as_deref().filter(|r| !r.trim().is_empty()) else {
            return self.all(parse_status(status, "status")?, page).await;
        };
        let role = OrderRole::from_str(role.trim())
            .map_err(|_| ServiceError::BadRequest(format!("unknown role '{}'", role)))?;
        let id = query
            .party_id
            .as_deref()
            .ok_or_else(|| ServiceError::BadRequest(format!("role={} requires an id", role)))?;

        match role {
            OrderRole::Seller => {
                self.by_seller(id, parse_status(status, "status")?, page)
                    .await
            }
            OrderRole::Farmer => {
                self.by_farmer(id, parse_status(status, "status")?, page)
                    .await
            }
            OrderRole::Deliveryman => {
                self.by_deliveryman(id, parse_status(status, "delivery status")?, page)
                    .await
            }
        }
    }

    /// Resolves every seller, farmer and deliveryman referenced by `orders`.
    pub async fn expand_parties(
        &self,
        orders: &[OrderModel],
    ) -> Result<HashMap<String, PartyProfile>, ServiceError> {
        let ids: BTreeSet<String> = orders
            .iter()
            .flat_map(|order| {
                [
                    Some(order.seller_id.clone()),
                    Some(order.farmer_id.clone()),
                    order.deliveryman_id.clone(),
                ]
            })
            .flatten()
            .collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<String> = ids.into_iter().collect();
        self.parties.lookup(&ids).await
    }
}
