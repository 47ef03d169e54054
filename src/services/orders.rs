use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    entities::order::{DeliveryStatus, Model as OrderModel},
    errors::ServiceError,
    events::{EventSender, OrderEvent},
    repositories::OrderStore,
    services::order_state::{
        self, Decision, Lifecycle, Transition, TransitionRejection,
    },
};

/// Upper bound on load/evaluate/compare-and-set rounds for one request.
pub const MAX_CAS_ATTEMPTS: usize = 3;

fn validate_reference(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Reference must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Digits kept after the decimal point in stored amounts.
pub const AMOUNT_SCALE: u32 = 4;
/// Integer digits available to quantity and unit price columns.
const AMOUNT_INTEGER_DIGITS: u32 = 12;
/// Integer digits available to the total price column.
const TOTAL_INTEGER_DIGITS: u32 = 16;

fn digits_limit(integer_digits: u32) -> Decimal {
    Decimal::from_i128_with_scale(10i128.pow(integer_digits), 0)
}

fn validate_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("Amount must be greater than 0".into());
        return Err(err);
    }
    if *value >= digits_limit(AMOUNT_INTEGER_DIGITS) {
        let mut err = ValidationError::new("range");
        err.message = Some(format!("Amount must be below 10^{}", AMOUNT_INTEGER_DIGITS).into());
        return Err(err);
    }
    if value.normalize().scale() > AMOUNT_SCALE {
        let mut err = ValidationError::new("scale");
        err.message =
            Some(format!("Amount allows at most {} decimal places", AMOUNT_SCALE).into());
        return Err(err);
    }
    Ok(())
}

/// `quantity * unit_price`, rounded to the stored scale. Fails instead of
/// overflowing or exceeding the total column.
fn order_total(quantity: Decimal, unit_price: Decimal) -> Result<Decimal, ServiceError> {
    quantity
        .checked_mul(unit_price)
        .map(|total| total.round_dp(AMOUNT_SCALE))
        .filter(|total| *total < digits_limit(TOTAL_INTEGER_DIGITS))
        .ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "total price of {} x {} is too large",
                quantity, unit_price
            ))
        })
}

/// Seller's order submission.
#[derive(Debug, Clone, Validate)]
pub struct SubmitOrder {
    #[validate(custom = "validate_reference")]
    pub seller_id: String,
    #[validate(custom = "validate_reference")]
    pub farmer_id: String,
    #[validate(custom = "validate_reference")]
    pub item: String,
    #[validate(custom = "validate_amount")]
    pub quantity: Decimal,
    #[validate(custom = "validate_amount")]
    pub unit_price: Decimal,
    pub name: Option<String>,
    pub category: Option<String>,
    pub product_image: Option<String>,
    pub district: Option<String>,
    pub company: Option<String>,
    pub mobile: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    pub expire_date: Option<NaiveDate>,
    pub seller_note: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

struct Outcome {
    before: Lifecycle,
    order: OrderModel,
    applied: bool,
}

/// Order lifecycle operations: each one loads the order, evaluates the
/// transition against its current lifecycle and persists the result with a
/// compare-and-set on the fields that were read.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    event_sender: Option<EventSender>,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, event_sender: Option<EventSender>) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    async fn publish(&self, event: OrderEvent) {
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(event).await;
        }
    }

    #[instrument(skip(self, command), fields(seller_id = %command.seller_id, farmer_id = %command.farmer_id))]
    pub async fn submit_order(&self, command: SubmitOrder) -> Result<OrderModel, ServiceError> {
        command.validate()?;

        let now = Utc::now();
        if let Some(expire_date) = command.expire_date {
            if expire_date < now.date_naive() {
                return Err(ServiceError::ValidationError(format!(
                    "expireDate {} is in the past",
                    expire_date
                )));
            }
        }

        let total_price = order_total(command.quantity, command.unit_price)?;
        let lifecycle = Lifecycle::initial();
        let order = OrderModel {
            id: Uuid::new_v4(),
            item: command.item.trim().to_string(),
            name: non_blank(command.name),
            category: non_blank(command.category),
            product_image: non_blank(command.product_image),
            total_price,
            quantity: command.quantity,
            unit_price: command.unit_price,
            seller_id: command.seller_id.trim().to_string(),
            farmer_id: command.farmer_id.trim().to_string(),
            deliveryman_id: None,
            district: non_blank(command.district),
            company: non_blank(command.company),
            mobile: non_blank(command.mobile),
            email: non_blank(command.email),
            address: non_blank(command.address),
            expire_date: command.expire_date,
            status: lifecycle.status,
            accepted_by_deliveryman: lifecycle.accepted_by_deliveryman,
            delivery_status: lifecycle.delivery_status,
            seller_note: non_blank(command.seller_note),
            farmer_note: None,
            deliveryman_note: None,
            farmer_approval_date: None,
            delivery_accepted_date: None,
            delivery_completed_date: None,
            created_at: now,
            updated_at: now,
        };

        let order = self.store.insert(order).await?;
        counter!("farmlink.orders.submitted", 1);
        info!(order_id = %order.id, total_price = %order.total_price, "order submitted");

        self.publish(OrderEvent::Submitted {
            order_id: order.id,
            seller_id: order.seller_id.clone(),
            farmer_id: order.farmer_id.clone(),
        })
        .await;

        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderModel, ServiceError> {
        self.store
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| ServiceError::order_not_found(order_id))
    }

    /// Farmer approves or disapproves a pending order.
    #[instrument(skip(self, note), fields(order_id = %order_id, decision = %decision))]
    pub async fn decide(
        &self,
        order_id: Uuid,
        decision: Decision,
        note: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let note = non_blank(note);
        let outcome = self
            .transition(order_id, "decide", |current, now| {
                order_state::decide(current, decision, note.clone(), now)
            })
            .await?;

        if outcome.applied {
            info!(order_id = %order_id, status = %outcome.order.status, "order decided");
            self.publish(OrderEvent::Decided {
                order_id,
                status: outcome.order.status,
            })
            .await;
        }
        Ok(outcome.order)
    }

    /// Deliveryman claims an approved order.
    #[instrument(skip(self, note), fields(order_id = %order_id, deliveryman_id = %deliveryman_id))]
    pub async fn accept_delivery(
        &self,
        order_id: Uuid,
        deliveryman_id: &str,
        note: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let deliveryman_id = deliveryman_id.trim();
        if deliveryman_id.is_empty() {
            return Err(ServiceError::ValidationError(
                "deliverymanId is required".to_string(),
            ));
        }

        let note = non_blank(note);
        let outcome = self
            .transition(order_id, "accept_delivery", |current, now| {
                order_state::accept_delivery(current, deliveryman_id, note.clone(), now)
            })
            .await?;

        if outcome.applied {
            info!(order_id = %order_id, "delivery accepted");
            self.publish(OrderEvent::DeliveryAccepted {
                order_id,
                deliveryman_id: deliveryman_id.to_string(),
            })
            .await;
        }
        Ok(outcome.order)
    }

    /// Accepted deliveryman reports delivery progress.
    #[instrument(skip(self, note), fields(order_id = %order_id, delivery_status = %next))]
    pub async fn advance_delivery(
        &self,
        order_id: Uuid,
        next: DeliveryStatus,
        note: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let note = non_blank(note);
        let outcome = self
            .transition(order_id, "advance_delivery", |current, now| {
                order_state::advance_delivery(current, next, note.clone(), now)
            })
            .await?;

        if outcome.applied {
            info!(order_id = %order_id, from = %outcome.before.delivery_status, "delivery status changed");
            self.publish(OrderEvent::DeliveryStatusChanged {
                order_id,
                from: outcome.before.delivery_status,
                to: outcome.order.delivery_status,
            })
            .await;
        }
        Ok(outcome.order)
    }

    async fn transition<F>(
        &self,
        order_id: Uuid,
        kind: &'static str,
        evaluate: F,
    ) -> Result<Outcome, ServiceError>
    where
        F: Fn(&Lifecycle, DateTime<Utc>) -> Result<Transition, TransitionRejection>,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let order = self.get_order(order_id).await?;
            let before = Lifecycle::from(&order);

            let patch = match evaluate(&before, Utc::now()) {
                Ok(Transition::NoOp) => {
                    debug!(%order_id, transition = kind, "transition already applied");
                    return Ok(Outcome {
                        before,
                        order,
                        applied: false,
                    });
                }
                Ok(Transition::Apply(patch)) => patch,
                Err(rejection) => {
                    counter!("farmlink.orders.transitions.rejected", 1, "transition" => kind);
                    warn!(%order_id, transition = kind, reason = %rejection.reason, "transition rejected");
                    return Err(rejection.into());
                }
            };

            match self
                .store
                .compare_and_set(order_id, &before.guard(), &patch)
                .await?
            {
                Some(order) => {
                    counter!("farmlink.orders.transitions.applied", 1, "transition" => kind);
                    return Ok(Outcome {
                        before,
                        order,
                        applied: true,
                    });
                }
                None => {
                    counter!("farmlink.orders.cas_retries", 1, "transition" => kind);
                    debug!(%order_id, transition = kind, attempt, "order changed concurrently, re-evaluating");
                }
            }
        }

        warn!(%order_id, transition = kind, "compare-and-set attempts exhausted");
        let latest = self.get_order(order_id).await?;
        Err(ServiceError::ConcurrentUpdate {
            order_id,
            current: Box::new(Lifecycle::from(&latest)),
        })
    }
}
