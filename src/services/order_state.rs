//! Order lifecycle state machine.
//!
//! Every transition is a pure function of the order's current [`Lifecycle`]
//! and the transition time. It either leaves the order untouched
//! ([`Transition::NoOp`]), describes the fields to write
//! ([`Transition::Apply`]), or names why the request is rejected
//! ([`TransitionRejection`]). Persisting the result is the caller's job; the
//! snapshot the decision was made on doubles as the compare-and-set guard.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::order::{self, DeliveryStatus, OrderStatus};

/// The farmer's verdict on a pending order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Decision {
    Approved,
    Disapproved,
}

impl From<Decision> for OrderStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => OrderStatus::Approved,
            Decision::Disapproved => OrderStatus::Disapproved,
        }
    }
}

/// Lifecycle fields of an order: everything transitions read or write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lifecycle {
    pub status: OrderStatus,
    pub accepted_by_deliveryman: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deliveryman_id: Option<String>,
    pub delivery_status: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farmer_approval_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_accepted_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_completed_date: Option<DateTime<Utc>>,
}

impl Lifecycle {
    /// Lifecycle of a freshly submitted order.
    pub fn initial() -> Self {
        Self {
            status: OrderStatus::Pending,
            accepted_by_deliveryman: false,
            deliveryman_id: None,
            delivery_status: DeliveryStatus::Pending,
            farmer_approval_date: None,
            delivery_accepted_date: None,
            delivery_completed_date: None,
        }
    }

    pub fn guard(&self) -> CasGuard {
        CasGuard {
            status: self.status,
            accepted_by_deliveryman: self.accepted_by_deliveryman,
            delivery_status: self.delivery_status,
        }
    }
}

impl From<&order::Model> for Lifecycle {
    fn from(model: &order::Model) -> Self {
        Self {
            status: model.status,
            accepted_by_deliveryman: model.accepted_by_deliveryman,
            deliveryman_id: model.deliveryman_id.clone(),
            delivery_status: model.delivery_status,
            farmer_approval_date: model.farmer_approval_date,
            delivery_accepted_date: model.delivery_accepted_date,
            delivery_completed_date: model.delivery_completed_date,
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status={}, acceptedByDeliveryman={}",
            self.status, self.accepted_by_deliveryman
        )?;
        if let Some(deliveryman_id) = &self.deliveryman_id {
            write!(f, ", deliverymanId={}", deliveryman_id)?;
        }
        write!(f, ", deliveryStatus={}", self.delivery_status)
    }
}

/// Expected values of the guarded fields. A conditional write succeeds only
/// while the stored order still carries exactly these values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CasGuard {
    pub status: OrderStatus,
    pub accepted_by_deliveryman: bool,
    pub delivery_status: DeliveryStatus,
}

impl CasGuard {
    pub fn matches(&self, model: &order::Model) -> bool {
        model.status == self.status
            && model.accepted_by_deliveryman == self.accepted_by_deliveryman
            && model.delivery_status == self.delivery_status
    }
}

/// Free-text note left by the acting role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleNote {
    Seller(String),
    Farmer(String),
    Deliveryman(String),
}

/// Fields written by an applied transition. `None` leaves a field untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LifecyclePatch {
    pub status: Option<OrderStatus>,
    pub accepted_by_deliveryman: Option<bool>,
    pub deliveryman_id: Option<String>,
    pub delivery_status: Option<DeliveryStatus>,
    pub farmer_approval_date: Option<DateTime<Utc>>,
    pub delivery_accepted_date: Option<DateTime<Utc>>,
    pub delivery_completed_date: Option<DateTime<Utc>>,
    pub note: Option<RoleNote>,
    pub updated_at: DateTime<Utc>,
}

impl LifecyclePatch {
    fn at(now: DateTime<Utc>) -> Self {
        Self {
            status: None,
            accepted_by_deliveryman: None,
            deliveryman_id: None,
            delivery_status: None,
            farmer_approval_date: None,
            delivery_accepted_date: None,
            delivery_completed_date: None,
            note: None,
            updated_at: now,
        }
    }

    pub fn apply_to(&self, model: &mut order::Model) {
        if let Some(status) = self.status {
            model.status = status;
        }
        if let Some(accepted) = self.accepted_by_deliveryman {
            model.accepted_by_deliveryman = accepted;
        }
        if let Some(deliveryman_id) = &self.deliveryman_id {
            model.deliveryman_id = Some(deliveryman_id.clone());
        }
        if let Some(delivery_status) = self.delivery_status {
            model.delivery_status = delivery_status;
        }
        if self.farmer_approval_date.is_some() {
            model.farmer_approval_date = self.farmer_approval_date;
        }
        if self.delivery_accepted_date.is_some() {
            model.delivery_accepted_date = self.delivery_accepted_date;
        }
        if self.delivery_completed_date.is_some() {
            model.delivery_completed_date = self.delivery_completed_date;
        }
        match &self.note {
            Some(RoleNote::Seller(note)) => model.seller_note = Some(note.clone()),
            Some(RoleNote::Farmer(note)) => model.farmer_note = Some(note.clone()),
            Some(RoleNote::Deliveryman(note)) => model.deliveryman_note = Some(note.clone()),
            None => {}
        }
        model.updated_at = self.updated_at;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The requested state already holds; nothing is written or re-stamped.
    NoOp,
    Apply(LifecyclePatch),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestedTransition {
    Decide(Decision),
    AcceptDelivery { deliveryman_id: String },
    AdvanceDelivery(DeliveryStatus),
}

impl fmt::Display for RequestedTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decide(decision) => write!(f, "mark order {}", decision),
            Self::AcceptDelivery { deliveryman_id } => {
                write!(f, "accept delivery for {}", deliveryman_id)
            }
            Self::AdvanceDelivery(status) => write!(f, "move delivery to {}", status),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum RejectionReason {
    #[strum(to_string = "order has already been decided")]
    AlreadyDecided,
    #[strum(to_string = "order is not approved")]
    NotApproved,
    #[strum(to_string = "order is already accepted by another deliveryman")]
    AcceptedByAnother,
    #[strum(to_string = "delivery has not been accepted")]
    NotAccepted,
    #[strum(to_string = "delivery cannot move backwards or skip a step")]
    DeliveryStepNotAllowed,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cannot {requested}: {reason} ({current})")]
pub struct TransitionRejection {
    pub requested: RequestedTransition,
    pub reason: RejectionReason,
    pub current: Lifecycle,
}

fn reject(
    current: &Lifecycle,
    requested: RequestedTransition,
    reason: RejectionReason,
) -> Result<Transition, TransitionRejection> {
    Err(TransitionRejection {
        requested,
        reason,
        current: current.clone(),
    })
}

/// Farmer approves or disapproves a pending order.
pub fn decide(
    current: &Lifecycle,
    decision: Decision,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionRejection> {
    let target = OrderStatus::from(decision);
    match current.status {
        OrderStatus::Pending => {
            let mut patch = LifecyclePatch::at(now);
            patch.status = Some(target);
            if current.farmer_approval_date.is_none() {
                patch.farmer_approval_date = Some(now);
            }
            patch.note = note.map(RoleNote::Farmer);
            Ok(Transition::Apply(patch))
        }
        status if status == target => Ok(Transition::NoOp),
        _ => reject(
            current,
            RequestedTransition::Decide(decision),
            RejectionReason::AlreadyDecided,
        ),
    }
}

/// Deliveryman claims an approved, unclaimed order.
pub fn accept_delivery(
    current: &Lifecycle,
    deliveryman_id: &str,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionRejection> {
    let requested = || RequestedTransition::AcceptDelivery {
        deliveryman_id: deliveryman_id.to_string(),
    };

    if current.status != OrderStatus::Approved {
        return reject(current, requested(), RejectionReason::NotApproved);
    }
    if current.accepted_by_deliveryman {
        if current.deliveryman_id.as_deref() == Some(deliveryman_id) {
            return Ok(Transition::NoOp);
        }
        return reject(current, requested(), RejectionReason::AcceptedByAnother);
    }

    let mut patch = LifecyclePatch::at(now);
    patch.accepted_by_deliveryman = Some(true);
    patch.deliveryman_id = Some(deliveryman_id.to_string());
    if current.delivery_accepted_date.is_none() {
        patch.delivery_accepted_date = Some(now);
    }
    patch.note = note.map(RoleNote::Deliveryman);
    Ok(Transition::Apply(patch))
}

/// Whether the delivery sub-machine may step from `from` to `to`.
///
/// `not-delivered -> in-transit` covers a second delivery attempt.
pub fn delivery_step_allowed(from: DeliveryStatus, to: DeliveryStatus) -> bool {
    use DeliveryStatus::*;
    matches!(
        (from, to),
        (Pending, InTransit)
            | (InTransit, Delivered)
            | (InTransit, NotDelivered)
            | (NotDelivered, InTransit)
    )
}

/// Accepted deliveryman reports delivery progress.
pub fn advance_delivery(
    current: &Lifecycle,
    next: DeliveryStatus,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionRejection> {
    if !current.accepted_by_deliveryman {
        return reject(
            current,
            RequestedTransition::AdvanceDelivery(next),
            RejectionReason::NotAccepted,
        );
    }
    if current.delivery_status == next {
        return Ok(Transition::NoOp);
    }
    if !delivery_step_allowed(current.delivery_status, next) {
        return reject(
            current,
            RequestedTransition::AdvanceDelivery(next),
            RejectionReason::DeliveryStepNotAllowed,
        );
    }

    let mut patch = LifecyclePatch::at(now);
    patch.delivery_status = Some(next);
    if next == DeliveryStatus::Delivered && current.delivery_completed_date.is_none() {
        patch.delivery_completed_date = Some(now);
    }
    patch.note = note.map(RoleNote::Deliveryman);
    Ok(Transition::Apply(patch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn applied(result: Result<Transition, TransitionRejection>) -> LifecyclePatch {
        match result {
            Ok(Transition::Apply(patch)) => patch,
            other => panic!("expected an applied transition, got {other:?}"),
        }
    }

    fn approved() -> Lifecycle {
        Lifecycle {
            status: OrderStatus::Approved,
            farmer_approval_date: Some(Utc::now() - Duration::minutes(5)),
            ..Lifecycle::initial()
        }
    }

    fn accepted_by(deliveryman_id: &str) -> Lifecycle {
        Lifecycle {
            accepted_by_deliveryman: true,
            deliveryman_id: Some(deliveryman_id.to_string()),
            delivery_accepted_date: Some(Utc::now() - Duration::minutes(1)),
            ..approved()
        }
    }

    #[test]
    fn pending_order_can_be_approved_once() {
        let now = Utc::now();
        let patch = applied(decide(
            &Lifecycle::initial(),
            Decision::Approved,
            Some("fresh stock tomorrow".into()),
            now,
        ));
        assert_eq!(patch.status, Some(OrderStatus::Approved));
        assert_eq!(patch.farmer_approval_date, Some(now));
        assert_eq!(
            patch.note,
            Some(RoleNote::Farmer("fresh stock tomorrow".into()))
        );
    }

    #[test]
    fn repeating_the_same_decision_is_a_no_op() {
        let result = decide(&approved(), Decision::Approved, None, Utc::now());
        assert_eq!(result, Ok(Transition::NoOp));
    }

    #[test]
    fn conflicting_decision_is_rejected_with_current_state() {
        let current = approved();
        let rejection = decide(&current, Decision::Disapproved, None, Utc::now()).unwrap_err();
        assert_eq!(rejection.reason, RejectionReason::AlreadyDecided);
        assert_eq!(rejection.current, current);
        let message = rejection.to_string();
        assert!(message.contains("mark order disapproved"), "{message}");
        assert!(message.contains("status=approved"), "{message}");
    }

    #[test]
    fn acceptance_requires_approval() {
        for status in [OrderStatus::Pending, OrderStatus::Disapproved] {
            let current = Lifecycle {
                status,
                ..Lifecycle::initial()
            };
            let rejection = accept_delivery(&current, "dm-1", None, Utc::now()).unwrap_err();
            assert_eq!(rejection.reason, RejectionReason::NotApproved);
        }
    }

    #[test]
    fn acceptance_stamps_date_and_assigns_deliveryman() {
        let now = Utc::now();
        let patch = applied(accept_delivery(&approved(), "dm-1", None, now));
        assert_eq!(patch.accepted_by_deliveryman, Some(true));
        assert_eq!(patch.deliveryman_id.as_deref(), Some("dm-1"));
        assert_eq!(patch.delivery_accepted_date, Some(now));
        assert_eq!(patch.status, None);
    }

    #[test]
    fn second_acceptance_depends_on_who_asks() {
        let current = accepted_by("dm-1");
        assert_eq!(
            accept_delivery(&current, "dm-1", None, Utc::now()),
            Ok(Transition::NoOp)
        );
        let rejection = accept_delivery(&current, "dm-2", None, Utc::now()).unwrap_err();
        assert_eq!(rejection.reason, RejectionReason::AcceptedByAnother);
        assert_eq!(rejection.current.deliveryman_id.as_deref(), Some("dm-1"));
    }

    #[test]
    fn delivery_cannot_advance_before_acceptance() {
        let rejection =
            advance_delivery(&approved(), DeliveryStatus::InTransit, None, Utc::now())
                .unwrap_err();
        assert_eq!(rejection.reason, RejectionReason::NotAccepted);
    }

    #[test]
    fn delivered_stamps_completion_once() {
        let now = Utc::now();
        let in_transit = Lifecycle {
            delivery_status: DeliveryStatus::InTransit,
            ..accepted_by("dm-1")
        };
        let patch = applied(advance_delivery(
            &in_transit,
            DeliveryStatus::Delivered,
            None,
            now,
        ));
        assert_eq!(patch.delivery_completed_date, Some(now));

        let mut model_lifecycle = in_transit.clone();
        model_lifecycle.delivery_status = DeliveryStatus::Delivered;
        model_lifecycle.delivery_completed_date = Some(now);
        assert_eq!(
            advance_delivery(
                &model_lifecycle,
                DeliveryStatus::Delivered,
                None,
                now + Duration::hours(1)
            ),
            Ok(Transition::NoOp)
        );
    }

    #[test]
    fn delivery_steps_follow_the_route() {
        use DeliveryStatus::*;
        assert!(delivery_step_allowed(Pending, InTransit));
        assert!(delivery_step_allowed(InTransit, NotDelivered));
        assert!(delivery_step_allowed(NotDelivered, InTransit));
        assert!(!delivery_step_allowed(Pending, Delivered));
        assert!(!delivery_step_allowed(Delivered, InTransit));
        assert!(!delivery_step_allowed(InTransit, Pending));

        let current = accepted_by("dm-1");
        assert_matches!(
            advance_delivery(&current, Delivered, None, Utc::now()),
            Err(TransitionRejection {
                reason: RejectionReason::DeliveryStepNotAllowed,
                ..
            })
        );
    }

    #[test]
    fn patch_writes_only_touched_fields() {
        let now = Utc::now();
        let mut model = crate::repositories::tests_support::sample_order("seller-1", "farmer-1");
        model.status = OrderStatus::Approved;
        let patch = applied(accept_delivery(
            &Lifecycle::from(&model),
            "dm-9",
            Some("pickup at 6am".into()),
            now,
        ));
        patch.apply_to(&mut model);

        assert_eq!(model.status, OrderStatus::Approved);
        assert!(model.accepted_by_deliveryman);
        assert_eq!(model.deliveryman_id.as_deref(), Some("dm-9"));
        assert_eq!(model.deliveryman_note.as_deref(), Some("pickup at 6am"));
        assert_eq!(model.farmer_note, None);
        assert_eq!(model.delivery_accepted_date, Some(now));
        assert_eq!(model.updated_at, now);
    }
}
