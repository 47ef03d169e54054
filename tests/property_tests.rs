use std::sync::Arc;

use farmlink_api::{
    entities::order::{DeliveryStatus, OrderStatus},
    errors::ServiceError,
    repositories::InMemoryOrderStore,
    services::{
        order_state::Decision,
        orders::{OrderService, SubmitOrder},
    },
};
use proptest::prelude::*;
use rust_decimal::Decimal;

#[derive(Clone, Debug)]
enum Op {
    Decide(Decision),
    Accept(u8),
    Advance(DeliveryStatus),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop_oneof![Just(Decision::Approved), Just(Decision::Disapproved)].prop_map(Op::Decide),
        (0u8..3).prop_map(Op::Accept),
        prop_oneof![
            Just(DeliveryStatus::Pending),
            Just(DeliveryStatus::InTransit),
            Just(DeliveryStatus::Delivered),
            Just(DeliveryStatus::NotDelivered),
        ]
        .prop_map(Op::Advance),
    ]
}

fn submission(quantity: u32, price_cents: u32) -> SubmitOrder {
    SubmitOrder {
        seller_id: "seller".into(),
        farmer_id: "farmer".into(),
        item: "Mangoes".into(),
        quantity: Decimal::from(quantity),
        unit_price: Decimal::new(price_cents as i64, 2),
        name: None,
        category: None,
        product_image: None,
        district: None,
        company: None,
        mobile: None,
        email: None,
        address: None,
        expire_date: None,
        seller_note: None,
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn lifecycle_invariants_hold_for_any_sequence(
        quantity in 1u32..1000,
        price_cents in 1u32..100_000,
        ops in prop::collection::vec(op_strategy(), 1..24),
    ) {
        runtime().block_on(async {
            let service = OrderService::new(Arc::new(InMemoryOrderStore::new()), None);
            let order = service.submit_order(submission(quantity, price_cents)).await.unwrap();
            prop_assert_eq!(order.total_price, order.quantity * order.unit_price);

            let mut first_decision: Option<OrderStatus> = None;
            let mut first_acceptor: Option<String> = None;
            let mut completed_at = None;

            for op in ops {
                let before = service.get_order(order.id).await.unwrap();
                let result = match &op {
                    Op::Decide(decision) => service.decide(order.id, *decision, None).await,
                    Op::Accept(n) => service.accept_delivery(order.id, &format!("dm-{n}"), None).await,
                    Op::Advance(next) => service.advance_delivery(order.id, *next, None).await,
                };
                let after = service.get_order(order.id).await.unwrap();

                match result {
                    Ok(_) => {}
                    Err(ServiceError::InvalidTransition(rejection)) => {
                        // A rejection never writes and reports what is stored.
                        prop_assert_eq!(&before, &after);
                        prop_assert_eq!(rejection.current.status, after.status);
                    }
                    Err(other) => prop_assert!(false, "unexpected error {other}"),
                }

                if before.status == OrderStatus::Pending && after.status != OrderStatus::Pending {
                    prop_assert!(first_decision.is_none());
                    first_decision = Some(after.status);
                    prop_assert!(after.farmer_approval_date.is_some());
                }
                if let Some(decided) = first_decision {
                    prop_assert_eq!(after.status, decided);
                }

                if after.accepted_by_deliveryman {
                    prop_assert_eq!(after.status, OrderStatus::Approved);
                    let acceptor = first_acceptor.get_or_insert_with(|| {
                        after.deliveryman_id.clone().unwrap_or_default()
                    });
                    prop_assert_eq!(after.deliveryman_id.as_deref(), Some(acceptor.as_str()));
                } else {
                    prop_assert_eq!(after.delivery_status, DeliveryStatus::Pending);
                }

                if after.delivery_status == DeliveryStatus::Delivered {
                    let stamp = completed_at.get_or_insert(after.delivery_completed_date);
                    prop_assert!(stamp.is_some());
                    prop_assert_eq!(*stamp, after.delivery_completed_date);
                } else {
                    prop_assert!(after.delivery_completed_date.is_none());
                }
            }
            Ok(())
        })?;
    }
}
