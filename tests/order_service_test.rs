mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use farmlink_api::{
    entities::order::{DeliveryStatus, OrderStatus},
    errors::ServiceError,
    repositories::{InMemoryOrderStore, OrderStore},
    services::{
        order_state::{Decision, RejectionReason},
        orders::{OrderService, SubmitOrder},
    },
};
use rstest::rstest;
use rust_decimal_macros::dec;

#[derive(Clone, Copy, Debug)]
enum Backend {
    Memory,
    Sqlite,
}

async fn store(backend: Backend) -> Arc<dyn OrderStore> {
    match backend {
        Backend::Memory => Arc::new(InMemoryOrderStore::new()),
        Backend::Sqlite => common::sqlite_store().await,
    }
}

fn submission(seller_id: &str, farmer_id: &str) -> SubmitOrder {
    SubmitOrder {
        seller_id: seller_id.into(),
        farmer_id: farmer_id.into(),
        item: "Green chillies".into(),
        quantity: dec!(10),
        unit_price: dec!(500),
        name: None,
        category: Some("vegetable".into()),
        product_image: None,
        district: Some("Dambulla".into()),
        company: None,
        mobile: None,
        email: None,
        address: None,
        expire_date: None,
        seller_note: None,
    }
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn full_lifecycle(#[case] backend: Backend) {
    let service = OrderService::new(store(backend).await, None);

    let order = service
        .submit_order(submission("seller-1", "farmer-1"))
        .await
        .unwrap();
    assert_eq!(order.total_price, dec!(5000));

    let order = service
        .decide(order.id, Decision::Approved, Some("ready friday".into()))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Approved);
    assert_eq!(order.farmer_note.as_deref(), Some("ready friday"));

    let order = service.accept_delivery(order.id, "dm-1", None).await.unwrap();
    assert!(order.accepted_by_deliveryman);

    let order = service
        .advance_delivery(order.id, DeliveryStatus::InTransit, None)
        .await
        .unwrap();
    let order = service
        .advance_delivery(order.id, DeliveryStatus::Delivered, Some("left at gate".into()))
        .await
        .unwrap();
    assert_eq!(order.delivery_status, DeliveryStatus::Delivered);
    assert!(order.delivery_completed_date.is_some());
    assert_eq!(order.deliveryman_note.as_deref(), Some("left at gate"));
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn rejected_transitions_carry_current_state(#[case] backend: Backend) {
    let service = OrderService::new(store(backend).await, None);
    let order = service
        .submit_order(submission("seller-1", "farmer-1"))
        .await
        .unwrap();

    let err = service
        .accept_delivery(order.id, "dm-1", None)
        .await
        .unwrap_err();
    assert_matches!(
        &err,
        ServiceError::InvalidTransition(rejection)
            if rejection.reason == RejectionReason::NotApproved
                && rejection.current.status == OrderStatus::Pending
    );

    service
        .decide(order.id, Decision::Disapproved, None)
        .await
        .unwrap();
    let err = service
        .decide(order.id, Decision::Approved, None)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::InvalidTransition(rejection)
            if rejection.current.status == OrderStatus::Disapproved
    );
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn concurrent_accepts_have_one_winner(#[case] backend: Backend) {
    let service = Arc::new(OrderService::new(store(backend).await, None));
    let order = service
        .submit_order(submission("seller-1", "farmer-1"))
        .await
        .unwrap();
    service
        .decide(order.id, Decision::Approved, None)
        .await
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .accept_delivery(order.id, &format!("dm-{n}"), None)
                    .await
            })
        })
        .collect();

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(order) => winners.push(order.deliveryman_id.clone()),
            Err(ServiceError::InvalidTransition(rejection)) => {
                assert_eq!(rejection.reason, RejectionReason::AcceptedByAnother)
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners.len(), 1);

    let stored = service.get_order(order.id).await.unwrap();
    assert_eq!(stored.deliveryman_id, winners[0]);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn concurrent_conflicting_decisions_keep_the_first(#[case] backend: Backend) {
    let service = Arc::new(OrderService::new(store(backend).await, None));
    let order = service
        .submit_order(submission("seller-1", "farmer-1"))
        .await
        .unwrap();

    let approve = {
        let service = service.clone();
        tokio::spawn(async move { service.decide(order.id, Decision::Approved, None).await })
    };
    let disapprove = {
        let service = service.clone();
        tokio::spawn(async move { service.decide(order.id, Decision::Disapproved, None).await })
    };
    let results = [approve.await.unwrap(), disapprove.await.unwrap()];

    let successes: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(successes.len(), 1);
    let stored = service.get_order(order.id).await.unwrap();
    assert_eq!(stored.status, successes[0].status);
}
