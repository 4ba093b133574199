//! Integration tests for the reservation-subscription coordinator
//!
//! Exercises the three lifecycle entry points end to end against the shared
//! in-memory store, including the compensating release when reservation
//! persistence fails after quota was already held.

mod common;

use common::{active_subscription, seed_catalog, MemStore};
use groomdesk_core::models::{LinkState, ReservationStatus, VisitKind};
use groomdesk_core::AppError;
use groomdesk_services::{ReservationCoordinator, ReservationRequest, UsageLedger};
use std::sync::Arc;
use uuid::Uuid;

type TestCoordinator = ReservationCoordinator<MemStore, MemStore, MemStore, MemStore>;

fn coordinator(store: &MemStore) -> (Arc<UsageLedger<MemStore, MemStore>>, TestCoordinator) {
    let ledger = Arc::new(UsageLedger::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    ));
    let coordinator = ReservationCoordinator::new(
        ledger.clone(),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    );
    (ledger, coordinator)
}

#[tokio::test]
async fn create_with_subscription_reserves_classified_weight() {
    let store = MemStore::new();
    let (bath_id, groom_id) = seed_catalog(&store);
    let sub = active_subscription(10);
    let sub_id = sub.id;
    store.insert_subscription(sub);
    let (ledger, coordinator) = coordinator(&store);

    let created = coordinator
        .on_reservation_created(
            ReservationRequest {
                pet_id: Uuid::new_v4(),
                service_ids: vec![bath_id, groom_id],
                subscription_id: Some(sub_id),
            },
            "front-desk",
        )
        .await
        .unwrap();

    let mix = created.service_mix.unwrap();
    assert_eq!(mix.visit_kind, VisitKind::Mixed);
    assert_eq!(mix.deduction_weight, 5);

    let link_id = created.usage_link_id.unwrap();
    assert_eq!(created.reservation.usage_link_id, Some(link_id));
    assert_eq!(created.reservation.status, ReservationStatus::Scheduled);

    // Link id and reservation persisted together.
    let stored = store.reservation(created.reservation.id).unwrap();
    assert_eq!(stored.usage_link_id, Some(link_id));

    let usage = ledger.get_usage(sub_id).await.unwrap();
    assert_eq!(usage.reserved, 5);
    assert_eq!(usage.remaining, 5);
}

#[tokio::test]
async fn create_without_subscription_skips_the_ledger() {
    let store = MemStore::new();
    let (bath_id, _) = seed_catalog(&store);
    let (_, coordinator) = coordinator(&store);

    let created = coordinator
        .on_reservation_created(
            ReservationRequest {
                pet_id: Uuid::new_v4(),
                service_ids: vec![bath_id],
                subscription_id: None,
            },
            "front-desk",
        )
        .await
        .unwrap();

    assert!(created.usage_link_id.is_none());
    assert!(created.service_mix.is_none());
    assert!(store.links().is_empty());
}

#[tokio::test]
async fn create_with_empty_services_rejected() {
    let store = MemStore::new();
    let (_, coordinator) = coordinator(&store);

    let err = coordinator
        .on_reservation_created(
            ReservationRequest {
                pet_id: Uuid::new_v4(),
                service_ids: vec![],
                subscription_id: None,
            },
            "front-desk",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));
    assert_eq!(store.reservation_count(), 0);
}

#[tokio::test]
async fn create_with_unknown_service_rejected_before_reserving() {
    let store = MemStore::new();
    let sub = active_subscription(10);
    let sub_id = sub.id;
    store.insert_subscription(sub);
    let (ledger, coordinator) = coordinator(&store);

    let err = coordinator
        .on_reservation_created(
            ReservationRequest {
                pet_id: Uuid::new_v4(),
                service_ids: vec![Uuid::new_v4()],
                subscription_id: Some(sub_id),
            },
            "front-desk",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ServiceNotFound(_)));

    let usage = ledger.get_usage(sub_id).await.unwrap();
    assert_eq!(usage.reserved, 0);
}

#[tokio::test]
async fn failed_persistence_releases_reserved_quota() {
    let store = MemStore::new();
    let (_, groom_id) = seed_catalog(&store);
    let sub = active_subscription(10);
    let sub_id = sub.id;
    store.insert_subscription(sub);
    let (ledger, coordinator) = coordinator(&store);

    store.fail_next_reservation_create();

    let err = coordinator
        .on_reservation_created(
            ReservationRequest {
                pet_id: Uuid::new_v4(),
                service_ids: vec![groom_id],
                subscription_id: Some(sub_id),
            },
            "front-desk",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));

    // No reservation exists and no quota is left hanging.
    assert_eq!(store.reservation_count(), 0);
    let usage = ledger.get_usage(sub_id).await.unwrap();
    assert_eq!(usage.remaining, 10);
    assert_eq!(usage.reserved, 0);
    assert!(store
        .links()
        .iter()
        .all(|l| l.state == LinkState::Released));
}

#[tokio::test]
async fn cancel_releases_reserved_quota() {
    let store = MemStore::new();
    let (bath_id, _) = seed_catalog(&store);
    let sub = active_subscription(10);
    let sub_id = sub.id;
    store.insert_subscription(sub);
    let (ledger, coordinator) = coordinator(&store);

    let created = coordinator
        .on_reservation_created(
            ReservationRequest {
                pet_id: Uuid::new_v4(),
                service_ids: vec![bath_id],
                subscription_id: Some(sub_id),
            },
            "front-desk",
        )
        .await
        .unwrap();

    let cancelled = coordinator
        .on_reservation_cancelled(created.reservation.id, "front-desk")
        .await
        .unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);

    let usage = ledger.get_usage(sub_id).await.unwrap();
    assert_eq!(usage.remaining, 10);
    assert_eq!(
        ledger
            .get_link(created.usage_link_id.unwrap())
            .await
            .unwrap()
            .state,
        LinkState::Released
    );
}

#[tokio::test]
async fn cancel_with_confirmed_usage_rejected() {
    let store = MemStore::new();
    let (_, groom_id) = seed_catalog(&store);
    let sub = active_subscription(10);
    let sub_id = sub.id;
    store.insert_subscription(sub);
    let (ledger, coordinator) = coordinator(&store);

    let created = coordinator
        .on_reservation_created(
            ReservationRequest {
                pet_id: Uuid::new_v4(),
                service_ids: vec![groom_id],
                subscription_id: Some(sub_id),
            },
            "front-desk",
        )
        .await
        .unwrap();

    // Confirm at the ledger while the lifecycle record still says
    // scheduled - the window where completion crashed halfway.
    let link_id = created.usage_link_id.unwrap();
    ledger.confirm_usage(link_id, "groomer").await.unwrap();

    let err = coordinator
        .on_reservation_cancelled(created.reservation.id, "front-desk")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CannotCancelConfirmedUsage(_)));

    // Counters untouched by the failed cancellation.
    let usage = ledger.get_usage(sub_id).await.unwrap();
    assert_eq!(usage.used, 4);
    assert_eq!(usage.remaining, 6);
    assert_eq!(
        store.reservation(created.reservation.id).unwrap().status,
        ReservationStatus::Scheduled
    );
}

#[tokio::test]
async fn complete_confirms_held_quota() {
    let store = MemStore::new();
    let (_, groom_id) = seed_catalog(&store);
    let sub = active_subscription(10);
    let sub_id = sub.id;
    store.insert_subscription(sub);
    let (ledger, coordinator) = coordinator(&store);

    let created = coordinator
        .on_reservation_created(
            ReservationRequest {
                pet_id: Uuid::new_v4(),
                service_ids: vec![groom_id],
                subscription_id: Some(sub_id),
            },
            "front-desk",
        )
        .await
        .unwrap();

    let completed = coordinator
        .on_reservation_completed(created.reservation.id, "groomer")
        .await
        .unwrap();
    assert_eq!(completed.status, ReservationStatus::Completed);

    let usage = ledger.get_usage(sub_id).await.unwrap();
    assert_eq!(usage.used, 4);
    assert_eq!(usage.reserved, 0);
    assert_eq!(usage.remaining, 6);
}

#[tokio::test]
async fn complete_without_link_skips_confirmation() {
    let store = MemStore::new();
    let (bath_id, _) = seed_catalog(&store);
    let (_, coordinator) = coordinator(&store);

    let created = coordinator
        .on_reservation_created(
            ReservationRequest {
                pet_id: Uuid::new_v4(),
                service_ids: vec![bath_id],
                subscription_id: None,
            },
            "front-desk",
        )
        .await
        .unwrap();

    let completed = coordinator
        .on_reservation_completed(created.reservation.id, "groomer")
        .await
        .unwrap();
    assert_eq!(completed.status, ReservationStatus::Completed);
}

#[tokio::test]
async fn lifecycle_transitions_only_from_scheduled() {
    let store = MemStore::new();
    let (bath_id, _) = seed_catalog(&store);
    let (_, coordinator) = coordinator(&store);

    let created = coordinator
        .on_reservation_created(
            ReservationRequest {
                pet_id: Uuid::new_v4(),
                service_ids: vec![bath_id],
                subscription_id: None,
            },
            "front-desk",
        )
        .await
        .unwrap();
    let id = created.reservation.id;

    coordinator.on_reservation_cancelled(id, "desk").await.unwrap();

    let err = coordinator
        .on_reservation_cancelled(id, "desk")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let err = coordinator
        .on_reservation_completed(id, "groomer")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let err = coordinator
        .on_reservation_cancelled(Uuid::new_v4(), "desk")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ReservationNotFound(_)));
}

#[tokio::test]
async fn insufficient_quota_surfaces_and_persists_nothing() {
    let store = MemStore::new();
    let (_, groom_id) = seed_catalog(&store);
    let sub = active_subscription(3);
    let sub_id = sub.id;
    store.insert_subscription(sub);
    let (ledger, coordinator) = coordinator(&store);

    let err = coordinator
        .on_reservation_created(
            ReservationRequest {
                pet_id: Uuid::new_v4(),
                service_ids: vec![groom_id],
                subscription_id: Some(sub_id),
            },
            "front-desk",
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientQuota {
            required: 4,
            available: 3
        }
    ));

    assert_eq!(store.reservation_count(), 0);
    assert_eq!(ledger.get_usage(sub_id).await.unwrap().remaining, 3);
}
