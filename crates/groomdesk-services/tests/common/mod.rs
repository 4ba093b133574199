//! Shared in-memory store for service integration tests
//!
//! Implements the core repository traits over a single mutex-guarded table
//! set, which gives `commit_usage` the same atomicity the PostgreSQL
//! implementation gets from its transaction + version check.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use groomdesk_core::{
    models::{
        GroomingService, LinkState, Reservation, ReservationStatus, ServiceTag, Subscription,
        SubscriptionStatus, TaggedService, UsageLink,
    },
    traits::{
        Repository, ReservationStore, ServiceCatalog, SubscriptionRepository, UsageLinkRepository,
    },
    AppError, AppResult,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    subscriptions: HashMap<Uuid, Subscription>,
    links: HashMap<Uuid, UsageLink>,
    reservations: HashMap<Uuid, Reservation>,
    services: HashMap<Uuid, GroomingService>,
    fail_next_reservation_create: bool,
}

/// In-memory implementation of every storage trait the services need
#[derive(Clone, Default)]
pub struct MemStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_subscription(&self, subscription: Subscription) {
        self.tables
            .lock()
            .unwrap()
            .subscriptions
            .insert(subscription.id, subscription);
    }

    pub fn insert_service(&self, service: GroomingService) {
        self.tables
            .lock()
            .unwrap()
            .services
            .insert(service.id, service);
    }

    /// Make the next reservation create fail, to exercise compensation
    pub fn fail_next_reservation_create(&self) {
        self.tables.lock().unwrap().fail_next_reservation_create = true;
    }

    pub fn subscription(&self, id: Uuid) -> Subscription {
        self.tables.lock().unwrap().subscriptions[&id].clone()
    }

    pub fn links(&self) -> Vec<UsageLink> {
        self.tables.lock().unwrap().links.values().cloned().collect()
    }

    pub fn reservation(&self, id: Uuid) -> Option<Reservation> {
        self.tables.lock().unwrap().reservations.get(&id).cloned()
    }

    pub fn reservation_count(&self) -> usize {
        self.tables.lock().unwrap().reservations.len()
    }
}

// ==================== Subscriptions ====================

#[async_trait]
impl Repository<Subscription, Uuid> for MemStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self.tables.lock().unwrap().subscriptions.get(&id).cloned())
    }

    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Subscription>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .subscriptions
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables.lock().unwrap().subscriptions.len() as i64)
    }

    async fn create(&self, entity: &Subscription) -> AppResult<Subscription> {
        self.insert_subscription(entity.clone());
        Ok(entity.clone())
    }

    async fn update(&self, entity: &Subscription) -> AppResult<Subscription> {
        self.insert_subscription(entity.clone());
        Ok(entity.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .subscriptions
            .remove(&id)
            .is_some())
    }
}

#[async_trait]
impl SubscriptionRepository for MemStore {
    async fn find_by_pet(&self, pet_id: Uuid) -> AppResult<Vec<Subscription>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .subscriptions
            .values()
            .filter(|s| s.pet_id == pet_id)
            .cloned()
            .collect())
    }

    async fn commit_usage(
        &self,
        subscription: &Subscription,
        link: Option<&UsageLink>,
        expected_version: i32,
    ) -> AppResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        let stored = tables
            .subscriptions
            .get_mut(&subscription.id)
            .ok_or_else(|| AppError::SubscriptionNotFound(subscription.id.to_string()))?;

        if stored.version != expected_version {
            return Ok(false);
        }

        let mut updated = subscription.clone();
        updated.version = expected_version + 1;
        *stored = updated;

        if let Some(link) = link {
            tables.links.insert(link.id, link.clone());
        }

        Ok(true)
    }

    async fn sweep_statuses(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut tables = self.tables.lock().unwrap();
        let mut swept = 0;
        for sub in tables.subscriptions.values_mut() {
            if sub.status == SubscriptionStatus::Cancelled {
                continue;
            }
            let derived = sub.derived_status(now);
            if derived != sub.status
                && matches!(
                    derived,
                    SubscriptionStatus::Expired | SubscriptionStatus::Exhausted
                )
            {
                sub.status = derived;
                sub.updated_at = now;
                swept += 1;
            }
        }
        Ok(swept)
    }
}

// ==================== Usage links ====================

#[async_trait]
impl Repository<UsageLink, Uuid> for MemStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<UsageLink>> {
        Ok(self.tables.lock().unwrap().links.get(&id).cloned())
    }

    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<UsageLink>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .links
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables.lock().unwrap().links.len() as i64)
    }

    async fn create(&self, entity: &UsageLink) -> AppResult<UsageLink> {
        self.tables
            .lock()
            .unwrap()
            .links
            .insert(entity.id, entity.clone());
        Ok(entity.clone())
    }

    async fn update(&self, entity: &UsageLink) -> AppResult<UsageLink> {
        self.tables
            .lock()
            .unwrap()
            .links
            .insert(entity.id, entity.clone());
        Ok(entity.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.tables.lock().unwrap().links.remove(&id).is_some())
    }
}

#[async_trait]
impl UsageLinkRepository for MemStore {
    async fn find_by_reservation(&self, reservation_id: Uuid) -> AppResult<Option<UsageLink>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .links
            .values()
            .find(|l| l.reservation_id == reservation_id)
            .cloned())
    }

    async fn find_by_subscription(&self, subscription_id: Uuid) -> AppResult<Vec<UsageLink>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .links
            .values()
            .filter(|l| l.subscription_id == subscription_id)
            .cloned()
            .collect())
    }

    async fn find_orphaned(&self) -> AppResult<Vec<UsageLink>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .links
            .values()
            .filter(|l| {
                l.state == LinkState::Reserved
                    && !tables
                        .reservations
                        .values()
                        .any(|r| r.usage_link_id == Some(l.id))
            })
            .cloned()
            .collect())
    }
}

// ==================== Reservations ====================

#[async_trait]
impl Repository<Reservation, Uuid> for MemStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        Ok(self.tables.lock().unwrap().reservations.get(&id).cloned())
    }

    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Reservation>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .reservations
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables.lock().unwrap().reservations.len() as i64)
    }

    async fn create(&self, entity: &Reservation) -> AppResult<Reservation> {
        let mut tables = self.tables.lock().unwrap();
        if tables.fail_next_reservation_create {
            tables.fail_next_reservation_create = false;
            return Err(AppError::Database("simulated write failure".to_string()));
        }
        tables.reservations.insert(entity.id, entity.clone());
        Ok(entity.clone())
    }

    async fn update(&self, entity: &Reservation) -> AppResult<Reservation> {
        self.tables
            .lock()
            .unwrap()
            .reservations
            .insert(entity.id, entity.clone());
        Ok(entity.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .reservations
            .remove(&id)
            .is_some())
    }
}

#[async_trait]
impl ReservationStore for MemStore {
    async fn find_by_pet(&self, pet_id: Uuid) -> AppResult<Vec<Reservation>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .reservations
            .values()
            .filter(|r| r.pet_id == pet_id)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: ReservationStatus,
        _actor: &str,
    ) -> AppResult<Reservation> {
        let mut tables = self.tables.lock().unwrap();
        let reservation = tables
            .reservations
            .get_mut(&id)
            .ok_or_else(|| AppError::ReservationNotFound(id.to_string()))?;
        reservation.status = status;
        reservation.updated_at = Utc::now();
        Ok(reservation.clone())
    }
}

// ==================== Service catalog ====================

#[async_trait]
impl ServiceCatalog for MemStore {
    async fn tags_for(&self, service_ids: &[Uuid]) -> AppResult<Vec<TaggedService>> {
        let tables = self.tables.lock().unwrap();
        service_ids
            .iter()
            .map(|id| {
                tables
                    .services
                    .get(id)
                    .filter(|s| s.active)
                    .map(|s| TaggedService { id: *id, tag: s.tag })
                    .ok_or_else(|| AppError::ServiceNotFound(id.to_string()))
            })
            .collect()
    }
}

// ==================== Builders ====================

/// Subscription valid from yesterday for 30 days
pub fn active_subscription(limit: i32) -> Subscription {
    let now = Utc::now();
    Subscription::new(
        Uuid::new_v4(),
        now - Duration::days(1),
        now + Duration::days(30),
        limit,
        "test-desk",
    )
}

/// Subscription whose window closed yesterday
pub fn expired_subscription(limit: i32) -> Subscription {
    let now = Utc::now();
    Subscription::new(
        Uuid::new_v4(),
        now - Duration::days(60),
        now - Duration::days(1),
        limit,
        "test-desk",
    )
}

/// Seed a bath and a groom service, returning their ids
pub fn seed_catalog(store: &MemStore) -> (Uuid, Uuid) {
    let bath = GroomingService::new("Basic bath", ServiceTag::Bath);
    let groom = GroomingService::new("Full groom", ServiceTag::Groom);
    let ids = (bath.id, groom.id);
    store.insert_service(bath);
    store.insert_service(groom);
    ids
}
