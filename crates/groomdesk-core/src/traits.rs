//! Common traits for repositories and services
//!
//! Defines abstractions for database access and the collaborator seams the
//! quota ledger depends on.

use crate::error::AppError;
use crate::models::{
    GroomingService, Reservation, ReservationStatus, Subscription, TaggedService, UsageLink,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Generic repository trait for CRUD operations
#[async_trait]
pub trait Repository<T, ID>: Send + Sync {
    /// Find entity by ID
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, AppError>;

    /// Find all entities with pagination
    async fn find_all(&self, limit: i64, offset: i64) -> Result<Vec<T>, AppError>;

    /// Count total entities
    async fn count(&self) -> Result<i64, AppError>;

    /// Create a new entity
    async fn create(&self, entity: &T) -> Result<T, AppError>;

    /// Update an existing entity
    async fn update(&self, entity: &T) -> Result<T, AppError>;

    /// Delete entity by ID
    async fn delete(&self, id: ID) -> Result<bool, AppError>;
}

/// Subscription repository trait with the atomic quota commit
#[async_trait]
pub trait SubscriptionRepository: Repository<Subscription, Uuid> {
    /// Find subscriptions belonging to a pet
    async fn find_by_pet(&self, pet_id: Uuid) -> Result<Vec<Subscription>, AppError>;

    /// Atomically persist a counter change together with its usage link
    ///
    /// The write only applies when the stored version still equals
    /// `expected_version`; the stored version is bumped by one on success.
    /// Counter columns, the refreshed status, and the link row (inserted or
    /// settled, when present) land in one transaction. Returns `false` when
    /// the version check lost against a concurrent writer — the caller
    /// re-reads and re-validates.
    async fn commit_usage(
        &self,
        subscription: &Subscription,
        link: Option<&UsageLink>,
        expected_version: i32,
    ) -> Result<bool, AppError>;

    /// Sweep stored statuses: stamp Expired past the window and Exhausted at
    /// zero remaining; Cancelled rows are never touched
    ///
    /// Returns the number of rows whose status changed.
    async fn sweep_statuses(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

/// Usage link repository trait
#[async_trait]
pub trait UsageLinkRepository: Repository<UsageLink, Uuid> {
    /// Find the link created for a reservation, if any
    async fn find_by_reservation(&self, reservation_id: Uuid)
        -> Result<Option<UsageLink>, AppError>;

    /// Find links drawn on a subscription
    async fn find_by_subscription(&self, subscription_id: Uuid)
        -> Result<Vec<UsageLink>, AppError>;

    /// Find Reserved links whose reservation record does not exist
    ///
    /// These are the leftovers of a crash between reserving quota and
    /// persisting the reservation; the reconciliation sweep releases them.
    async fn find_orphaned(&self) -> Result<Vec<UsageLink>, AppError>;
}

/// Reservation lifecycle record store (collaborator seam)
#[async_trait]
pub trait ReservationStore: Repository<Reservation, Uuid> {
    /// Find reservations for a pet
    async fn find_by_pet(&self, pet_id: Uuid) -> Result<Vec<Reservation>, AppError>;

    /// Advance the reservation status
    async fn update_status(
        &self,
        id: Uuid,
        status: ReservationStatus,
        actor: &str,
    ) -> Result<Reservation, AppError>;
}

/// Service catalog lookup (collaborator seam)
///
/// Resolves requested service ids to their bath/groom tags; how services and
/// prices are stored is not the ledger's concern.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Resolve each id to its tag; unknown or inactive ids are an error
    async fn tags_for(&self, service_ids: &[Uuid]) -> Result<Vec<TaggedService>, AppError>;
}

/// Catalog repository trait
#[async_trait]
pub trait ServiceRepository: Repository<GroomingService, Uuid> + ServiceCatalog {}

/// Pagination parameters
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 1000),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };

        Self {
            total,
            page,
            per_page,
            total_pages,
        }
    }
}
