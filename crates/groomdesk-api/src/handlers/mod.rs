//! HTTP handlers for the GroomDesk API

pub mod reservation;
pub mod service;
pub mod subscription;

pub use reservation::configure as configure_reservations;
pub use service::configure as configure_services;
pub use subscription::configure as configure_subscriptions;

use actix_web::HttpRequest;
use groomdesk_core::AppError;
use groomdesk_db::{
    PgReservationRepository, PgServiceRepository, PgSubscriptionRepository, PgUsageLinkRepository,
};
use groomdesk_services::{ReservationCoordinator, UsageLedger};
use sqlx::PgPool;
use std::sync::Arc;

/// Header carrying the acting user's identity
///
/// Authentication itself lives in front of this service; every mutating
/// call still records who acted, so the identity is required here.
pub const ACTING_USER_HEADER: &str = "X-Acting-User";

pub(crate) type PgLedger = UsageLedger<PgSubscriptionRepository, PgUsageLinkRepository>;
pub(crate) type PgCoordinator = ReservationCoordinator<
    PgSubscriptionRepository,
    PgUsageLinkRepository,
    PgServiceRepository,
    PgReservationRepository,
>;

/// Extract the acting user from the request headers
pub(crate) fn acting_user(req: &HttpRequest) -> Result<String, AppError> {
    req.headers()
        .get(ACTING_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| AppError::MissingField(format!("{} header", ACTING_USER_HEADER)))
}

/// Build the ledger over PostgreSQL repositories
pub(crate) fn build_ledger(pool: &PgPool) -> Arc<PgLedger> {
    Arc::new(UsageLedger::new(
        Arc::new(PgSubscriptionRepository::new(pool.clone())),
        Arc::new(PgUsageLinkRepository::new(pool.clone())),
    ))
}

/// Build the coordinator over PostgreSQL repositories
pub(crate) fn build_coordinator(pool: &PgPool) -> PgCoordinator {
    ReservationCoordinator::new(
        build_ledger(pool),
        Arc::new(PgServiceRepository::new(pool.clone())),
        Arc::new(PgReservationRepository::new(pool.clone())),
    )
}
