//! Business logic services for GroomDesk
//!
//! This crate contains the quota accounting engine that sits between the
//! HTTP layer and storage:
//!
//! # Architecture
//!
//! Services are designed to be composable and testable:
//! - Each service owns its dependencies through the core repository traits
//! - Services are wrapped in Arc for safe sharing across async tasks
//! - All operations are instrumented with tracing
//! - Comprehensive error handling with AppError
//!
//! # Services
//!
//! - `service_mix::classify` - Pure bath/groom classifier and weight rule
//! - `UsageLedger` - Sole authority over subscription quota counters
//! - `ReservationCoordinator` - Sequences ledger calls with the reservation
//!   lifecycle and compensates on partial failure

pub mod coordinator;
pub mod service_mix;
pub mod usage_ledger;

pub use coordinator::{CreatedReservation, ReservationCoordinator, ReservationRequest};
pub use service_mix::classify;
pub use usage_ledger::UsageLedger;

/// Business logic constants
pub mod constants {
    /// Quota units one bath-class service deducts
    pub const BATH_UNIT_WEIGHT: i32 = 1;

    /// Quota units one groom-class service deducts
    ///
    /// A groom visit costs the same quota as four bath visits.
    pub const GROOM_UNIT_WEIGHT: i32 = 4;

    /// Attempts for the optimistic-concurrency commit loop
    pub const MAX_COMMIT_RETRIES: u32 = 3;

    /// Validity window applied when a purchase omits an end date, in days
    pub const DEFAULT_VALIDITY_DAYS: i64 = 90;
}
