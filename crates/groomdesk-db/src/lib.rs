//! GroomDesk Database Layer
//!
//! This crate provides PostgreSQL database access and repository implementations
//! for the GroomDesk system. It includes:
//!
//! - Connection pool management with sqlx
//! - Repository implementations for subscriptions, usage links, reservations
//!   and the grooming service catalog
//! - The versioned quota commit used by the subscription ledger

pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_pool_from_config};
pub use repositories::*;

// Re-export commonly used types
pub use groomdesk_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
