//! API layer for GroomDesk
//!
//! HTTP API handlers for subscriptions, reservations, and the grooming
//! service catalog.

#![forbid(unsafe_code)]

pub mod dto;
pub mod handlers;

// Re-export DTOs (common types)
pub use dto::{ApiResponse, PaginationParams};

// Re-export handler configuration functions
pub use handlers::{configure_reservations, configure_services, configure_subscriptions};
