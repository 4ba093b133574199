//! GroomDesk Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the GroomDesk salon backend. It includes:
//!
//! - Domain models (Subscription, UsageLink, Reservation, service catalog)
//! - Common traits for repositories and collaborator seams
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
