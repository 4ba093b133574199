//! Unified error handling for GroomDesk
//!
//! This module provides a comprehensive error type that covers all possible
//! failure scenarios in the application, with automatic HTTP response mapping.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
/// It implements `ResponseError` for automatic HTTP response generation.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    // ==================== Quota Ledger Errors ====================
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("Usage link not found: {0}")]
    LinkNotFound(String),

    #[error("Subscription no longer active: {0}")]
    SubscriptionExpired(String),

    #[error("Insufficient quota: required {required}, available {available}")]
    InsufficientQuota { required: i32, available: i32 },

    #[error("Invalid usage state: {0}")]
    InvalidState(String),

    #[error("Cannot cancel confirmed usage: {0}")]
    CannotCancelConfirmedUsage(String),

    // ==================== Reservation Errors ====================
    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    #[error("Grooming service not found: {0}")]
    ServiceNotFound(String),

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    // ==================== Resource Errors ====================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_) | AppError::InvalidArgument(_) | AppError::MissingField(_) => {
                StatusCode::BAD_REQUEST
            }

            // 402 Payment Required - quota is prepaid capacity
            AppError::InsufficientQuota { .. } => StatusCode::PAYMENT_REQUIRED,

            // 403 Forbidden - the subscription can no longer be drawn on
            AppError::SubscriptionExpired(_) => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::SubscriptionNotFound(_)
            | AppError::LinkNotFound(_)
            | AppError::ReservationNotFound(_)
            | AppError::ServiceNotFound(_)
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::InvalidState(_)
            | AppError::CannotCancelConfirmedUsage(_)
            | AppError::Conflict(_)
            | AppError::AlreadyExists(_) => StatusCode::CONFLICT,

            // 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::SubscriptionNotFound(_) => "subscription_not_found",
            AppError::LinkNotFound(_) => "usage_link_not_found",
            AppError::SubscriptionExpired(_) => "subscription_expired",
            AppError::InsufficientQuota { .. } => "insufficient_quota",
            AppError::InvalidState(_) => "invalid_state",
            AppError::CannotCancelConfirmedUsage(_) => "cannot_cancel_confirmed_usage",
            AppError::ReservationNotFound(_) => "reservation_not_found",
            AppError::ServiceNotFound(_) => "service_not_found",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::MissingField(_) => "missing_field",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::AlreadyExists(_) => "already_exists",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}
