//! Usage link model
//!
//! A usage link ties one reservation to one subscription and records how
//! many quota units the visit holds. The link lifecycle:
//! 1. Created when the reservation requests subscription payment (Reserved)
//! 2. Settled exactly once: Confirmed at visit completion, or Released on
//!    cancellation / compensation
//!
//! A settled link never transitions again; a repeated settle attempt is an
//! error so coordinator bugs surface instead of double-spending quota.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Usage link state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// Units are held, visit not yet performed
    #[default]
    Reserved,
    /// Units permanently spent at visit completion
    Confirmed,
    /// Units returned to the pool without being spent
    Released,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Reserved => write!(f, "reserved"),
            LinkState::Confirmed => write!(f, "confirmed"),
            LinkState::Released => write!(f, "released"),
        }
    }
}

impl LinkState {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "reserved" => Some(LinkState::Reserved),
            "confirmed" => Some(LinkState::Confirmed),
            "released" => Some(LinkState::Released),
            _ => None,
        }
    }

    /// Check if the link still holds units
    pub fn is_holding(&self) -> bool {
        matches!(self, LinkState::Reserved)
    }

    /// Check if the link reached a terminal state
    pub fn is_settled(&self) -> bool {
        !self.is_holding()
    }
}

/// Reservation usage link entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLink {
    /// Unique identifier
    pub id: Uuid,

    /// Subscription the units are drawn from
    pub subscription_id: Uuid,

    /// Reservation the units are held for
    pub reservation_id: Uuid,

    /// Units reserved/confirmed for this visit
    pub weight: i32,

    /// Current state
    pub state: LinkState,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// When confirmation occurred
    pub confirmed_at: Option<DateTime<Utc>>,

    /// When release occurred
    pub released_at: Option<DateTime<Utc>>,

    /// Who created this link
    pub created_by: Option<String>,
}

impl UsageLink {
    /// Create a new link in Reserved state
    pub fn new(subscription_id: Uuid, reservation_id: Uuid, weight: i32, created_by: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            subscription_id,
            reservation_id,
            weight,
            state: LinkState::Reserved,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            released_at: None,
            created_by: Some(created_by.to_string()),
        }
    }

    /// Settle the link as confirmed
    pub fn mark_confirmed(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.state.is_settled() {
            return Err(AppError::InvalidState(format!(
                "usage link {} is already {}",
                self.id, self.state
            )));
        }
        self.state = LinkState::Confirmed;
        self.confirmed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Settle the link as released
    pub fn mark_released(&mut self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.state.is_settled() {
            return Err(AppError::InvalidState(format!(
                "usage link {} is already {}",
                self.id, self.state
            )));
        }
        self.state = LinkState::Released;
        self.released_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}
