//! Subscription model
//!
//! A subscription is a prepaid block of quota units tied to one pet, valid
//! inside a date window. Quota moves through three buckets: available,
//! reserved (held by an open reservation) and confirmed (permanently spent).
//! All counter math lives here so the storage layer only persists what the
//! model already validated.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Subscription status
///
/// Derived from the validity window and the counters, never set directly,
/// with one exception: explicit cancellation, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Inside the validity window with quota left
    #[default]
    Active,
    /// Validity window has passed
    Expired,
    /// Every unit is reserved or confirmed
    Exhausted,
    /// Explicitly cancelled; never recomputed back
    Cancelled,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionStatus::Active => write!(f, "active"),
            SubscriptionStatus::Expired => write!(f, "expired"),
            SubscriptionStatus::Exhausted => write!(f, "exhausted"),
            SubscriptionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl SubscriptionStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(SubscriptionStatus::Active),
            "expired" => Some(SubscriptionStatus::Expired),
            "exhausted" => Some(SubscriptionStatus::Exhausted),
            "cancelled" => Some(SubscriptionStatus::Cancelled),
            _ => None,
        }
    }

    /// Check if new reservations may draw on the subscription
    pub fn accepts_reservations(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

/// Subscription entity
///
/// Counters are only ever mutated through the `apply_*` methods; the
/// `version` stamp backs the optimistic-concurrency commit in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier
    pub id: Uuid,

    /// Pet the quota belongs to
    pub pet_id: Uuid,

    /// First day of the validity window (inclusive)
    pub starts_on: DateTime<Utc>,

    /// Last day of the validity window (inclusive)
    pub ends_on: DateTime<Utc>,

    /// Quota units purchased
    pub total_usage_limit: i32,

    /// Units held by open reservations
    pub reserved_count: i32,

    /// Units permanently spent
    pub confirmed_count: i32,

    /// Stored status, refreshed on every ledger write and by the sweep
    pub status: SubscriptionStatus,

    /// Optimistic concurrency stamp, bumped on every counter commit
    pub version: i32,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Who purchased the subscription
    pub created_by: Option<String>,

    /// Who touched it last
    pub updated_by: Option<String>,
}

impl Subscription {
    /// Create a new subscription at purchase time
    pub fn new(
        pet_id: Uuid,
        starts_on: DateTime<Utc>,
        ends_on: DateTime<Utc>,
        total_usage_limit: i32,
        created_by: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            pet_id,
            starts_on,
            ends_on,
            total_usage_limit,
            reserved_count: 0,
            confirmed_count: 0,
            status: SubscriptionStatus::Active,
            version: 0,
            created_at: now,
            updated_at: now,
            created_by: Some(created_by.to_string()),
            updated_by: None,
        }
    }

    /// Units still available for new reservations
    #[inline]
    pub fn remaining_usage(&self) -> i32 {
        self.total_usage_limit - self.confirmed_count - self.reserved_count
    }

    /// Check whether `now` falls inside the validity window
    #[inline]
    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        now >= self.starts_on && now <= self.ends_on
    }

    /// Recompute the status from dates and counters
    ///
    /// Cancellation is sticky. Exhausted reverts to Active when a release
    /// frees units, since it is purely a function of the counters.
    pub fn derived_status(&self, now: DateTime<Utc>) -> SubscriptionStatus {
        if self.status == SubscriptionStatus::Cancelled {
            return SubscriptionStatus::Cancelled;
        }
        if now > self.ends_on {
            return SubscriptionStatus::Expired;
        }
        if self.remaining_usage() == 0 {
            return SubscriptionStatus::Exhausted;
        }
        SubscriptionStatus::Active
    }

    /// Validate that `count` units could be reserved right now
    ///
    /// Checks run in rejection-priority order: argument, window/cancellation,
    /// then capacity. Nothing is mutated.
    pub fn availability(&self, count: i32, now: DateTime<Utc>) -> Result<(), AppError> {
        if count <= 0 {
            return Err(AppError::InvalidArgument(format!(
                "reservation weight must be positive, got {}",
                count
            )));
        }
        if self.status == SubscriptionStatus::Cancelled {
            return Err(AppError::SubscriptionExpired(format!(
                "subscription {} is cancelled",
                self.id
            )));
        }
        if !self.in_window(now) {
            return Err(AppError::SubscriptionExpired(format!(
                "subscription {} validity window {} .. {} does not contain the current date",
                self.id,
                self.starts_on.date_naive(),
                self.ends_on.date_naive()
            )));
        }
        let available = self.remaining_usage();
        if available < count {
            return Err(AppError::InsufficientQuota {
                required: count,
                available,
            });
        }
        Ok(())
    }

    /// Hold `count` units for an open reservation
    ///
    /// Fails before mutating anything; the capacity invariant
    /// `reserved + confirmed <= total` holds on both sides of the call.
    pub fn apply_reserve(
        &mut self,
        count: i32,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<(), AppError> {
        self.availability(count, now)?;
        self.reserved_count += count;
        self.touch(now, actor);
        Ok(())
    }

    /// Return `weight` held units to the available pool
    pub fn apply_release(
        &mut self,
        weight: i32,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<(), AppError> {
        if weight <= 0 || weight > self.reserved_count {
            return Err(AppError::InvalidState(format!(
                "cannot release {} units from subscription {} holding {}",
                weight, self.id, self.reserved_count
            )));
        }
        self.reserved_count -= weight;
        self.touch(now, actor);
        Ok(())
    }

    /// Convert `weight` held units into permanently spent units
    pub fn apply_confirm(
        &mut self,
        weight: i32,
        now: DateTime<Utc>,
        actor: &str,
    ) -> Result<(), AppError> {
        if weight <= 0 || weight > self.reserved_count {
            return Err(AppError::InvalidState(format!(
                "cannot confirm {} units on subscription {} holding {}",
                weight, self.id, self.reserved_count
            )));
        }
        self.reserved_count -= weight;
        self.confirmed_count += weight;
        self.touch(now, actor);
        Ok(())
    }

    /// Explicitly cancel the subscription
    ///
    /// Confirmed usage stays on record for reporting; only new reservations
    /// are shut off. A second cancel is rejected.
    pub fn cancel(&mut self, now: DateTime<Utc>, actor: &str) -> Result<(), AppError> {
        if self.status == SubscriptionStatus::Cancelled {
            return Err(AppError::InvalidState(format!(
                "subscription {} is already cancelled",
                self.id
            )));
        }
        self.status = SubscriptionStatus::Cancelled;
        self.updated_at = now;
        self.updated_by = Some(actor.to_string());
        Ok(())
    }

    /// Build the read-only usage summary for reporting
    ///
    /// `used` counts confirmed units only; reserved-but-unconfirmed visits
    /// are not "used" yet.
    pub fn usage_summary(&self, now: DateTime<Utc>) -> UsageSummary {
        UsageSummary {
            subscription_id: self.id,
            pet_id: self.pet_id,
            used: self.confirmed_count,
            reserved: self.reserved_count,
            remaining: self.remaining_usage(),
            total_usage_limit: self.total_usage_limit,
            status: self.derived_status(now),
            starts_on: self.starts_on,
            ends_on: self.ends_on,
        }
    }

    fn touch(&mut self, now: DateTime<Utc>, actor: &str) {
        self.status = self.derived_status(now);
        self.updated_at = now;
        self.updated_by = Some(actor.to_string());
    }
}

/// Read-only usage summary for one subscription
#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    pub subscription_id: Uuid,
    pub pet_id: Uuid,
    pub used: i32,
    pub reserved: i32,
    pub remaining: i32,
    pub total_usage_limit: i32,
    pub status: SubscriptionStatus,
    pub starts_on: DateTime<Utc>,
    pub ends_on: DateTime<Utc>,
}
