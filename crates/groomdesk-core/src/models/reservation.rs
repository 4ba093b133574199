//! Reservation model
//!
//! Minimal lifecycle record for a salon visit. The interesting accounting
//! lives in the subscription ledger; the reservation only carries the link
//! id so both are persisted together, which is what lets the coordinator
//! tell whether a quota transition already ran for a given reservation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Booked, visit not yet performed
    #[default]
    Scheduled,
    /// Cancelled before the visit
    Cancelled,
    /// Visit performed
    Completed,
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationStatus::Scheduled => write!(f, "scheduled"),
            ReservationStatus::Cancelled => write!(f, "cancelled"),
            ReservationStatus::Completed => write!(f, "completed"),
        }
    }
}

impl ReservationStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "scheduled" => Some(ReservationStatus::Scheduled),
            "cancelled" => Some(ReservationStatus::Cancelled),
            "completed" => Some(ReservationStatus::Completed),
            _ => None,
        }
    }

    /// Check if lifecycle transitions are still possible
    pub fn is_open(&self) -> bool {
        matches!(self, ReservationStatus::Scheduled)
    }
}

/// Reservation entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique identifier
    pub id: Uuid,

    /// Pet the visit is for
    pub pet_id: Uuid,

    /// Requested catalog services
    pub service_ids: Vec<Uuid>,

    /// Subscription paying for the visit, if any
    pub subscription_id: Option<Uuid>,

    /// Usage link holding quota for the visit, if any
    pub usage_link_id: Option<Uuid>,

    /// Current status
    pub status: ReservationStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Who booked the reservation
    pub created_by: Option<String>,
}

impl Reservation {
    /// Create a new scheduled reservation
    ///
    /// The id is chosen by the caller so the usage link can reference the
    /// reservation before the record is persisted.
    pub fn new(
        id: Uuid,
        pet_id: Uuid,
        service_ids: Vec<Uuid>,
        subscription_id: Option<Uuid>,
        usage_link_id: Option<Uuid>,
        created_by: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            pet_id,
            service_ids,
            subscription_id,
            usage_link_id,
            status: ReservationStatus::Scheduled,
            created_at: now,
            updated_at: now,
            created_by: Some(created_by.to_string()),
        }
    }

    /// Check if the reservation pays through a subscription
    pub fn uses_subscription(&self) -> bool {
        self.subscription_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(ReservationStatus::Scheduled.is_open());
        assert!(!ReservationStatus::Cancelled.is_open());
        assert!(!ReservationStatus::Completed.is_open());
    }

    #[test]
    fn test_new_reservation_is_scheduled() {
        let id = Uuid::new_v4();
        let res = Reservation::new(id, Uuid::new_v4(), vec![Uuid::new_v4()], None, None, "desk");
        assert_eq!(res.id, id);
        assert_eq!(res.status, ReservationStatus::Scheduled);
        assert!(!res.uses_subscription());
    }
}
