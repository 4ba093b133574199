//! Grooming service catalog models
//!
//! Catalog entries tag each offered service as a bath or a groom; the tag
//! drives the quota deduction weight of a visit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Service tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTag {
    /// Bath-class service, costs 1 quota unit
    Bath,
    /// Groom-class service, costs 4 quota units
    Groom,
}

impl fmt::Display for ServiceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceTag::Bath => write!(f, "bath"),
            ServiceTag::Groom => write!(f, "groom"),
        }
    }
}

impl ServiceTag {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bath" => Some(ServiceTag::Bath),
            "groom" => Some(ServiceTag::Groom),
            _ => None,
        }
    }
}

/// Catalog entry for one offered grooming service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroomingService {
    /// Unique identifier
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Bath or groom classification
    pub tag: ServiceTag,

    /// Whether the service can still be booked
    pub active: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl GroomingService {
    /// Create a new active catalog entry
    pub fn new(name: impl Into<String>, tag: ServiceTag) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            tag,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A requested service resolved to its catalog tag
///
/// The classifier works on these so it stays pure; tag resolution is the
/// catalog collaborator's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedService {
    pub id: Uuid,
    pub tag: ServiceTag,
}

/// Visit kind computed from the requested service mix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitKind {
    /// Bath services only
    Bath,
    /// Groom services only
    Groom,
    /// Both classes present
    Mixed,
}

impl fmt::Display for VisitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitKind::Bath => write!(f, "bath"),
            VisitKind::Groom => write!(f, "groom"),
            VisitKind::Mixed => write!(f, "mixed"),
        }
    }
}

/// Result of classifying a set of requested services
///
/// Value object: no identity, no lifecycle.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceMixResult {
    /// Bath-only, groom-only, or mixed visit
    pub visit_kind: VisitKind,

    /// Quota units the visit costs
    pub deduction_weight: i32,

    /// Human-readable breakdown of the weight
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_tag_round_trip() {
        assert_eq!(ServiceTag::from_str("BATH"), Some(ServiceTag::Bath));
        assert_eq!(ServiceTag::from_str("groom"), Some(ServiceTag::Groom));
        assert_eq!(ServiceTag::from_str("nails"), None);
        assert_eq!(ServiceTag::Groom.to_string(), "groom");
    }

    #[test]
    fn test_new_service_is_active() {
        let svc = GroomingService::new("Full groom", ServiceTag::Groom);
        assert!(svc.active);
        assert_eq!(svc.tag, ServiceTag::Groom);
    }
}
