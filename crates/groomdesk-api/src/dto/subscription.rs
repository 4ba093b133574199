//! Subscription DTOs
//!
//! Request and response types for subscription endpoints.

use chrono::{DateTime, Duration, Utc};
use groomdesk_core::models::{Subscription, UsageSummary};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Subscription purchase request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubscriptionCreateRequest {
    /// Pet the quota belongs to
    pub pet_id: Uuid,

    /// Quota units purchased
    #[validate(range(min = 1, max = 1000))]
    pub total_usage_limit: i32,

    /// First day of the validity window; defaults to now
    pub starts_on: Option<DateTime<Utc>>,

    /// Last day of the validity window; defaults to the configured
    /// validity period after the start
    pub ends_on: Option<DateTime<Utc>>,
}

impl SubscriptionCreateRequest {
    /// Convert to a Subscription entity
    pub fn to_subscription(&self, default_validity_days: i64, actor: &str) -> Subscription {
        let starts_on = self.starts_on.unwrap_or_else(Utc::now);
        let ends_on = self
            .ends_on
            .unwrap_or(starts_on + Duration::days(default_validity_days));
        Subscription::new(
            self.pet_id,
            starts_on,
            ends_on,
            self.total_usage_limit,
            actor,
        )
    }
}

/// Query filters for listing subscriptions
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionFilterParams {
    /// Restrict to one pet
    pub pet_id: Option<Uuid>,
}

/// Subscription response DTO
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub starts_on: DateTime<Utc>,
    pub ends_on: DateTime<Utc>,
    pub total_usage_limit: i32,
    pub reserved_count: i32,
    pub confirmed_count: i32,
    pub remaining_usage: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(sub: Subscription) -> Self {
        Self {
            id: sub.id,
            pet_id: sub.pet_id,
            starts_on: sub.starts_on,
            ends_on: sub.ends_on,
            total_usage_limit: sub.total_usage_limit,
            reserved_count: sub.reserved_count,
            confirmed_count: sub.confirmed_count,
            remaining_usage: sub.remaining_usage(),
            status: sub.status.to_string(),
            created_at: sub.created_at,
            updated_at: sub.updated_at,
        }
    }
}

/// Usage summary response DTO
#[derive(Debug, Clone, Serialize)]
pub struct UsageResponse {
    pub subscription_id: Uuid,
    pub pet_id: Uuid,
    pub used: i32,
    pub reserved: i32,
    pub remaining: i32,
    pub total_usage_limit: i32,
    pub status: String,
    pub starts_on: DateTime<Utc>,
    pub ends_on: DateTime<Utc>,
}

impl From<UsageSummary> for UsageResponse {
    fn from(summary: UsageSummary) -> Self {
        Self {
            subscription_id: summary.subscription_id,
            pet_id: summary.pet_id,
            used: summary.used,
            reserved: summary.reserved,
            remaining: summary.remaining,
            total_usage_limit: summary.total_usage_limit,
            status: summary.status.to_string(),
            starts_on: summary.starts_on,
            ends_on: summary.ends_on,
        }
    }
}

/// Response for the periodic status sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepResponse {
    /// Subscriptions whose stored status changed
    pub updated: u64,
}

/// Response for the orphaned-link reconciliation pass
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileResponse {
    /// Links released back to their pools
    pub released: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_validity_window() {
        let req = SubscriptionCreateRequest {
            pet_id: Uuid::new_v4(),
            total_usage_limit: 10,
            starts_on: None,
            ends_on: None,
        };

        let sub = req.to_subscription(90, "desk");
        assert_eq!(sub.total_usage_limit, 10);
        assert_eq!(sub.ends_on - sub.starts_on, Duration::days(90));
        assert_eq!(sub.created_by.as_deref(), Some("desk"));
    }

    #[test]
    fn test_response_carries_remaining() {
        let req = SubscriptionCreateRequest {
            pet_id: Uuid::new_v4(),
            total_usage_limit: 8,
            starts_on: None,
            ends_on: None,
        };
        let mut sub = req.to_subscription(30, "desk");
        sub.reserved_count = 2;
        sub.confirmed_count = 1;

        let resp = SubscriptionResponse::from(sub);
        assert_eq!(resp.remaining_usage, 5);
        assert_eq!(resp.status, "active");
    }
}
