//! Reservation DTOs
//!
//! Request and response types for reservation lifecycle endpoints.

use chrono::{DateTime, Utc};
use groomdesk_core::models::{Reservation, ServiceMixResult};
use groomdesk_services::CreatedReservation;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Reservation creation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReservationCreateRequest {
    /// Pet the visit is for
    pub pet_id: Uuid,

    /// Requested catalog services
    #[validate(length(min = 1, message = "At least one service is required"))]
    pub service_ids: Vec<Uuid>,

    /// Pay through this subscription's quota
    pub subscription_id: Option<Uuid>,
}

/// Reservation response DTO
#[derive(Debug, Clone, Serialize)]
pub struct ReservationResponse {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub service_ids: Vec<Uuid>,
    pub subscription_id: Option<Uuid>,
    pub usage_link_id: Option<Uuid>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(res: Reservation) -> Self {
        Self {
            id: res.id,
            pet_id: res.pet_id,
            service_ids: res.service_ids,
            subscription_id: res.subscription_id,
            usage_link_id: res.usage_link_id,
            status: res.status.to_string(),
            created_at: res.created_at,
            updated_at: res.updated_at,
        }
    }
}

/// Service mix breakdown DTO
#[derive(Debug, Clone, Serialize)]
pub struct ServiceMixResponse {
    pub visit_kind: String,
    pub deduction_weight: i32,
    pub reason: String,
}

impl From<ServiceMixResult> for ServiceMixResponse {
    fn from(mix: ServiceMixResult) -> Self {
        Self {
            visit_kind: mix.visit_kind.to_string(),
            deduction_weight: mix.deduction_weight,
            reason: mix.reason,
        }
    }
}

/// Response for a successful reservation creation
#[derive(Debug, Clone, Serialize)]
pub struct CreatedReservationResponse {
    pub reservation: ReservationResponse,
    pub usage_link_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_mix: Option<ServiceMixResponse>,
}

impl From<CreatedReservation> for CreatedReservationResponse {
    fn from(created: CreatedReservation) -> Self {
        Self {
            reservation: created.reservation.into(),
            usage_link_id: created.usage_link_id,
            service_mix: created.service_mix.map(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groomdesk_core::models::ReservationStatus;

    #[test]
    fn test_reservation_response_serialization() {
        let res = Reservation::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![Uuid::new_v4()],
            None,
            None,
            "desk",
        );
        assert_eq!(res.status, ReservationStatus::Scheduled);

        let response = ReservationResponse::from(res);
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"scheduled\""));
        assert!(json.contains("\"usage_link_id\":null"));
    }
}
