//! Grooming service catalog DTOs

use chrono::{DateTime, Utc};
use groomdesk_core::models::{GroomingService, ServiceTag};
use groomdesk_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Catalog entry creation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ServiceCreateRequest {
    /// Display name
    #[validate(length(min = 1, max = 100, message = "Service name is required"))]
    pub name: String,

    /// Bath or groom classification
    pub tag: String,
}

impl ServiceCreateRequest {
    /// Convert to a GroomingService entity
    pub fn to_service(&self) -> Result<GroomingService, AppError> {
        let tag = ServiceTag::from_str(&self.tag).ok_or_else(|| {
            AppError::Validation(format!(
                "Service tag must be 'bath' or 'groom', got '{}'",
                self.tag
            ))
        })?;
        Ok(GroomingService::new(self.name.clone(), tag))
    }
}

/// Catalog entry response DTO
#[derive(Debug, Clone, Serialize)]
pub struct ServiceResponse {
    pub id: Uuid,
    pub name: String,
    pub tag: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GroomingService> for ServiceResponse {
    fn from(svc: GroomingService) -> Self {
        Self {
            id: svc.id,
            name: svc.name,
            tag: svc.tag.to_string(),
            active: svc.active,
            created_at: svc.created_at,
            updated_at: svc.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_service_parses_tag() {
        let req = ServiceCreateRequest {
            name: "Deluxe groom".to_string(),
            tag: "GROOM".to_string(),
        };
        let svc = req.to_service().unwrap();
        assert_eq!(svc.tag, ServiceTag::Groom);
        assert!(svc.active);
    }

    #[test]
    fn test_to_service_rejects_unknown_tag() {
        let req = ServiceCreateRequest {
            name: "Nail trim".to_string(),
            tag: "nails".to_string(),
        };
        assert!(matches!(req.to_service(), Err(AppError::Validation(_))));
    }
}
