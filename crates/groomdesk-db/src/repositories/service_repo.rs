//! Grooming service catalog repository implementation
//!
//! Stores the catalog of offered services and answers the tag lookups the
//! classifier depends on. Tag resolution rejects unknown and inactive ids so
//! a stale client cannot book a retired service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use groomdesk_core::{
    models::{GroomingService, ServiceTag, TaggedService},
    traits::{Repository, ServiceCatalog, ServiceRepository},
    AppError, AppResult,
};
use sqlx::PgPool;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

const SERVICE_COLUMNS: &str = "id, name, tag, active, created_at, updated_at";

/// PostgreSQL implementation of the service catalog
pub struct PgServiceRepository {
    pool: PgPool,
}

impl PgServiceRepository {
    /// Create a new service repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse service tag from string
    fn parse_tag(s: &str) -> ServiceTag {
        ServiceTag::from_str(s).unwrap_or(ServiceTag::Bath)
    }
}

#[async_trait]
impl Repository<GroomingService, Uuid> for PgServiceRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<GroomingService>> {
        debug!("Finding grooming service by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, ServiceRow>(&format!(
            "SELECT {} FROM grooming_services WHERE id = $1",
            SERVICE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding service {}: {}", id, e);
            AppError::Database(format!("Failed to find service: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<GroomingService>> {
        let rows = sqlx::query_as::<sqlx::Postgres, ServiceRow>(&format!(
            r#"
            SELECT {}
            FROM grooming_services
            ORDER BY name
            LIMIT $1 OFFSET $2
            "#,
            SERVICE_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding services: {}", e);
            AppError::Database(format!("Failed to fetch services: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM grooming_services")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting services: {}", e);
                AppError::Database(format!("Failed to count services: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &GroomingService) -> AppResult<GroomingService> {
        debug!("Creating grooming service: {}", entity.name);

        let row = sqlx::query_as::<sqlx::Postgres, ServiceRow>(&format!(
            r#"
            INSERT INTO grooming_services (id, name, tag, active)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            SERVICE_COLUMNS
        ))
        .bind(entity.id)
        .bind(&entity.name)
        .bind(entity.tag.to_string())
        .bind(entity.active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating service: {}", e);
            AppError::Database(format!("Failed to create service: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &GroomingService) -> AppResult<GroomingService> {
        debug!("Updating grooming service: {}", entity.id);

        let row = sqlx::query_as::<sqlx::Postgres, ServiceRow>(&format!(
            r#"
            UPDATE grooming_services
            SET name = $2,
                tag = $3,
                active = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SERVICE_COLUMNS
        ))
        .bind(entity.id)
        .bind(&entity.name)
        .bind(entity.tag.to_string())
        .bind(entity.active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating service {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update service: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        debug!("Deleting grooming service: {}", id);

        let result = sqlx::query("DELETE FROM grooming_services WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting service {}: {}", id, e);
                AppError::Database(format!("Failed to delete service: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ServiceCatalog for PgServiceRepository {
    #[instrument(skip(self))]
    async fn tags_for(&self, service_ids: &[Uuid]) -> AppResult<Vec<TaggedService>> {
        debug!("Resolving tags for {} services", service_ids.len());

        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT id, tag
            FROM grooming_services
            WHERE id = ANY($1)
                AND active = TRUE
            "#,
        )
        .bind(service_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error resolving service tags: {}", e);
            AppError::Database(format!("Failed to resolve service tags: {}", e))
        })?;

        let mut tagged = Vec::with_capacity(service_ids.len());
        for id in service_ids {
            match rows.iter().find(|(row_id, _)| row_id == id) {
                Some((_, tag)) => tagged.push(TaggedService {
                    id: *id,
                    tag: Self::parse_tag(tag),
                }),
                None => {
                    warn!("Requested service {} is unknown or inactive", id);
                    return Err(AppError::ServiceNotFound(id.to_string()));
                }
            }
        }

        Ok(tagged)
    }
}

impl ServiceRepository for PgServiceRepository {}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct ServiceRow {
    id: Uuid,
    name: String,
    tag: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ServiceRow> for GroomingService {
    fn from(row: ServiceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            tag: PgServiceRepository::parse_tag(&row.tag),
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag() {
        assert_eq!(PgServiceRepository::parse_tag("bath"), ServiceTag::Bath);
        assert_eq!(PgServiceRepository::parse_tag("groom"), ServiceTag::Groom);
    }
}
