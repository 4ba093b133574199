//! Reservation repository implementation
//!
//! PostgreSQL-backed storage for reservation lifecycle records. Requested
//! service ids are stored as a uuid[] column; the usage link id rides on the
//! same row so the link and the reservation persist together.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use groomdesk_core::{
    models::{Reservation, ReservationStatus},
    traits::{Repository, ReservationStore},
    AppError, AppResult,
};
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

const RESERVATION_COLUMNS: &str = r#"
    id, pet_id, service_ids, subscription_id, usage_link_id,
    status, created_at, updated_at, created_by
"#;

/// PostgreSQL implementation of ReservationStore
pub struct PgReservationRepository {
    pool: PgPool,
}

impl PgReservationRepository {
    /// Create a new reservation repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse reservation status from string
    fn parse_status(s: &str) -> ReservationStatus {
        ReservationStatus::from_str(s).unwrap_or(ReservationStatus::Scheduled)
    }
}

#[async_trait]
impl Repository<Reservation, Uuid> for PgReservationRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Reservation>> {
        debug!("Finding reservation by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, ReservationRow>(&format!(
            "SELECT {} FROM reservations WHERE id = $1",
            RESERVATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding reservation {}: {}", id, e);
            AppError::Database(format!("Failed to find reservation: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<sqlx::Postgres, ReservationRow>(&format!(
            r#"
            SELECT {}
            FROM reservations
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding reservations: {}", e);
            AppError::Database(format!("Failed to fetch reservations: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reservations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting reservations: {}", e);
                AppError::Database(format!("Failed to count reservations: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &Reservation) -> AppResult<Reservation> {
        debug!("Creating reservation for pet: {}", entity.pet_id);

        let row = sqlx::query_as::<sqlx::Postgres, ReservationRow>(&format!(
            r#"
            INSERT INTO reservations (
                id, pet_id, service_ids, subscription_id, usage_link_id,
                status, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(entity.id)
        .bind(entity.pet_id)
        .bind(&entity.service_ids)
        .bind(entity.subscription_id)
        .bind(entity.usage_link_id)
        .bind(entity.status.to_string())
        .bind(&entity.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating reservation: {}", e);
            AppError::Database(format!("Failed to create reservation: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &Reservation) -> AppResult<Reservation> {
        debug!("Updating reservation: {}", entity.id);

        let row = sqlx::query_as::<sqlx::Postgres, ReservationRow>(&format!(
            r#"
            UPDATE reservations
            SET pet_id = $2,
                service_ids = $3,
                subscription_id = $4,
                usage_link_id = $5,
                status = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(entity.id)
        .bind(entity.pet_id)
        .bind(&entity.service_ids)
        .bind(entity.subscription_id)
        .bind(entity.usage_link_id)
        .bind(entity.status.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating reservation {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update reservation: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        debug!("Deleting reservation: {}", id);

        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting reservation {}: {}", id, e);
                AppError::Database(format!("Failed to delete reservation: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ReservationStore for PgReservationRepository {
    #[instrument(skip(self))]
    async fn find_by_pet(&self, pet_id: Uuid) -> AppResult<Vec<Reservation>> {
        debug!("Finding reservations for pet: {}", pet_id);

        let rows = sqlx::query_as::<sqlx::Postgres, ReservationRow>(&format!(
            r#"
            SELECT {}
            FROM reservations
            WHERE pet_id = $1
            ORDER BY created_at DESC
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(pet_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding reservations by pet: {}", e);
            AppError::Database(format!("Failed to find reservations: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        id: Uuid,
        status: ReservationStatus,
        actor: &str,
    ) -> AppResult<Reservation> {
        debug!("Updating reservation {} status to {}", id, status);

        let row = sqlx::query_as::<sqlx::Postgres, ReservationRow>(&format!(
            r#"
            UPDATE reservations
            SET status = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(id)
        .bind(status.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating reservation status: {}", e);
            AppError::Database(format!("Failed to update reservation status: {}", e))
        })?
        .ok_or_else(|| AppError::ReservationNotFound(id.to_string()))?;

        debug!("Reservation {} advanced to {} by {}", id, status, actor);

        Ok(row.into())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    pet_id: Uuid,
    service_ids: Vec<Uuid>,
    subscription_id: Option<Uuid>,
    usage_link_id: Option<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: Option<String>,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Self {
            id: row.id,
            pet_id: row.pet_id,
            service_ids: row.service_ids,
            subscription_id: row.subscription_id,
            usage_link_id: row.usage_link_id,
            status: PgReservationRepository::parse_status(&row.status),
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(
            PgReservationRepository::parse_status("scheduled"),
            ReservationStatus::Scheduled
        );
        assert_eq!(
            PgReservationRepository::parse_status("completed"),
            ReservationStatus::Completed
        );
        assert_eq!(
            PgReservationRepository::parse_status("cancelled"),
            ReservationStatus::Cancelled
        );
    }
}
