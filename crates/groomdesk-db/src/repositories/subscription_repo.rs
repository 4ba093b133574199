//! Subscription repository implementation
//!
//! PostgreSQL-backed storage for subscriptions. The interesting part is
//! `commit_usage`: one transaction that applies the counter change only when
//! the version stamp is still the one the ledger read, and settles the usage
//! link row alongside it. Contention stays scoped to one subscription id.

use chrono::{DateTime, Utc};
use groomdesk_core::{
    models::{Subscription, SubscriptionStatus, UsageLink},
    traits::{Repository, SubscriptionRepository},
    AppError, AppResult,
};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

const SUBSCRIPTION_COLUMNS: &str = r#"
    id, pet_id, starts_on, ends_on,
    total_usage_limit, reserved_count, confirmed_count,
    status, version, created_at, updated_at, created_by, updated_by
"#;

/// PostgreSQL implementation of SubscriptionRepository
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    /// Create a new subscription repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse subscription status from string
    fn parse_status(s: &str) -> SubscriptionStatus {
        SubscriptionStatus::from_str(s).unwrap_or(SubscriptionStatus::Active)
    }
}

#[async_trait]
impl Repository<Subscription, Uuid> for PgSubscriptionRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Subscription>> {
        debug!("Finding subscription by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, SubscriptionRow>(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding subscription {}: {}", id, e);
            AppError::Database(format!("Failed to find subscription: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<Subscription>> {
        let rows = sqlx::query_as::<sqlx::Postgres, SubscriptionRow>(&format!(
            r#"
            SELECT {}
            FROM subscriptions
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding subscriptions: {}", e);
            AppError::Database(format!("Failed to fetch subscriptions: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscriptions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting subscriptions: {}", e);
                AppError::Database(format!("Failed to count subscriptions: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &Subscription) -> AppResult<Subscription> {
        debug!("Creating subscription for pet: {}", entity.pet_id);

        let row = sqlx::query_as::<sqlx::Postgres, SubscriptionRow>(&format!(
            r#"
            INSERT INTO subscriptions (
                id, pet_id, starts_on, ends_on,
                total_usage_limit, reserved_count, confirmed_count,
                status, version, created_by, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(entity.id)
        .bind(entity.pet_id)
        .bind(entity.starts_on)
        .bind(entity.ends_on)
        .bind(entity.total_usage_limit)
        .bind(entity.reserved_count)
        .bind(entity.confirmed_count)
        .bind(entity.status.to_string())
        .bind(entity.version)
        .bind(&entity.created_by)
        .bind(&entity.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating subscription: {}", e);
            AppError::Database(format!("Failed to create subscription: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &Subscription) -> AppResult<Subscription> {
        debug!("Updating subscription: {}", entity.id);

        let row = sqlx::query_as::<sqlx::Postgres, SubscriptionRow>(&format!(
            r#"
            UPDATE subscriptions
            SET pet_id = $2,
                starts_on = $3,
                ends_on = $4,
                total_usage_limit = $5,
                status = $6,
                updated_at = NOW(),
                updated_by = $7
            WHERE id = $1
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(entity.id)
        .bind(entity.pet_id)
        .bind(entity.starts_on)
        .bind(entity.ends_on)
        .bind(entity.total_usage_limit)
        .bind(entity.status.to_string())
        .bind(&entity.updated_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating subscription {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update subscription: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        debug!("Deleting subscription: {}", id);

        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting subscription {}: {}", id, e);
                AppError::Database(format!("Failed to delete subscription: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    #[instrument(skip(self))]
    async fn find_by_pet(&self, pet_id: Uuid) -> AppResult<Vec<Subscription>> {
        debug!("Finding subscriptions for pet: {}", pet_id);

        let rows = sqlx::query_as::<sqlx::Postgres, SubscriptionRow>(&format!(
            r#"
            SELECT {}
            FROM subscriptions
            WHERE pet_id = $1
            ORDER BY created_at DESC
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(pet_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding subscriptions by pet: {}", e);
            AppError::Database(format!("Failed to find subscriptions: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, subscription, link))]
    async fn commit_usage(
        &self,
        subscription: &Subscription,
        link: Option<&UsageLink>,
        expected_version: i32,
    ) -> AppResult<bool> {
        debug!(
            "Committing usage for subscription {} at version {}",
            subscription.id, expected_version
        );

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET reserved_count = $2,
                confirmed_count = $3,
                status = $4,
                version = version + 1,
                updated_at = $5,
                updated_by = $6
            WHERE id = $1 AND version = $7
            "#,
        )
        .bind(subscription.id)
        .bind(subscription.reserved_count)
        .bind(subscription.confirmed_count)
        .bind(subscription.status.to_string())
        .bind(subscription.updated_at)
        .bind(&subscription.updated_by)
        .bind(expected_version)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to update subscription counters: {}", e);
            AppError::Database(format!("Failed to update counters: {}", e))
        })?;

        if result.rows_affected() == 0 {
            // Version moved under us; the ledger re-reads and retries.
            tx.rollback().await.map_err(|e| {
                AppError::Transaction(format!("Failed to roll back transaction: {}", e))
            })?;
            warn!(
                "Version check lost for subscription {} at {}",
                subscription.id, expected_version
            );
            return Ok(false);
        }

        if let Some(link) = link {
            sqlx::query(
                r#"
                INSERT INTO usage_links (
                    id, subscription_id, reservation_id, weight, state,
                    created_at, updated_at, confirmed_at, released_at, created_by
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (id) DO UPDATE
                SET state = EXCLUDED.state,
                    confirmed_at = EXCLUDED.confirmed_at,
                    released_at = EXCLUDED.released_at,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(link.id)
            .bind(link.subscription_id)
            .bind(link.reservation_id)
            .bind(link.weight)
            .bind(link.state.to_string())
            .bind(link.created_at)
            .bind(link.updated_at)
            .bind(link.confirmed_at)
            .bind(link.released_at)
            .bind(&link.created_by)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to write usage link {}: {}", link.id, e);
                AppError::Database(format!("Failed to write usage link: {}", e))
            })?;
        }

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(true)
    }

    #[instrument(skip(self))]
    async fn sweep_statuses(&self, now: DateTime<Utc>) -> AppResult<u64> {
        debug!("Sweeping subscription statuses");

        let expired = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'expired',
                updated_at = $1
            WHERE status IN ('active', 'exhausted')
                AND ends_on < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error sweeping expired subscriptions: {}", e);
            AppError::Database(format!("Failed to sweep expired subscriptions: {}", e))
        })?;

        let exhausted = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'exhausted',
                updated_at = $1
            WHERE status = 'active'
                AND ends_on >= $1
                AND total_usage_limit - confirmed_count - reserved_count <= 0
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error sweeping exhausted subscriptions: {}", e);
            AppError::Database(format!("Failed to sweep exhausted subscriptions: {}", e))
        })?;

        let swept = expired.rows_affected() + exhausted.rows_affected();

        if swept > 0 {
            warn!("Status sweep updated {} subscriptions", swept);
        }

        Ok(swept)
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    pet_id: Uuid,
    starts_on: DateTime<Utc>,
    ends_on: DateTime<Utc>,
    total_usage_limit: i32,
    reserved_count: i32,
    confirmed_count: i32,
    status: String,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: Option<String>,
    updated_by: Option<String>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            id: row.id,
            pet_id: row.pet_id,
            starts_on: row.starts_on,
            ends_on: row.ends_on,
            total_usage_limit: row.total_usage_limit,
            reserved_count: row.reserved_count,
            confirmed_count: row.confirmed_count,
            status: PgSubscriptionRepository::parse_status(&row.status),
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by,
            updated_by: row.updated_by,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(
            PgSubscriptionRepository::parse_status("active"),
            SubscriptionStatus::Active
        );
        assert_eq!(
            PgSubscriptionRepository::parse_status("exhausted"),
            SubscriptionStatus::Exhausted
        );
        assert_eq!(
            PgSubscriptionRepository::parse_status("cancelled"),
            SubscriptionStatus::Cancelled
        );
    }
}
