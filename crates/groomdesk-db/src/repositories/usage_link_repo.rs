//! Usage link repository implementation
//!
//! Read-side queries over usage links. Writes go through
//! `PgSubscriptionRepository::commit_usage` so counters and link state can
//! never drift apart; `create`/`update` here exist for the generic trait and
//! administrative backfills only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use groomdesk_core::{
    models::{LinkState, UsageLink},
    traits::{Repository, UsageLinkRepository},
    AppError, AppResult,
};
use sqlx::PgPool;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

const LINK_COLUMNS: &str = r#"
    id, subscription_id, reservation_id, weight, state,
    created_at, updated_at, confirmed_at, released_at, created_by
"#;

/// PostgreSQL implementation of UsageLinkRepository
pub struct PgUsageLinkRepository {
    pool: PgPool,
}

impl PgUsageLinkRepository {
    /// Create a new usage link repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse link state from string
    fn parse_state(s: &str) -> LinkState {
        LinkState::from_str(s).unwrap_or(LinkState::Reserved)
    }
}

#[async_trait]
impl Repository<UsageLink, Uuid> for PgUsageLinkRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<UsageLink>> {
        debug!("Finding usage link by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, LinkRow>(&format!(
            "SELECT {} FROM usage_links WHERE id = $1",
            LINK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding usage link {}: {}", id, e);
            AppError::Database(format!("Failed to find usage link: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<UsageLink>> {
        let rows = sqlx::query_as::<sqlx::Postgres, LinkRow>(&format!(
            r#"
            SELECT {}
            FROM usage_links
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
            LINK_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding usage links: {}", e);
            AppError::Database(format!("Failed to fetch usage links: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM usage_links")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting usage links: {}", e);
                AppError::Database(format!("Failed to count usage links: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &UsageLink) -> AppResult<UsageLink> {
        debug!("Creating usage link for reservation: {}", entity.reservation_id);

        let row = sqlx::query_as::<sqlx::Postgres, LinkRow>(&format!(
            r#"
            INSERT INTO usage_links (
                id, subscription_id, reservation_id, weight, state,
                created_at, updated_at, confirmed_at, released_at, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            LINK_COLUMNS
        ))
        .bind(entity.id)
        .bind(entity.subscription_id)
        .bind(entity.reservation_id)
        .bind(entity.weight)
        .bind(entity.state.to_string())
        .bind(entity.created_at)
        .bind(entity.updated_at)
        .bind(entity.confirmed_at)
        .bind(entity.released_at)
        .bind(&entity.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating usage link: {}", e);
            AppError::Database(format!("Failed to create usage link: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &UsageLink) -> AppResult<UsageLink> {
        debug!("Updating usage link: {}", entity.id);

        let row = sqlx::query_as::<sqlx::Postgres, LinkRow>(&format!(
            r#"
            UPDATE usage_links
            SET state = $2,
                confirmed_at = $3,
                released_at = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            LINK_COLUMNS
        ))
        .bind(entity.id)
        .bind(entity.state.to_string())
        .bind(entity.confirmed_at)
        .bind(entity.released_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating usage link {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update usage link: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        debug!("Deleting usage link: {}", id);

        let result = sqlx::query("DELETE FROM usage_links WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting usage link {}: {}", id, e);
                AppError::Database(format!("Failed to delete usage link: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UsageLinkRepository for PgUsageLinkRepository {
    #[instrument(skip(self))]
    async fn find_by_reservation(&self, reservation_id: Uuid) -> AppResult<Option<UsageLink>> {
        debug!("Finding usage link by reservation: {}", reservation_id);

        let result = sqlx::query_as::<sqlx::Postgres, LinkRow>(&format!(
            r#"
            SELECT {}
            FROM usage_links
            WHERE reservation_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            LINK_COLUMNS
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding usage link by reservation: {}", e);
            AppError::Database(format!("Failed to find usage link: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_by_subscription(&self, subscription_id: Uuid) -> AppResult<Vec<UsageLink>> {
        debug!("Finding usage links for subscription: {}", subscription_id);

        let rows = sqlx::query_as::<sqlx::Postgres, LinkRow>(&format!(
            r#"
            SELECT {}
            FROM usage_links
            WHERE subscription_id = $1
            ORDER BY created_at DESC
            "#,
            LINK_COLUMNS
        ))
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding usage links by subscription: {}", e);
            AppError::Database(format!("Failed to find usage links: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn find_orphaned(&self) -> AppResult<Vec<UsageLink>> {
        debug!("Finding orphaned reserved links");

        let rows = sqlx::query_as::<sqlx::Postgres, LinkRow>(
            r#"
            SELECT
                l.id, l.subscription_id, l.reservation_id, l.weight, l.state,
                l.created_at, l.updated_at, l.confirmed_at, l.released_at, l.created_by
            FROM usage_links l
            LEFT JOIN reservations r ON r.usage_link_id = l.id
            WHERE l.state = 'reserved'
                AND r.id IS NULL
            ORDER BY l.created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding orphaned links: {}", e);
            AppError::Database(format!("Failed to find orphaned links: {}", e))
        })?;

        if !rows.is_empty() {
            warn!("Found {} orphaned reserved links", rows.len());
        }

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct LinkRow {
    id: Uuid,
    subscription_id: Uuid,
    reservation_id: Uuid,
    weight: i32,
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    released_at: Option<DateTime<Utc>>,
    created_by: Option<String>,
}

impl From<LinkRow> for UsageLink {
    fn from(row: LinkRow) -> Self {
        Self {
            id: row.id,
            subscription_id: row.subscription_id,
            reservation_id: row.reservation_id,
            weight: row.weight,
            state: PgUsageLinkRepository::parse_state(&row.state),
            created_at: row.created_at,
            updated_at: row.updated_at,
            confirmed_at: row.confirmed_at,
            released_at: row.released_at,
            created_by: row.created_by,
        }
    }
}
