//! Subscription usage ledger
//!
//! The sole authority over subscription quota counters. Every mutation goes
//! through here; handlers and the coordinator never write counters directly.
//!
//! Each operation follows the same shape: read the subscription, run the
//! pure model transition, then commit through the repository's versioned
//! write. A commit that loses the version check is retried from a fresh
//! read, so validation always runs against the state that actually gets
//! written. Contention is scoped to one subscription id; two pets never
//! block each other.

use crate::constants::MAX_COMMIT_RETRIES;
use chrono::Utc;
use groomdesk_core::{
    models::{LinkState, UsageLink, UsageSummary},
    traits::{SubscriptionRepository, UsageLinkRepository},
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Subscription ledger
///
/// Owns the reserve/confirm/release state machine for quota units.
pub struct UsageLedger<S: SubscriptionRepository, L: UsageLinkRepository> {
    subscriptions: Arc<S>,
    links: Arc<L>,
}

impl<S: SubscriptionRepository, L: UsageLinkRepository> UsageLedger<S, L> {
    /// Create a new ledger over the given repositories
    pub fn new(subscriptions: Arc<S>, links: Arc<L>) -> Self {
        Self {
            subscriptions,
            links,
        }
    }

    /// Advisory availability check
    ///
    /// True iff the subscription is currently active and holds at least
    /// `count` unreserved units. Runs outside any lock; the authoritative
    /// check happens inside `reserve_usage`, so a `true` here is never a
    /// guarantee that a later reserve will succeed.
    #[instrument(skip(self))]
    pub async fn check_availability(&self, subscription_id: Uuid, count: i32) -> AppResult<bool> {
        let subscription = self
            .subscriptions
            .find_by_id(subscription_id)
            .await?
            .ok_or_else(|| AppError::SubscriptionNotFound(subscription_id.to_string()))?;

        Ok(subscription.availability(count, Utc::now()).is_ok())
    }

    /// Reserve `count` units for a reservation
    ///
    /// The only point where capacity is committed ahead of service delivery.
    /// Validation and the counter write land atomically; a concurrent
    /// reserve against the same subscription makes one of the two re-read
    /// and re-validate, so the capacity invariant survives races.
    #[instrument(skip(self))]
    pub async fn reserve_usage(
        &self,
        subscription_id: Uuid,
        reservation_id: Uuid,
        count: i32,
        actor: &str,
    ) -> AppResult<UsageLink> {
        info!(
            "Reserving {} units on subscription {} for reservation {}",
            count, subscription_id, reservation_id
        );

        if let Some(existing) = self.links.find_by_reservation(reservation_id).await? {
            return Err(AppError::AlreadyExists(format!(
                "reservation {} already holds usage link {}",
                reservation_id, existing.id
            )));
        }

        for attempt in 1..=MAX_COMMIT_RETRIES {
            let mut subscription = self
                .subscriptions
                .find_by_id(subscription_id)
                .await?
                .ok_or_else(|| AppError::SubscriptionNotFound(subscription_id.to_string()))?;
            let expected_version = subscription.version;
            let now = Utc::now();

            subscription.apply_reserve(count, now, actor)?;
            let link = UsageLink::new(subscription_id, reservation_id, count, actor);

            if self
                .subscriptions
                .commit_usage(&subscription, Some(&link), expected_version)
                .await?
            {
                info!(
                    "Reserved {} units on subscription {}: link {}, {} remaining",
                    count,
                    subscription_id,
                    link.id,
                    subscription.remaining_usage()
                );
                return Ok(link);
            }

            warn!(
                "Reserve on subscription {} lost version race (attempt {}/{})",
                subscription_id, attempt, MAX_COMMIT_RETRIES
            );
        }

        error!(
            "Reserve on subscription {} exhausted {} commit attempts",
            subscription_id, MAX_COMMIT_RETRIES
        );
        Err(AppError::Transaction(format!(
            "subscription {} is under heavy contention, reservation not applied",
            subscription_id
        )))
    }

    /// Release a held link, returning its units to the pool
    ///
    /// Valid only while the link is Reserved. A second release is rejected
    /// rather than ignored so a coordinator bug surfaces instead of silently
    /// skewing the counters.
    #[instrument(skip(self))]
    pub async fn release_usage(&self, link_id: Uuid, actor: &str) -> AppResult<()> {
        info!("Releasing usage link {}", link_id);

        for attempt in 1..=MAX_COMMIT_RETRIES {
            let mut link = self
                .links
                .find_by_id(link_id)
                .await?
                .ok_or_else(|| AppError::LinkNotFound(link_id.to_string()))?;
            let mut subscription = self
                .subscriptions
                .find_by_id(link.subscription_id)
                .await?
                .ok_or_else(|| AppError::SubscriptionNotFound(link.subscription_id.to_string()))?;
            let expected_version = subscription.version;
            let now = Utc::now();

            link.mark_released(now)?;
            subscription.apply_release(link.weight, now, actor)?;

            if self
                .subscriptions
                .commit_usage(&subscription, Some(&link), expected_version)
                .await?
            {
                info!(
                    "Released {} units from link {} back to subscription {}",
                    link.weight, link_id, link.subscription_id
                );
                return Ok(());
            }

            warn!(
                "Release of link {} lost version race (attempt {}/{})",
                link_id, attempt, MAX_COMMIT_RETRIES
            );
        }

        Err(AppError::Transaction(format!(
            "usage link {} could not be released under contention",
            link_id
        )))
    }

    /// Confirm a held link, converting its units into spent quota
    ///
    /// Valid only while the link is Reserved.
    #[instrument(skip(self))]
    pub async fn confirm_usage(&self, link_id: Uuid, actor: &str) -> AppResult<()> {
        info!("Confirming usage link {}", link_id);

        for attempt in 1..=MAX_COMMIT_RETRIES {
            let mut link = self
                .links
                .find_by_id(link_id)
                .await?
                .ok_or_else(|| AppError::LinkNotFound(link_id.to_string()))?;
            let mut subscription = self
                .subscriptions
                .find_by_id(link.subscription_id)
                .await?
                .ok_or_else(|| AppError::SubscriptionNotFound(link.subscription_id.to_string()))?;
            let expected_version = subscription.version;
            let now = Utc::now();

            link.mark_confirmed(now)?;
            subscription.apply_confirm(link.weight, now, actor)?;

            if self
                .subscriptions
                .commit_usage(&subscription, Some(&link), expected_version)
                .await?
            {
                info!(
                    "Confirmed {} units on subscription {} through link {}",
                    link.weight, link.subscription_id, link_id
                );
                return Ok(());
            }

            warn!(
                "Confirm of link {} lost version race (attempt {}/{})",
                link_id, attempt, MAX_COMMIT_RETRIES
            );
        }

        Err(AppError::Transaction(format!(
            "usage link {} could not be confirmed under contention",
            link_id
        )))
    }

    /// Read-only usage summary for reporting
    ///
    /// `used` counts confirmed units only.
    #[instrument(skip(self))]
    pub async fn get_usage(&self, subscription_id: Uuid) -> AppResult<UsageSummary> {
        let subscription = self
            .subscriptions
            .find_by_id(subscription_id)
            .await?
            .ok_or_else(|| AppError::SubscriptionNotFound(subscription_id.to_string()))?;

        Ok(subscription.usage_summary(Utc::now()))
    }

    /// Fetch a usage link for inspection
    #[instrument(skip(self))]
    pub async fn get_link(&self, link_id: Uuid) -> AppResult<UsageLink> {
        self.links
            .find_by_id(link_id)
            .await?
            .ok_or_else(|| AppError::LinkNotFound(link_id.to_string()))
    }

    /// Recompute stored statuses across all subscriptions
    ///
    /// Invoked by an external scheduler. Only affects reporting; quota
    /// correctness never depends on the stored status being fresh because
    /// every reserve re-derives it from dates and counters.
    #[instrument(skip(self))]
    pub async fn auto_update_status(&self) -> AppResult<u64> {
        let swept = self.subscriptions.sweep_statuses(Utc::now()).await?;
        if swept > 0 {
            info!("Status sweep updated {} subscriptions", swept);
        }
        Ok(swept)
    }

    /// Explicitly cancel a subscription
    ///
    /// Terminal: the subscription stops accepting reservations but keeps its
    /// confirmed history for reporting.
    #[instrument(skip(self))]
    pub async fn cancel_subscription(&self, subscription_id: Uuid, actor: &str) -> AppResult<()> {
        info!("Cancelling subscription {}", subscription_id);

        for attempt in 1..=MAX_COMMIT_RETRIES {
            let mut subscription = self
                .subscriptions
                .find_by_id(subscription_id)
                .await?
                .ok_or_else(|| AppError::SubscriptionNotFound(subscription_id.to_string()))?;
            let expected_version = subscription.version;

            subscription.cancel(Utc::now(), actor)?;

            if self
                .subscriptions
                .commit_usage(&subscription, None, expected_version)
                .await?
            {
                info!("Subscription {} cancelled by {}", subscription_id, actor);
                return Ok(());
            }

            warn!(
                "Cancel of subscription {} lost version race (attempt {}/{})",
                subscription_id, attempt, MAX_COMMIT_RETRIES
            );
        }

        Err(AppError::Transaction(format!(
            "subscription {} could not be cancelled under contention",
            subscription_id
        )))
    }

    /// Release Reserved links whose reservation record never materialized
    ///
    /// Recovery path for a crash between reserving quota and persisting the
    /// reservation. Invoked by an external scheduler; returns how many links
    /// were released. Individual failures are logged and skipped so one bad
    /// link cannot wedge the whole sweep.
    #[instrument(skip(self))]
    pub async fn release_orphaned_links(&self, actor: &str) -> AppResult<u64> {
        let orphans = self.links.find_orphaned().await?;
        if orphans.is_empty() {
            debug!("No orphaned reserved links found");
            return Ok(0);
        }

        warn!("Releasing {} orphaned reserved links", orphans.len());

        let mut released = 0u64;
        for link in orphans {
            // The orphan query only returns Reserved links, but another
            // reconciler may have settled one in the meantime.
            if link.state != LinkState::Reserved {
                continue;
            }
            match self.release_usage(link.id, actor).await {
                Ok(()) => released += 1,
                Err(e) => warn!("Failed to release orphaned link {}: {}", link.id, e),
            }
        }

        info!("Reconciliation released {} orphaned links", released);
        Ok(released)
    }
}
