//! Reservation-subscription coordinator
//!
//! Sequences ledger calls with the reservation's own lifecycle and keeps the
//! two consistent under partial failure. The ledger and the reservation
//! store may be separate collaborators, so the create path uses a
//! compensating release instead of assuming one shared transaction: quota
//! must never stay reserved for a reservation that does not exist.

use crate::service_mix::classify;
use crate::usage_ledger::UsageLedger;
use groomdesk_core::{
    models::{LinkState, Reservation, ReservationStatus, ServiceMixResult},
    traits::{ReservationStore, ServiceCatalog, SubscriptionRepository, UsageLinkRepository},
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Reservation creation request
#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub pet_id: Uuid,
    pub service_ids: Vec<Uuid>,
    pub subscription_id: Option<Uuid>,
}

/// Outcome of a successful reservation creation
#[derive(Debug, Clone)]
pub struct CreatedReservation {
    pub reservation: Reservation,
    pub usage_link_id: Option<Uuid>,
    pub service_mix: Option<ServiceMixResult>,
}

/// Reservation-subscription coordinator
///
/// Invoked at exactly three points of the reservation lifecycle:
/// creation, cancellation, completion.
pub struct ReservationCoordinator<S, L, C, R>
where
    S: SubscriptionRepository,
    L: UsageLinkRepository,
    C: ServiceCatalog,
    R: ReservationStore,
{
    ledger: Arc<UsageLedger<S, L>>,
    catalog: Arc<C>,
    reservations: Arc<R>,
}

impl<S, L, C, R> ReservationCoordinator<S, L, C, R>
where
    S: SubscriptionRepository,
    L: UsageLinkRepository,
    C: ServiceCatalog,
    R: ReservationStore,
{
    /// Create a new coordinator
    pub fn new(ledger: Arc<UsageLedger<S, L>>, catalog: Arc<C>, reservations: Arc<R>) -> Self {
        Self {
            ledger,
            catalog,
            reservations,
        }
    }

    /// Handle reservation creation
    ///
    /// With a subscription: classify the requested services, reserve the
    /// computed weight, then persist the reservation carrying the link id.
    /// If persistence fails after the reserve succeeded, the held quota is
    /// released before the error propagates.
    #[instrument(skip(self, request))]
    pub async fn on_reservation_created(
        &self,
        request: ReservationRequest,
        actor: &str,
    ) -> AppResult<CreatedReservation> {
        if request.service_ids.is_empty() {
            return Err(AppError::InvalidArgument(
                "a reservation needs at least one service".to_string(),
            ));
        }

        let reservation_id = Uuid::new_v4();
        info!(
            "Creating reservation {} for pet {} ({} services, subscription: {:?})",
            reservation_id,
            request.pet_id,
            request.service_ids.len(),
            request.subscription_id
        );

        let mut service_mix = None;
        let mut link_id = None;

        if let Some(subscription_id) = request.subscription_id {
            let tagged = self.catalog.tags_for(&request.service_ids).await?;
            let mix = classify(&tagged)?;
            info!(
                "Reservation {} classified as {} visit: {}",
                reservation_id, mix.visit_kind, mix.reason
            );

            let link = self
                .ledger
                .reserve_usage(subscription_id, reservation_id, mix.deduction_weight, actor)
                .await?;

            link_id = Some(link.id);
            service_mix = Some(mix);
        }

        let reservation = Reservation::new(
            reservation_id,
            request.pet_id,
            request.service_ids,
            request.subscription_id,
            link_id,
            actor,
        );

        match self.reservations.create(&reservation).await {
            Ok(created) => Ok(CreatedReservation {
                reservation: created,
                usage_link_id: link_id,
                service_mix,
            }),
            Err(e) => {
                // Cleanup obligation: the reservation record does not exist,
                // so any quota held for it must go back to the pool.
                if let Some(link_id) = link_id {
                    warn!(
                        "Reservation {} failed to persist, releasing link {}",
                        reservation_id, link_id
                    );
                    if let Err(release_err) = self.ledger.release_usage(link_id, actor).await {
                        error!(
                            "Compensating release of link {} failed: {}; \
                             the reconciliation sweep will pick it up",
                            link_id, release_err
                        );
                    }
                }
                Err(e)
            }
        }
    }

    /// Handle reservation cancellation
    ///
    /// A Reserved link is released. A Confirmed link blocks cancellation: a
    /// completed, confirmed visit cannot un-spend quota this way.
    #[instrument(skip(self))]
    pub async fn on_reservation_cancelled(
        &self,
        reservation_id: Uuid,
        actor: &str,
    ) -> AppResult<Reservation> {
        let reservation = self
            .reservations
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| AppError::ReservationNotFound(reservation_id.to_string()))?;

        if !reservation.status.is_open() {
            return Err(AppError::InvalidState(format!(
                "reservation {} is already {}",
                reservation_id, reservation.status
            )));
        }

        if let Some(link_id) = reservation.usage_link_id {
            let link = self.ledger.get_link(link_id).await?;
            match link.state {
                LinkState::Confirmed => {
                    return Err(AppError::CannotCancelConfirmedUsage(format!(
                        "reservation {} has confirmed usage of {} units",
                        reservation_id, link.weight
                    )));
                }
                LinkState::Reserved => {
                    self.ledger.release_usage(link_id, actor).await?;
                }
                LinkState::Released => {
                    // Already reconciled out from under us; nothing to release.
                    warn!(
                        "Link {} of reservation {} was already released",
                        link_id, reservation_id
                    );
                }
            }
        }

        let updated = self
            .reservations
            .update_status(reservation_id, ReservationStatus::Cancelled, actor)
            .await?;

        info!("Reservation {} cancelled by {}", reservation_id, actor);
        Ok(updated)
    }

    /// Handle reservation completion
    ///
    /// Confirms the usage link if one exists; a reservation paid out of
    /// pocket simply completes. A ledger failure leaves the reservation
    /// un-advanced so a retry starts from a consistent state.
    #[instrument(skip(self))]
    pub async fn on_reservation_completed(
        &self,
        reservation_id: Uuid,
        actor: &str,
    ) -> AppResult<Reservation> {
        let reservation = self
            .reservations
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| AppError::ReservationNotFound(reservation_id.to_string()))?;

        if !reservation.status.is_open() {
            return Err(AppError::InvalidState(format!(
                "reservation {} is already {}",
                reservation_id, reservation.status
            )));
        }

        if let Some(link_id) = reservation.usage_link_id {
            self.ledger.confirm_usage(link_id, actor).await?;
        }

        let updated = self
            .reservations
            .update_status(reservation_id, ReservationStatus::Completed, actor)
            .await?;

        info!("Reservation {} completed by {}", reservation_id, actor);
        Ok(updated)
    }
}
