//! Subscription handlers
//!
//! HTTP handlers for subscription purchase, usage reporting, cancellation,
//! and the scheduler-triggered sweep and reconciliation endpoints.

use crate::dto::{
    ApiResponse, PaginationParams, ReconcileResponse, SubscriptionCreateRequest,
    SubscriptionFilterParams, SubscriptionResponse, SweepResponse, UsageResponse,
};
use crate::handlers::{acting_user, build_ledger};
use actix_web::{web, HttpRequest, HttpResponse};
use groomdesk_core::models::SubscriptionStatus;
use groomdesk_core::traits::{Repository, SubscriptionRepository};
use groomdesk_core::AppError;
use groomdesk_db::PgSubscriptionRepository;
use groomdesk_services::constants::DEFAULT_VALIDITY_DAYS;
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// List subscriptions with pagination, optionally filtered to one pet
///
/// GET /api/v1/subscriptions
#[instrument(skip(pool))]
pub async fn list_subscriptions(
    pool: web::Data<PgPool>,
    query: web::Query<PaginationParams>,
    filters: web::Query<SubscriptionFilterParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let repo = PgSubscriptionRepository::new(pool.get_ref().clone());

    if let Some(pet_id) = filters.pet_id {
        debug!(%pet_id, "Listing subscriptions for pet");
        let subscriptions = repo.find_by_pet(pet_id).await?;
        let data: Vec<SubscriptionResponse> =
            subscriptions.into_iter().map(Into::into).collect();
        return Ok(HttpResponse::Ok().json(ApiResponse::success(data)));
    }

    debug!(
        page = query.page,
        per_page = query.per_page,
        "Listing subscriptions"
    );

    let subscriptions = repo.find_all(query.limit(), query.offset()).await?;
    let total = repo.count().await?;
    let data: Vec<SubscriptionResponse> = subscriptions.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(query.paginate(data, total)))
}

/// Purchase a new subscription
///
/// POST /api/v1/subscriptions
#[instrument(skip(pool, req, http_req))]
pub async fn create_subscription(
    pool: web::Data<PgPool>,
    req: web::Json<SubscriptionCreateRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Subscription purchase validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;
    let actor = acting_user(&http_req)?;

    let subscription = req.to_subscription(DEFAULT_VALIDITY_DAYS, &actor);
    if subscription.ends_on <= subscription.starts_on {
        return Err(AppError::Validation(
            "Validity window must end after it starts".to_string(),
        ));
    }

    debug!(pet_id = %subscription.pet_id, "Creating subscription");

    let repo = PgSubscriptionRepository::new(pool.get_ref().clone());
    let created = repo.create(&subscription).await?;

    info!(
        "Subscription {} purchased for pet {} by {}: {} units",
        created.id, created.pet_id, actor, created.total_usage_limit
    );

    Ok(HttpResponse::Created().json(ApiResponse::success(SubscriptionResponse::from(created))))
}

/// Get a single subscription
///
/// GET /api/v1/subscriptions/{id}
#[instrument(skip(pool))]
pub async fn get_subscription(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let repo = PgSubscriptionRepository::new(pool.get_ref().clone());

    let subscription = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::SubscriptionNotFound(id.to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(SubscriptionResponse::from(
        subscription,
    ))))
}

/// Get the usage summary for a subscription
///
/// GET /api/v1/subscriptions/{id}/usage
#[instrument(skip(pool))]
pub async fn get_subscription_usage(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let ledger = build_ledger(pool.get_ref());
    let summary = ledger.get_usage(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(UsageResponse::from(summary))))
}

/// Cancel a subscription
///
/// POST /api/v1/subscriptions/{id}/cancel
#[instrument(skip(pool, http_req))]
pub async fn cancel_subscription(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    http_req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let actor = acting_user(&http_req)?;
    let id = path.into_inner();

    let ledger = build_ledger(pool.get_ref());
    ledger.cancel_subscription(id, &actor).await?;

    let summary = ledger.get_usage(id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        UsageResponse::from(summary),
        "Subscription cancelled; confirmed usage kept for reporting",
    )))
}

/// Delete a subscription
///
/// DELETE /api/v1/subscriptions/{id}
///
/// A subscription with confirmed usage is soft-retired (cancelled) instead
/// of deleted so its spending history stays reportable.
#[instrument(skip(pool, http_req))]
pub async fn delete_subscription(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    http_req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let actor = acting_user(&http_req)?;
    let id = path.into_inner();
    let repo = PgSubscriptionRepository::new(pool.get_ref().clone());

    let subscription = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::SubscriptionNotFound(id.to_string()))?;

    if subscription.confirmed_count > 0 {
        warn!(
            "Subscription {} has {} confirmed units, retiring instead of deleting",
            id, subscription.confirmed_count
        );
        let ledger = build_ledger(pool.get_ref());
        if subscription.status != SubscriptionStatus::Cancelled {
            ledger.cancel_subscription(id, &actor).await?;
        }
        let summary = ledger.get_usage(id).await?;
        return Ok(HttpResponse::Ok().json(ApiResponse::with_message(
            UsageResponse::from(summary),
            "Subscription retired; confirmed usage kept for reporting",
        )));
    }

    repo.delete(id).await?;
    info!("Subscription {} deleted by {}", id, actor);

    Ok(HttpResponse::NoContent().finish())
}

/// Recompute stored statuses across all subscriptions
///
/// POST /api/v1/subscriptions/sweep
///
/// Invoked by the external scheduler on an interval.
#[instrument(skip(pool))]
pub async fn sweep_statuses(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let ledger = build_ledger(pool.get_ref());
    let updated = ledger.auto_update_status().await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(SweepResponse { updated })))
}

/// Release reserved links whose reservation never materialized
///
/// POST /api/v1/subscriptions/reconcile
///
/// Invoked by the external scheduler on an interval.
#[instrument(skip(pool, http_req))]
pub async fn reconcile_links(
    pool: web::Data<PgPool>,
    http_req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let actor = acting_user(&http_req)?;
    let ledger = build_ledger(pool.get_ref());
    let released = ledger.release_orphaned_links(&actor).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(ReconcileResponse { released })))
}

/// Configure subscription routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/subscriptions")
            .route("", web::get().to(list_subscriptions))
            .route("", web::post().to(create_subscription))
            .route("/sweep", web::post().to(sweep_statuses))
            .route("/reconcile", web::post().to(reconcile_links))
            .route("/{id}", web::get().to(get_subscription))
            .route("/{id}", web::delete().to(delete_subscription))
            .route("/{id}/usage", web::get().to(get_subscription_usage))
            .route("/{id}/cancel", web::post().to(cancel_subscription)),
    );
}
