//! Reservation handlers
//!
//! HTTP handlers for the reservation lifecycle. Each mutating endpoint maps
//! to one coordinator entry point; quota bookkeeping never happens here.

use crate::dto::{
    ApiResponse, CreatedReservationResponse, PaginationParams, ReservationCreateRequest,
    ReservationResponse,
};
use crate::handlers::{acting_user, build_coordinator};
use actix_web::{web, HttpRequest, HttpResponse};
use groomdesk_core::traits::Repository;
use groomdesk_core::AppError;
use groomdesk_db::PgReservationRepository;
use groomdesk_services::ReservationRequest;
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// List reservations with pagination
///
/// GET /api/v1/reservations
#[instrument(skip(pool))]
pub async fn list_reservations(
    pool: web::Data<PgPool>,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    debug!(
        page = query.page,
        per_page = query.per_page,
        "Listing reservations"
    );

    let repo = PgReservationRepository::new(pool.get_ref().clone());
    let reservations = repo.find_all(query.limit(), query.offset()).await?;
    let total = repo.count().await?;
    let data: Vec<ReservationResponse> = reservations.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(query.paginate(data, total)))
}

/// Get a single reservation
///
/// GET /api/v1/reservations/{id}
#[instrument(skip(pool))]
pub async fn get_reservation(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let repo = PgReservationRepository::new(pool.get_ref().clone());

    let reservation = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::ReservationNotFound(id.to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(ReservationResponse::from(reservation))))
}

/// Create a reservation
///
/// POST /api/v1/reservations
///
/// With a subscription id, quota for the classified service mix is reserved
/// before the reservation record is written; the response carries the usage
/// link id and the weight breakdown.
#[instrument(skip(pool, req, http_req))]
pub async fn create_reservation(
    pool: web::Data<PgPool>,
    req: web::Json<ReservationCreateRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Reservation validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;
    let actor = acting_user(&http_req)?;

    debug!(pet_id = %req.pet_id, "Creating reservation");

    let coordinator = build_coordinator(pool.get_ref());
    let created = coordinator
        .on_reservation_created(
            ReservationRequest {
                pet_id: req.pet_id,
                service_ids: req.service_ids.clone(),
                subscription_id: req.subscription_id,
            },
            &actor,
        )
        .await?;

    info!(
        "Reservation {} created by {} (link: {:?})",
        created.reservation.id, actor, created.usage_link_id
    );

    Ok(HttpResponse::Created().json(ApiResponse::success(CreatedReservationResponse::from(
        created,
    ))))
}

/// Cancel a reservation
///
/// POST /api/v1/reservations/{id}/cancel
#[instrument(skip(pool, http_req))]
pub async fn cancel_reservation(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    http_req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let actor = acting_user(&http_req)?;

    let coordinator = build_coordinator(pool.get_ref());
    let cancelled = coordinator
        .on_reservation_cancelled(path.into_inner(), &actor)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        ReservationResponse::from(cancelled),
        "Reservation cancelled",
    )))
}

/// Complete a reservation
///
/// POST /api/v1/reservations/{id}/complete
#[instrument(skip(pool, http_req))]
pub async fn complete_reservation(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    http_req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let actor = acting_user(&http_req)?;

    let coordinator = build_coordinator(pool.get_ref());
    let completed = coordinator
        .on_reservation_completed(path.into_inner(), &actor)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        ReservationResponse::from(completed),
        "Reservation completed",
    )))
}

/// Configure reservation routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reservations")
            .route("", web::get().to(list_reservations))
            .route("", web::post().to(create_reservation))
            .route("/{id}", web::get().to(get_reservation))
            .route("/{id}/cancel", web::post().to(cancel_reservation))
            .route("/{id}/complete", web::post().to(complete_reservation)),
    );
}
