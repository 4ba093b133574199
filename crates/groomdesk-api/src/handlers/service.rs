//! Grooming service catalog handlers
//!
//! Plain catalog CRUD; the interesting consumer is the classifier, which
//! reads tags through the `ServiceCatalog` seam rather than these routes.

use crate::dto::{ApiResponse, PaginationParams, ServiceCreateRequest, ServiceResponse};
use crate::handlers::acting_user;
use actix_web::{web, HttpRequest, HttpResponse};
use groomdesk_core::traits::Repository;
use groomdesk_core::AppError;
use groomdesk_db::PgServiceRepository;
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// List catalog entries with pagination
///
/// GET /api/v1/grooming-services
#[instrument(skip(pool))]
pub async fn list_services(
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
        "Listing grooming services"
    );

    let repo = PgServiceRepository::new(pool.get_ref().clone());
    let services = repo.find_all(query.limit(), query.offset()).await?;
    let total = repo.count().await?;
    let data: Vec<ServiceResponse> = services.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(query.paginate(data, total)))
}

/// Create a catalog entry
///
/// POST /api/v1/grooming-services
#[instrument(skip(pool, req, http_req))]
pub async fn create_service(
    pool: web::Data<PgPool>,
    req: web::Json<ServiceCreateRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Service creation validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;
    let actor = acting_user(&http_req)?;

    let service = req.to_service()?;
    let repo = PgServiceRepository::new(pool.get_ref().clone());
    let created = repo.create(&service).await?;

    info!(
        "Grooming service '{}' ({}) created by {}",
        created.name, created.tag, actor
    );

    Ok(HttpResponse::Created().json(ApiResponse::success(ServiceResponse::from(created))))
}

/// Configure catalog routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/grooming-services")
            .route("", web::get().to(list_services))
            .route("", web::post().to(create_service)),
    );
}
