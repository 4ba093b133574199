//! Data transfer objects for the GroomDesk API

pub mod common;
pub mod reservation;
pub mod service;
pub mod subscription;

pub use common::{ApiResponse, PaginationParams};
pub use reservation::{
    CreatedReservationResponse, ReservationCreateRequest, ReservationResponse, ServiceMixResponse,
};
pub use service::{ServiceCreateRequest, ServiceResponse};
pub use subscription::{
    ReconcileResponse, SubscriptionCreateRequest, SubscriptionFilterParams, SubscriptionResponse,
    SweepResponse, UsageResponse,
};
