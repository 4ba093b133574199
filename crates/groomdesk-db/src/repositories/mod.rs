//! Repository implementations for GroomDesk

pub mod reservation_repo;
pub mod service_repo;
pub mod subscription_repo;
pub mod usage_link_repo;

pub use reservation_repo::PgReservationRepository;
pub use service_repo::PgServiceRepository;
pub use subscription_repo::PgSubscriptionRepository;
pub use usage_link_repo::PgUsageLinkRepository;
