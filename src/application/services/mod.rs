//! Business logic services for the application layer.

pub mod auth_service;
pub mod link_service;
pub mod redirect_service;
pub mod stats_service;

pub use auth_service::{AuthService, hash_token};
pub use link_service::{DEFAULT_GUEST_TTL_HOURS, LinkService};
pub use redirect_service::{DEFAULT_LOOKUP_TIMEOUT, RedirectService};
pub use stats_service::StatsService;
