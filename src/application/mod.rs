//! Application layer services implementing business logic.
//!
//! Services consume repository traits, apply validation and business rules,
//! and give HTTP handlers a narrow API.
//!
//! # Available Services
//!
//! - [`services::redirect_service::RedirectService`] - Redirect-time resolution
//! - [`services::link_service::LinkService`] - Link management and guest claiming
//! - [`services::stats_service::StatsService`] - Per-link analytics
//! - [`services::auth_service::AuthService`] - API token authentication

pub mod services;
