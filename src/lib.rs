//! # smartlink
//!
//! A short-link redirect service with per-platform, per-country and split-test
//! routing, built with Axum and PostgreSQL.
//!
//! ## Architecture
//!
//! - **Domain** ([`domain`]) - Entities, repository traits, the redirect
//!   rules and the click pipeline
//! - **Application** ([`application`]) - Services orchestrating the domain
//! - **Infrastructure** ([`infrastructure`]) - PostgreSQL, Redis, user agent
//!   parsing and GeoIP
//! - **API** ([`api`]) - Handlers, DTOs and middleware
//!
//! ## Redirects
//!
//! `GET /r/{code}` resolves a code to one of:
//!
//! - a `307` redirect to the chosen destination
//! - `404` for unknown codes
//! - `410` for links outside their active window, expired guest links, or
//!   links at their click limit
//! - `401` when a password is required
//!
//! Destinations are picked in order: active A/B test, platform redirect,
//! country redirect, original URL. Each redirect queues a click event that a
//! background worker persists; the visitor never waits for it.
//!
//! ## Configuration
//!
//! Loaded from environment variables, see [`config`].

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod routes;
pub mod server;
pub mod state;
pub mod utils;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for library users and integration tests.
pub mod prelude {
    pub use crate::application::services::{
        AuthService, LinkService, RedirectService, StatsService,
    };
    pub use crate::domain::entities::{Click, Link, NewLink};
    pub use crate::domain::redirect::{Outcome, RequestContext};
    pub use crate::error::AppError;
    pub use crate::state::AppState;
}
