//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx with
//! runtime-checked queries and `FromRow` row structs.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] - Link storage, click counter and guest claiming
//! - [`PgStatsRepository`] - Click events and analytics queries
//! - [`PgTokenRepository`] - API token storage and validation

pub mod pg_link_repository;
pub mod pg_stats_repository;
pub mod pg_token_repository;

pub use pg_link_repository::PgLinkRepository;
pub use pg_stats_repository::PgStatsRepository;
pub use pg_token_repository::PgTokenRepository;
