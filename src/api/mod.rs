//! HTTP API layer.
//!
//! Translates requests into service calls and renders the results.
//!
//! - [`dto`] - Request and response bodies
//! - [`handlers`] - Endpoint handlers
//! - [`middleware`] - Authentication, rate limiting and tracing
//! - [`routes`] - Route tables

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
