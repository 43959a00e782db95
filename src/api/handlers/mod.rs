//! HTTP request handlers.
//!
//! Handlers translate requests into service calls and service results into
//! responses; no business rules live here.

pub mod health;
pub mod links;
pub mod redirect;
pub mod stats;

pub use health::health_handler;
pub use links::{
    claim_link_handler, create_guest_link_handler, create_link_handler, delete_link_handler,
    get_link_handler, list_links_handler, update_link_handler,
};
pub use redirect::{redirect_handler, redirect_with_password_handler};
pub use stats::stats_handler;
