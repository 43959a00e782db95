//! Request and response bodies of the HTTP API.
//!
//! Bodies are (de)serialized with Serde; request bodies are checked with
//! `validator` before they reach a service.

pub mod guest;
pub mod health;
pub mod link;
pub mod pagination;
pub mod redirect;
pub mod stats;
pub mod update_link;
