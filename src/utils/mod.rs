//! Helpers shared across layers.
//!
//! - [`code_generator`] - Short code and claim token generation
//! - [`destination`] - Destination URL validation and normalization
//! - [`client_ip`] - Client IP extraction from request headers
//! - [`ip_hash`] - Keyed IP anonymization
//! - [`password`] - Argon2id link passwords

pub mod client_ip;
pub mod code_generator;
pub mod destination;
pub mod ip_hash;
pub mod password;
