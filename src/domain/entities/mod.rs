//! Core domain entities.
//!
//! - [`Link`] - A short link with its routing rules and limits
//! - [`Click`] - A recorded redirect of a short link
//!
//! Creation inputs live next to their entity (`NewLink`, `NewClick`), as does
//! the partial-update type [`LinkPatch`].

pub mod click;
pub mod link;

pub use click::{Click, NewClick, UtmParams};
pub use link::{
    AbTestConfig, AbVariant, GeoRedirects, Link, LinkPatch, NewLink, Platform, SmartRedirects,
};
