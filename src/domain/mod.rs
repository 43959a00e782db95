//! Domain layer containing business entities and logic.
//!
//! Nothing in here knows about HTTP, PostgreSQL or Redis. Repository traits
//! define the contracts implemented by the infrastructure layer.
//!
//! # Architecture
//!
//! - [`entities`] - Links, clicks and their routing configuration
//! - [`repositories`] - Data access trait definitions
//! - [`redirect`] - Pure redirect policy: access checks and destination choice
//! - [`visitor`] - User agent and geolocation parsing contracts
//! - [`click_event`] - Click tracking event model
//! - [`click_recorder`] - Fire-and-forget click submission
//! - [`click_worker`] - Asynchronous click processing worker
//!
//! # Click Processing Flow
//!
//! 1. The redirect resolver decides the outcome
//! 2. A [`click_event::ClickEvent`] is handed to a [`click_recorder::ClickRecorder`]
//! 3. [`click_worker::run_click_worker`] persists it with retry logic
//! 4. The link's click counter is incremented atomically in storage

pub mod click_event;
pub mod click_recorder;
pub mod click_worker;
pub mod entities;
pub mod redirect;
pub mod repositories;
pub mod visitor;
