//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the sync crates:
//! - Logging and tracing setup
//! - Configuration with fail-fast validation
//! - Event bus for sync and availability events
//!
//! ## Overview
//!
//! Nothing in here knows about entities or records. The sync engine takes a
//! [`config::CoreConfig`] and an [`events::EventBus`] from this crate and
//! logs through the subscriber installed by [`logging::init_logging`].

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
