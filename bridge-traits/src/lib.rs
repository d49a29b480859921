//! # Host Bridge Traits
//!
//! Contracts between the sync engine and its external collaborators.
//!
//! ## Overview
//!
//! The engine decides *when* to synchronize and *how* to resolve divergence.
//! Everything else is a collaborator reached through a trait defined here:
//!
//! - [`RemoteStore`](remote::RemoteStore) - Pull change batches, push records,
//!   report availability of the cloud backend
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! Entity Stores are typed per entity and live next to the models in
//! `core-library`.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert transport-specific failures into it with an actionable
//! message (which record, which operation).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single implementation can be
//! shared between the sync scheduler and manual triggers.

pub mod error;
pub mod remote;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use remote::{AvailabilityStream, ChangeBatch, FieldValue, RemoteRecord, RemoteStore};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
