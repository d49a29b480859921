//! Workspace facade crate.
//!
//! Host applications depend on `tabsync-workspace` and get the sync service
//! façade plus the crates it is built from, without wiring each workspace
//! member individually.

pub use core_service::*;
