//! # Sync Module
//!
//! Reconciles the local collections (bookmarks, bookmark folders, reading
//! list, GenTabs, tab groups) with the remote replica.
//!
//! ## Components
//!
//! - **Record Codec** (`record`): Entity <-> remote record schema
//! - **Change Classifier** (`classifier`): Decodes a pulled change batch into typed changes and tombstones
//! - **Conflict Resolver** (`conflict_resolver`): Strategies and per-entity merge rules
//! - **Sync Coordinator** (`coordinator`): Runs guarded pull-resolve-apply-push passes
//! - **Sync Scheduler** (`scheduler`): Timer, store-change and availability triggers

pub mod classifier;
pub mod conflict_resolver;
pub mod coordinator;
pub mod error;
pub mod record;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;

pub use classifier::{classify, decode_change, ClassifiedBatch, RemoteChange, RemoteDeletion};
pub use conflict_resolver::{
    BatchResolution, CategoryStats, ConflictResolutionStats, ConflictResolver, Mergeable,
    Resolution, ResolutionStrategy,
};
pub use coordinator::{
    PassSummary, PendingChangesPolicy, SyncConfig, SyncCoordinator, SyncOutcome, SyncStatus,
};
pub use error::{RecordError, Result, SyncError};
pub use record::{decode_record_name, record_name, RecordCodec};
pub use scheduler::{SchedulerHandle, SchedulerOptions, SyncScheduler};
