//! # Sync Coordinator
//!
//! Orchestrates sync passes between the local Entity Stores and the Remote
//! Store.
//!
//! ## Overview
//!
//! The `SyncCoordinator` owns the only mutable sync state in the process:
//! whether a pass is running, how many local changes are pending and when the
//! last pass succeeded. All of it lives behind one async mutex; the guard is
//! checked and set in a single lock scope and the lock is never held across
//! a call to the Remote Store.
//!
//! ## Workflow
//!
//! 1. Skip (not an error) if the Remote Store is unavailable
//! 2. Pull the change batch accumulated since the last pull
//! 3. Classify it into typed changes and tombstones
//! 4. Resolve each change against its local counterpart and write the result
//! 5. Remove local records named by tombstones (missing ids are a no-op)
//! 6. Push every local collection in full, folders first
//! 7. Stamp `last_sync_at`
//!
//! Any error in steps 2-6 aborts the pass; the next trigger starts over.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncConfig, SyncCoordinator};
//! use std::sync::Arc;
//!
//! let coordinator = Arc::new(SyncCoordinator::new(
//!     SyncConfig::default(),
//!     remote_store,
//!     entity_stores,
//!     event_bus,
//!     clock,
//! ));
//!
//! coordinator.mark_bookmarks_changed().await;
//! coordinator.sync_if_needed().await?;
//! println!("{}", coordinator.conflict_report().await);
//! ```

use crate::{
    classifier::{classify, RemoteChange},
    conflict_resolver::{
        ConflictResolutionStats, ConflictResolver, Mergeable, Resolution, ResolutionStrategy,
    },
    record::{record_name, RecordCodec},
    Result,
};
use bridge_traits::{Clock, RemoteStore};
use chrono::{DateTime, Utc};
use core_library::models::EntityKind;
use core_library::store::{EntityStore, EntityStores};
use core_runtime::config::{CoreConfig, DEFAULT_SYNC_INTERVAL};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use core_runtime::logging::redact_url;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

/// What happens to the pending-change counter when a pass ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingChangesPolicy {
    /// A successful pass subtracts the count seen when it started, so marks
    /// arriving mid-pass survive. A failed pass keeps the counter.
    #[default]
    PreserveOnFailure,

    /// Every pass that ran clears the counter, successful or not.
    ResetAlways,
}

/// Sync coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Period of the recurring `sync_if_needed` timer
    pub sync_interval: Duration,

    /// Strategy in effect until `set_strategy` is called
    pub default_strategy: ResolutionStrategy,

    pub pending_policy: PendingChangesPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval: DEFAULT_SYNC_INTERVAL,
            default_strategy: ResolutionStrategy::default(),
            pending_policy: PendingChangesPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Derive the engine settings from the validated core configuration.
    pub fn from_core_config(config: &CoreConfig) -> Self {
        let pending_policy = if config.features.preserve_pending_on_failure {
            PendingChangesPolicy::PreserveOnFailure
        } else {
            PendingChangesPolicy::ResetAlways
        };

        Self {
            sync_interval: config.sync_interval,
            default_strategy: ResolutionStrategy::default(),
            pending_policy,
        }
    }

    pub fn with_strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }
}

/// Snapshot of the coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStatus {
    pub is_syncing: bool,
    pub pending_changes: u64,
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Counts of one completed pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub pass_id: Uuid,

    /// Remote values written into local stores (additions and resolved conflicts)
    pub records_applied: u64,

    /// Local records removed by tombstones
    pub records_deleted: u64,

    /// Records accepted by the Remote Store during push
    pub records_pushed: u64,

    /// Changed records that failed to decode
    pub skipped_records: u64,

    /// Tombstones that failed to decode
    pub skipped_tombstones: u64,

    pub stats: ConflictResolutionStats,

    pub duration: Duration,
}

/// How a sync request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The pass ran to completion
    Completed(PassSummary),

    /// Another pass was already running; nothing happened
    AlreadyRunning,

    /// The Remote Store was unavailable; nothing happened
    RemoteUnavailable,

    /// `sync_if_needed` found no pending changes
    NothingPending,
}

impl SyncOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SyncOutcome::Completed(_))
    }
}

#[derive(Debug)]
struct CoordinatorState {
    is_syncing: bool,
    pending_changes: u64,
    last_sync_at: Option<DateTime<Utc>>,
    strategy: ResolutionStrategy,
    last_stats: ConflictResolutionStats,
}

/// Sync coordinator for orchestrating synchronization
pub struct SyncCoordinator {
    config: SyncConfig,

    /// Cloud replica
    remote: Arc<dyn RemoteStore>,

    /// Local collections, one store per entity type
    stores: EntityStores,

    /// Event bus for emitting sync events
    event_bus: EventBus,

    clock: Arc<dyn Clock>,

    state: Arc<Mutex<CoordinatorState>>,
}

impl SyncCoordinator {
    /// Create a new sync coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - Sync configuration
    /// * `remote` - Remote Store bridge
    /// * `stores` - Entity Stores the engine reads and writes during a pass
    /// * `event_bus` - Event bus for pass and availability events
    /// * `clock` - Time source for `last_sync_at`
    pub fn new(
        config: SyncConfig,
        remote: Arc<dyn RemoteStore>,
        stores: EntityStores,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = CoordinatorState {
            is_syncing: false,
            pending_changes: 0,
            last_sync_at: None,
            strategy: config.default_strategy,
            last_stats: ConflictResolutionStats::default(),
        };

        Self {
            config,
            remote,
            stores,
            event_bus,
            clock,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Count one local change of `kind`. Nothing else happens until the next
    /// pass.
    pub async fn mark_changed(&self, kind: EntityKind) {
        let mut state = self.state.lock().await;
        state.pending_changes = state.pending_changes.saturating_add(1);
        debug!(%kind, pending = state.pending_changes, "Local change recorded");
    }

    pub async fn mark_bookmarks_changed(&self) {
        self.mark_changed(EntityKind::Bookmark).await;
    }

    pub async fn mark_bookmark_folders_changed(&self) {
        self.mark_changed(EntityKind::BookmarkFolder).await;
    }

    pub async fn mark_reading_list_changed(&self) {
        self.mark_changed(EntityKind::ReadingListItem).await;
    }

    pub async fn mark_gen_tabs_changed(&self) {
        self.mark_changed(EntityKind::GenTab).await;
    }

    pub async fn mark_tab_groups_changed(&self) {
        self.mark_changed(EntityKind::TabGroup).await;
    }

    pub async fn status(&self) -> SyncStatus {
        let state = self.state.lock().await;
        SyncStatus {
            is_syncing: state.is_syncing,
            pending_changes: state.pending_changes,
            last_sync_at: state.last_sync_at,
        }
    }

    pub async fn strategy(&self) -> ResolutionStrategy {
        self.state.lock().await.strategy
    }

    /// Select the strategy used from the next pass on.
    pub async fn set_strategy(&self, strategy: ResolutionStrategy) {
        let mut state = self.state.lock().await;
        if state.strategy != strategy {
            info!(from = %state.strategy, to = %strategy, "Resolution strategy changed");
            state.strategy = strategy;
        }
    }

    /// Conflict tallies of the last completed pass and the active strategy.
    pub async fn conflict_report(&self) -> String {
        let state = self.state.lock().await;
        state.last_stats.report(state.strategy)
    }

    /// Run a pass only if local changes are pending.
    pub async fn sync_if_needed(&self) -> Result<SyncOutcome> {
        let pending = self.state.lock().await.pending_changes;
        if pending == 0 {
            debug!("No pending changes, skipping sync");
            return Ok(SyncOutcome::NothingPending);
        }
        self.perform_full_sync().await
    }

    /// Run a full pull-resolve-apply-push pass.
    ///
    /// Returns immediately with [`SyncOutcome::AlreadyRunning`] if another
    /// pass holds the guard.
    ///
    /// # Errors
    ///
    /// Returns the Remote Store or Entity Store error that aborted the pass.
    /// The error has already been logged and published as
    /// `SyncEvent::Failed`.
    #[instrument(skip(self))]
    pub async fn perform_full_sync(&self) -> Result<SyncOutcome> {
        let (strategy, pending_at_start) = {
            let mut state = self.state.lock().await;
            if state.is_syncing {
                info!("Sync already in progress, ignoring trigger");
                return Ok(SyncOutcome::AlreadyRunning);
            }
            state.is_syncing = true;
            (state.strategy, state.pending_changes)
        };
        let guard = PassGuard::new(Arc::clone(&self.state));

        let pass_id = Uuid::new_v4();
        let span = info_span!("sync_pass", %pass_id, %strategy);
        let result = self
            .run_pass(pass_id, strategy, pending_at_start)
            .instrument(span)
            .await;

        let mut state = self.state.lock().await;
        state.is_syncing = false;
        guard.disarm();

        match result {
            Ok(Some(summary)) => {
                state.last_sync_at = Some(self.clock.now());
                state.pending_changes = match self.config.pending_policy {
                    PendingChangesPolicy::PreserveOnFailure => {
                        state.pending_changes.saturating_sub(pending_at_start)
                    }
                    PendingChangesPolicy::ResetAlways => 0,
                };
                state.last_stats = summary.stats.clone();
                drop(state);

                info!(
                    %pass_id,
                    applied = summary.records_applied,
                    deleted = summary.records_deleted,
                    pushed = summary.records_pushed,
                    conflicts = summary.stats.total_conflicts(),
                    duration_ms = summary.duration.as_millis() as u64,
                    "Sync pass completed"
                );
                self.emit(SyncEvent::Completed {
                    pass_id: pass_id.to_string(),
                    records_applied: summary.records_applied,
                    records_deleted: summary.records_deleted,
                    records_pushed: summary.records_pushed,
                    conflicts: summary.stats.total_conflicts(),
                    duration_ms: summary.duration.as_millis() as u64,
                });
                Ok(SyncOutcome::Completed(summary))
            }
            Ok(None) => {
                drop(state);
                info!("Remote store unavailable, skipping sync");
                self.emit(SyncEvent::Skipped {
                    reason: "remote unavailable".to_string(),
                });
                Ok(SyncOutcome::RemoteUnavailable)
            }
            Err(err) => {
                if self.config.pending_policy == PendingChangesPolicy::ResetAlways {
                    state.pending_changes = 0;
                }
                drop(state);

                error!(%pass_id, error = %err, "Sync pass failed");
                self.emit(SyncEvent::Failed {
                    pass_id: pass_id.to_string(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Start a full pass in the background.
    ///
    /// The returned handle may be dropped; failures are logged by the pass.
    pub fn trigger_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = coordinator.perform_full_sync().await {
                debug!(error = %err, "Triggered sync ended with an error");
            }
        })
    }

    /// Delete the remote record of a locally deleted entity.
    ///
    /// Full pushes never remove remote records, so local deletions must be
    /// propagated through this call.
    #[instrument(skip(self))]
    pub async fn delete_remote(&self, kind: EntityKind, id: Uuid) -> Result<()> {
        let name = record_name(kind, id);
        match self.remote.delete(&name).await {
            Ok(()) => {
                info!(record_name = %name, "Deleted remote record");
                Ok(())
            }
            Err(err) => {
                error!(record_name = %name, error = %err, "Failed to delete remote record");
                Err(err.into())
            }
        }
    }

    /// Body of a pass. `Ok(None)` means the remote was unavailable.
    async fn run_pass(
        &self,
        pass_id: Uuid,
        strategy: ResolutionStrategy,
        pending_changes: u64,
    ) -> Result<Option<PassSummary>> {
        if !self.remote.is_available().await {
            return Ok(None);
        }

        let started = Instant::now();
        self.emit(SyncEvent::Started {
            pass_id: pass_id.to_string(),
            pending_changes,
        });

        let batch = self.remote.fetch_changes().await?;
        let classified = classify(&batch);
        if classified.is_empty() {
            debug!("No remote changes since last pull");
        }
        if classified.skipped_records > 0 || classified.skipped_tombstones > 0 {
            warn!(
                skipped_records = classified.skipped_records,
                skipped_tombstones = classified.skipped_tombstones,
                "Some remote changes could not be decoded"
            );
        }

        let resolver = ConflictResolver::new(strategy);
        let mut stats = ConflictResolutionStats::default();
        let mut records_applied = 0u64;

        for change in classified.changes {
            debug!(
                kind = %change.kind(),
                id = %change.id(),
                url = %change.url().map(redact_url).unwrap_or_default(),
                "Applying remote change"
            );
            let applied = match change {
                RemoteChange::Bookmark(remote) => {
                    apply_change(self.stores.bookmarks.as_ref(), &resolver, remote, &mut stats)
                        .await?
                }
                RemoteChange::BookmarkFolder(remote) => {
                    apply_change(
                        self.stores.bookmark_folders.as_ref(),
                        &resolver,
                        remote,
                        &mut stats,
                    )
                    .await?
                }
                RemoteChange::ReadingListItem(remote) => {
                    apply_change(self.stores.reading_list.as_ref(), &resolver, remote, &mut stats)
                        .await?
                }
                RemoteChange::GenTab(remote) => {
                    apply_change(self.stores.gen_tabs.as_ref(), &resolver, remote, &mut stats)
                        .await?
                }
                RemoteChange::TabGroup(remote) => {
                    apply_change(self.stores.tab_groups.as_ref(), &resolver, remote, &mut stats)
                        .await?
                }
            };
            if applied {
                records_applied += 1;
            }
        }

        let mut records_deleted = 0u64;
        for deletion in classified.deletions {
            let removed = match deletion.kind {
                EntityKind::Bookmark => self.stores.bookmarks.apply_removal(deletion.id).await?,
                EntityKind::BookmarkFolder => {
                    self.stores.bookmark_folders.apply_removal(deletion.id).await?
                }
                EntityKind::ReadingListItem => {
                    self.stores.reading_list.apply_removal(deletion.id).await?
                }
                EntityKind::GenTab => self.stores.gen_tabs.apply_removal(deletion.id).await?,
                EntityKind::TabGroup => self.stores.tab_groups.apply_removal(deletion.id).await?,
            };
            if removed {
                stats.record_deleted(deletion.kind);
                records_deleted += 1;
            } else {
                debug!(kind = %deletion.kind, id = %deletion.id, "Tombstone for unknown local id");
            }
        }

        let records_pushed = self.push_all().await?;

        Ok(Some(PassSummary {
            pass_id,
            records_applied,
            records_deleted,
            records_pushed,
            skipped_records: classified.skipped_records as u64,
            skipped_tombstones: classified.skipped_tombstones as u64,
            stats,
            duration: started.elapsed(),
        }))
    }

    /// Push every collection in full. Folders go first so bookmarks never
    /// reference a folder the remote has not seen.
    async fn push_all(&self) -> Result<u64> {
        let mut pushed = 0u64;
        for kind in EntityKind::ALL {
            pushed += match kind {
                EntityKind::BookmarkFolder => {
                    self.push_collection(self.stores.bookmark_folders.as_ref()).await?
                }
                EntityKind::Bookmark => self.push_collection(self.stores.bookmarks.as_ref()).await?,
                EntityKind::ReadingListItem => {
                    self.push_collection(self.stores.reading_list.as_ref()).await?
                }
                EntityKind::GenTab => self.push_collection(self.stores.gen_tabs.as_ref()).await?,
                EntityKind::TabGroup => {
                    self.push_collection(self.stores.tab_groups.as_ref()).await?
                }
            };
        }
        Ok(pushed)
    }

    async fn push_collection<T: RecordCodec>(&self, store: &dyn EntityStore<T>) -> Result<u64> {
        let snapshot = store.snapshot().await?;
        if snapshot.is_empty() {
            return Ok(0);
        }

        let records = snapshot
            .iter()
            .map(RecordCodec::to_record)
            .collect::<Result<Vec<_>>>()?;
        let saved = self.remote.save_records(records).await?;
        debug!(kind = %T::KIND, count = saved.len(), "Pushed collection");
        Ok(saved.len() as u64)
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.event_bus.emit(CoreEvent::Sync(event));
    }
}

/// Clears `is_syncing` if a pass future is dropped or unwinds before it
/// reaches its own cleanup.
struct PassGuard {
    state: Arc<Mutex<CoordinatorState>>,
    armed: bool,
}

impl PassGuard {
    fn new(state: Arc<Mutex<CoordinatorState>>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        warn!("Sync pass abandoned before completion, releasing guard");
        if let Ok(mut state) = self.state.try_lock() {
            state.is_syncing = false;
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let state = Arc::clone(&self.state);
                handle.spawn(async move {
                    state.lock().await.is_syncing = false;
                });
            }
            Err(_) => error!("No runtime to release the sync guard; syncing stays blocked"),
        }
    }
}

/// Write one remote change into its store. Returns whether anything was
/// written.
async fn apply_change<T: Mergeable>(
    store: &dyn EntityStore<T>,
    resolver: &ConflictResolver,
    remote: T,
    stats: &mut ConflictResolutionStats,
) -> Result<bool> {
    match store.get(remote.id()).await? {
        Some(local) => match resolver.resolve(&local, &remote)? {
            Resolution::NoChange => Ok(false),
            Resolution::Resolved(value) => {
                stats.record_conflict(T::KIND);
                if value == local {
                    return Ok(false);
                }
                store.apply_upsert(value).await?;
                Ok(true)
            }
        },
        None => {
            store.apply_upsert(remote).await?;
            stats.record_added(T::KIND);
            Ok(true)
        }
    }
}
