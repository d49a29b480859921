//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided collaborators (the Remote Store bridge
//! from [`CoreConfig`] and the Entity Stores from [`CoreDependencies`]) into
//! one sync coordinator and its scheduler. Hosts create exactly one
//! [`CoreService`] per process; tests create as many as they like.
//!
//! ```ignore
//! use core_service::{CoreConfig, CoreDependencies, CoreService};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .remote_store(Arc::new(MyCloudStore::new()))
//!     .build()?;
//! let (deps, stores) = CoreDependencies::in_memory();
//! let core = CoreService::start(config, deps).await?;
//!
//! stores.bookmarks.insert(Bookmark::new("https://example.com", "Example")).await?;
//! core.trigger_sync();
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_library::models::{
    Bookmark, BookmarkFolder, EntityKind, GenTab, GenTabComponent, ReadingListItem, TabGroup,
};
pub use core_library::store::{EntityStores, InMemoryStores};
pub use core_runtime::config::{CoreConfig, CoreConfigBuilder, FeatureFlags};
pub use core_runtime::events::{AvailabilityEvent, CoreEvent, EventStream, SyncEvent};
pub use core_sync::{ResolutionStrategy, SyncOutcome, SyncStatus};

use core_library::store::{change_channel, ChangeReceiver};
use core_runtime::events::EventBus;
use core_sync::{SchedulerHandle, SchedulerOptions, SyncConfig, SyncCoordinator, SyncScheduler};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Entity Stores and the channel they publish user mutations on.
pub struct CoreDependencies {
    pub stores: EntityStores,
    pub changes: ChangeReceiver,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit store handles.
    pub fn new(stores: EntityStores, changes: ChangeReceiver) -> Self {
        Self { stores, changes }
    }

    /// In-memory stores for hosts without their own persistence.
    ///
    /// The returned handles perform user writes that reach the scheduler.
    pub fn in_memory() -> (Self, InMemoryStores) {
        let (sender, receiver) = change_channel();
        let (stores, handles) = EntityStores::in_memory(sender);
        (Self::new(stores, receiver), handles)
    }
}

/// Primary façade exposed to host applications.
pub struct CoreService {
    coordinator: Arc<SyncCoordinator>,
    event_bus: EventBus,
    scheduler: Mutex<Option<SchedulerHandle>>,
}

impl CoreService {
    /// Build the coordinator and start the scheduling loop.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - `CoreError::InitializationFailed` outside a tokio runtime
    /// - `CoreError::Runtime` if the configuration is invalid
    pub async fn start(config: CoreConfig, deps: CoreDependencies) -> Result<Self> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(CoreError::InitializationFailed(
                "CoreService must be started inside a tokio runtime".to_string(),
            ));
        }
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let coordinator = Arc::new(SyncCoordinator::new(
            SyncConfig::from_core_config(&config),
            Arc::clone(&config.remote_store),
            deps.stores,
            event_bus.clone(),
            Arc::clone(&config.clock),
        ));

        let availability = if config.features.enable_sync_on_reconnect {
            match config.remote_store.subscribe_availability().await {
                Ok(stream) => Some(stream),
                Err(err) => {
                    warn!(error = %err, "Remote availability stream unavailable, reconnect syncs disabled");
                    None
                }
            }
        } else {
            None
        };

        let scheduler = SyncScheduler::spawn(
            Arc::clone(&coordinator),
            deps.changes,
            availability,
            SchedulerOptions::from(config.features),
        );

        info!(
            sync_interval_secs = config.sync_interval.as_secs(),
            "Core service started"
        );

        Ok(Self {
            coordinator,
            event_bus,
            scheduler: Mutex::new(Some(scheduler)),
        })
    }

    /// Access the coordinator driving this service.
    pub fn coordinator(&self) -> Arc<SyncCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Subscribe to sync and availability events.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    /// Fire-and-forget full pass.
    pub fn trigger_sync(&self) -> JoinHandle<()> {
        self.coordinator.trigger_sync()
    }

    pub async fn sync_if_needed(&self) -> Result<SyncOutcome> {
        Ok(self.coordinator.sync_if_needed().await?)
    }

    pub async fn perform_full_sync(&self) -> Result<SyncOutcome> {
        Ok(self.coordinator.perform_full_sync().await?)
    }

    pub async fn status(&self) -> SyncStatus {
        self.coordinator.status().await
    }

    pub async fn mark_changed(&self, kind: EntityKind) {
        self.coordinator.mark_changed(kind).await;
    }

    pub async fn strategy(&self) -> ResolutionStrategy {
        self.coordinator.strategy().await
    }

    pub async fn set_strategy(&self, strategy: ResolutionStrategy) {
        self.coordinator.set_strategy(strategy).await;
    }

    pub async fn conflict_report(&self) -> String {
        self.coordinator.conflict_report().await
    }

    /// Propagate a local deletion to the remote replica.
    pub async fn delete_remote(&self, kind: EntityKind, id: Uuid) -> Result<()> {
        Ok(self.coordinator.delete_remote(kind, id).await?)
    }

    /// Stop the scheduling loop. A pass already running completes; manual
    /// calls keep working afterwards.
    pub async fn shutdown(&self) {
        let handle = self.scheduler.lock().await.take();
        match handle {
            Some(handle) => {
                handle.shutdown().await;
                info!("Core service stopped");
            }
            None => warn!("Core service already stopped"),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.scheduler
            .lock()
            .await
            .as_ref()
            .is_some_and(SchedulerHandle::is_running)
    }
}

/// Install the configured logging subscriber, then start the service.
///
/// An already installed global subscriber is kept.
pub async fn bootstrap(config: CoreConfig, deps: CoreDependencies) -> Result<CoreService> {
    if let Err(err) = core_runtime::logging::init_logging(config.logging.clone()) {
        warn!(error = %err, "Keeping existing logging subscriber");
    }
    CoreService::start(config, deps).await
}
