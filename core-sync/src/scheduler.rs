//! # Sync Scheduler
//!
//! Background loop that decides *when* the coordinator runs.
//!
//! One tokio task selects over four sources:
//! - the recurring timer, which calls `sync_if_needed`
//! - the store-change channel, which calls `mark_changed`
//! - the Remote Store availability stream; a transition to available runs a
//!   full pass unconditionally
//! - a cancellation token, which ends the loop
//!
//! Passes run inline in the loop, so store changes that arrive during a pass
//! are counted once it ends. Cancelling stops the loop only; a pass that is
//! already running finishes first.

use crate::coordinator::SyncCoordinator;
use bridge_traits::AvailabilityStream;
use core_library::store::ChangeReceiver;
use core_runtime::config::FeatureFlags;
use core_runtime::events::{AvailabilityEvent, CoreEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Which triggers the scheduler reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    pub periodic_sync: bool,
    pub sync_on_reconnect: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            periodic_sync: true,
            sync_on_reconnect: true,
        }
    }
}

impl From<FeatureFlags> for SchedulerOptions {
    fn from(features: FeatureFlags) -> Self {
        Self {
            periodic_sync: features.enable_periodic_sync,
            sync_on_reconnect: features.enable_sync_on_reconnect,
        }
    }
}

/// Handle to a running scheduler loop.
#[derive(Debug)]
pub struct SchedulerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(err) = self.task.await {
            error!(error = %err, "Sync scheduler task panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Token that stops the loop when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }
}

pub struct SyncScheduler;

impl SyncScheduler {
    /// Start the scheduling loop for `coordinator`.
    ///
    /// `availability` is optional; without it the scheduler never reacts to
    /// reconnects.
    pub fn spawn(
        coordinator: Arc<SyncCoordinator>,
        changes: ChangeReceiver,
        availability: Option<Box<dyn AvailabilityStream>>,
        options: SchedulerOptions,
    ) -> SchedulerHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            coordinator,
            changes,
            availability,
            options,
            token.clone(),
        ));
        SchedulerHandle { token, task }
    }
}

async fn next_availability(stream: &mut Option<Box<dyn AvailabilityStream>>) -> Option<bool> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn run_loop(
    coordinator: Arc<SyncCoordinator>,
    mut changes: ChangeReceiver,
    mut availability: Option<Box<dyn AvailabilityStream>>,
    options: SchedulerOptions,
    token: CancellationToken,
) {
    let period: Duration = coordinator.config().sync_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut changes_open = true;
    let mut last_available: Option<bool> = None;

    info!(interval_secs = period.as_secs(), ?options, "Sync scheduler started");

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => break,

            change = changes.recv(), if changes_open => match change {
                Some(change) => coordinator.mark_changed(change.kind).await,
                None => {
                    debug!("Store change channel closed");
                    changes_open = false;
                }
            },

            available = next_availability(&mut availability), if availability.is_some() => match available {
                Some(available) => {
                    let was_available = last_available.replace(available);
                    if was_available == Some(available) {
                        continue;
                    }

                    let event = if available {
                        AvailabilityEvent::Available
                    } else {
                        AvailabilityEvent::Unavailable
                    };
                    info!(available, "Remote store availability changed");
                    let _ = coordinator.event_bus().emit(CoreEvent::Availability(event));

                    if available && options.sync_on_reconnect {
                        if let Err(err) = coordinator.perform_full_sync().await {
                            debug!(error = %err, "Reconnect sync ended with an error");
                        }
                    }
                }
                None => {
                    warn!("Availability stream closed, reconnect syncs disabled");
                    availability = None;
                }
            },

            _ = ticker.tick(), if options.periodic_sync => {
                if let Err(err) = coordinator.sync_if_needed().await {
                    debug!(error = %err, "Periodic sync ended with an error");
                }
            }
        }
    }

    info!("Sync scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{SyncConfig, SyncOutcome};
    use crate::test_support::{channel_availability, MockRemote};
    use bridge_traits::remote::ChangeBatch;
    use bridge_traits::SystemClock;
    use core_library::models::{EntityKind, TabGroup};
    use core_library::store::{change_channel, EntityStores};
    use core_runtime::events::{EventBus, EventStream, SyncEvent};

    fn coordinator(remote: MockRemote, interval: Duration) -> (Arc<SyncCoordinator>, EntityStores) {
        let (sender, _) = change_channel();
        let (stores, _) = EntityStores::in_memory(sender);
        let config = SyncConfig {
            sync_interval: interval,
            ..SyncConfig::default()
        };
        let coordinator = SyncCoordinator::new(
            config,
            Arc::new(remote),
            stores.clone(),
            EventBus::new(32),
            Arc::new(SystemClock),
        );
        (Arc::new(coordinator), stores)
    }

    #[tokio::test]
    async fn test_store_changes_are_counted() {
        let (coordinator, _) = coordinator(MockRemote::new(), Duration::from_secs(3600));
        let (sender, receiver) = change_channel();
        let (_stores, handles) = EntityStores::in_memory(sender);

        let handle = SyncScheduler::spawn(
            coordinator.clone(),
            receiver,
            None,
            SchedulerOptions {
                periodic_sync: false,
                sync_on_reconnect: false,
            },
        );

        handles.tab_groups.insert(TabGroup::new("A")).await.unwrap();
        handles.tab_groups.insert(TabGroup::new("B")).await.unwrap();
        // Dropping every sender closes the channel once both changes are read
        drop(handles);
        drop(_stores);

        for _ in 0..50 {
            if coordinator.status().await.pending_changes == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(coordinator.status().await.pending_changes, 2);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reconnect_runs_full_sync() {
        let mut remote = MockRemote::new();
        remote.expect_is_available().returning(|| true);
        remote
            .expect_fetch_changes()
            .times(1)
            .returning(|| Ok(ChangeBatch::default()));

        let (coordinator, _) = coordinator(remote, Duration::from_secs(3600));
        let mut events = EventStream::new(coordinator.event_bus().subscribe());
        let (_sender, receiver) = change_channel();
        let (availability_tx, availability) = channel_availability();

        let handle = SyncScheduler::spawn(
            coordinator.clone(),
            receiver,
            Some(availability),
            SchedulerOptions::default(),
        );

        availability_tx.send(true).unwrap();
        // Repeated value is not a transition
        availability_tx.send(true).unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Availability(AvailabilityEvent::Available)
        );
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Sync(SyncEvent::Started { .. })
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Sync(SyncEvent::Completed { .. })
        ));

        handle.shutdown().await;
        assert!(coordinator.status().await.last_sync_at.is_some());
    }

    #[tokio::test]
    async fn test_going_offline_emits_event_without_sync() {
        let mut remote = MockRemote::new();
        remote.expect_is_available().never();

        let (coordinator, _) = coordinator(remote, Duration::from_secs(3600));
        let mut events = EventStream::new(coordinator.event_bus().subscribe());
        let (_sender, receiver) = change_channel();
        let (availability_tx, availability) = channel_availability();

        let handle = SyncScheduler::spawn(
            coordinator.clone(),
            receiver,
            Some(availability),
            SchedulerOptions::default(),
        );

        availability_tx.send(false).unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Availability(AvailabilityEvent::Unavailable)
        );

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_syncs_only_when_pending() {
        let mut remote = MockRemote::new();
        remote.expect_is_available().times(1).returning(|| false);

        let (coordinator, _) = coordinator(remote, Duration::from_secs(30));
        let mut events = EventStream::new(coordinator.event_bus().subscribe());
        let (_sender, receiver) = change_channel();

        let handle = SyncScheduler::spawn(
            coordinator.clone(),
            receiver,
            None,
            SchedulerOptions::default(),
        );

        // First tick with nothing pending does nothing
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(events.try_recv().is_none());

        coordinator.mark_changed(EntityKind::GenTab).await;
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Sync(SyncEvent::Skipped { .. })
        ));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let (coordinator, _) = coordinator(MockRemote::new(), Duration::from_secs(3600));
        let (_sender, receiver) = change_channel();

        let handle = SyncScheduler::spawn(coordinator.clone(), receiver, None, SchedulerOptions::default());
        assert!(handle.is_running());
        let token = handle.cancellation_token();

        handle.shutdown().await;
        assert!(token.is_cancelled());

        // The coordinator stays usable after the loop is gone
        assert_eq!(coordinator.sync_if_needed().await.unwrap(), SyncOutcome::NothingPending);
    }
}
