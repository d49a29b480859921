//! # Core Configuration Module
//!
//! Provides configuration management for the sync core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the injected collaborators and settings for the sync
//! engine. It enforces fail-fast validation so a host that forgot to provide
//! the Remote Store bridge finds out at startup, not at the first sync pass.
//!
//! ## Required Dependencies
//!
//! - `RemoteStore` - Pull/push access to the cloud replica
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `Clock` - Time source stamping `last_sync_at` (default: `SystemClock`)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .remote_store(Arc::new(MyCloudStore::new()))
//!     .sync_interval(Duration::from_secs(60))
//!     .sync_on_reconnect(true)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! The builder reports a missing Remote Store as
//! [`Error::CapabilityMissing`] and invalid values as [`Error::Config`].

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use crate::logging::LoggingConfig;
use bridge_traits::{Clock, RemoteStore, SystemClock};
use std::sync::Arc;
use std::time::Duration;

/// Default period of the sync timer.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Shortest accepted sync timer period.
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Core configuration for the sync core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Remote replica access (required)
    pub remote_store: Arc<dyn RemoteStore>,

    /// Time source for sync timestamps
    pub clock: Arc<dyn Clock>,

    /// Period of the recurring sync timer
    pub sync_interval: Duration,

    /// Buffer size of the event bus channel
    pub event_buffer_size: usize,

    /// Features flags
    pub features: FeatureFlags,

    /// Logging setup applied by hosts that let the core own the subscriber
    pub logging: LoggingConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("remote_store", &"RemoteStore { ... }")
            .field("clock", &"Clock { ... }")
            .field("sync_interval", &self.sync_interval)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional scheduling behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Run `sync_if_needed` on the recurring timer
    pub enable_periodic_sync: bool,

    /// Run a full pass when the remote becomes available again
    pub enable_sync_on_reconnect: bool,

    /// Keep the pending-change counter when a pass fails
    pub preserve_pending_on_failure: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_periodic_sync: true,
            enable_sync_on_reconnect: true,
            preserve_pending_on_failure: true,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The sync interval is at least [`MIN_SYNC_INTERVAL`]
    /// - The event buffer can hold at least one event
    pub fn validate(&self) -> Result<()> {
        if self.sync_interval < MIN_SYNC_INTERVAL {
            return Err(Error::Config(format!(
                "Sync interval must be at least {:?}, got {:?}",
                MIN_SYNC_INTERVAL, self.sync_interval
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn remote_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "RemoteStore".to_string(),
        message: "RemoteStore implementation is required to pull and push records. \
                 Inject the cloud backend adapter with .remote_store()."
            .to_string(),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    remote_store: Option<Arc<dyn RemoteStore>>,
    clock: Option<Arc<dyn Clock>>,
    sync_interval: Option<Duration>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
    logging: Option<LoggingConfig>,
}

impl CoreConfigBuilder {
    /// Sets the Remote Store bridge (required).
    pub fn remote_store(mut self, store: Arc<dyn RemoteStore>) -> Self {
        self.remote_store = Some(store);
        self
    }

    /// Sets the time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the recurring sync timer period (default 30 seconds).
    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    /// Sets the event bus buffer size.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Enables or disables the recurring sync timer.
    pub fn periodic_sync(mut self, enabled: bool) -> Self {
        self.features.enable_periodic_sync = enabled;
        self
    }

    /// Enables or disables the full pass on remote reconnect.
    pub fn sync_on_reconnect(mut self, enabled: bool) -> Self {
        self.features.enable_sync_on_reconnect = enabled;
        self
    }

    /// Keep (true) or clear (false) pending changes after a failed pass.
    pub fn preserve_pending_on_failure(mut self, enabled: bool) -> Self {
        self.features.preserve_pending_on_failure = enabled;
        self
    }

    /// Sets all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Sets the logging configuration.
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds the final `CoreConfig`, validating all settings.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] if no Remote Store was provided
    /// - [`Error::Config`] if a value is out of range
    pub fn build(self) -> Result<CoreConfig> {
        let remote_store = self.remote_store.ok_or_else(remote_store_missing_error)?;

        let config = CoreConfig {
            remote_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            sync_interval: self.sync_interval.unwrap_or(DEFAULT_SYNC_INTERVAL),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}
