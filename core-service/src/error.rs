use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),
}

impl CoreError {
    /// Whether the host forgot to inject a required bridge.
    pub fn is_capability_missing(&self) -> bool {
        matches!(self, CoreError::Runtime(err) if err.is_capability_missing())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
