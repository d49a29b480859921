use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    #[error("Remote record rejected: {record_name} - {reason}")]
    RecordRejected { record_name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, BridgeError>;
