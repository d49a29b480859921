use bridge_traits::BridgeError;
use core_library::error::LibraryError;
use core_library::models::EntityKind;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote store error: {0}")]
    Remote(#[from] BridgeError),

    #[error("Entity store error: {0}")]
    Library(#[from] LibraryError),

    #[error("Cannot resolve {kind} {local} against {remote}: identities differ")]
    IdentityMismatch {
        kind: EntityKind,
        local: Uuid,
        remote: Uuid,
    },

    #[error("Record encoding failed: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Why a remote record could not be turned into a typed entity.
///
/// Decode failures are logged and the record skipped; they never abort a
/// pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Unknown record type: {0}")]
    UnknownType(String),

    #[error("Malformed record name: {0}")]
    BadRecordName(String),

    #[error("Record {record_name} has type {record_type} but its name says otherwise")]
    TypeMismatch {
        record_type: String,
        record_name: String,
    },

    #[error("Record {record_name} is missing field {field}")]
    MissingField { record_name: String, field: String },

    #[error("Record {record_name} field {field} is invalid: {message}")]
    InvalidField {
        record_name: String,
        field: String,
        message: String,
    },
}
