//! Remote Store Abstraction
//!
//! Opaque record-batch interface to the cloud backend that holds the remote
//! replica. The engine never sees the transport or the wire encoding; it only
//! exchanges [`RemoteRecord`]s and tombstone identifiers with the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

/// A single typed field value carried by a remote record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FieldValue {
    String(String),
    Int(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Bytes(Vec<u8>),
    StringList(Vec<String>),
}

/// Opaque record exchanged with the Remote Store.
///
/// `record_type` is the entity type discriminator and `record_name` the
/// stable record identifier (`"<type>-<uuid>"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub record_type: String,
    pub record_name: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl RemoteRecord {
    pub fn new(record_type: impl Into<String>, record_name: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            record_name: record_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a field, replacing any previous value.
    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Set a field only when a value is present.
    pub fn with_optional_field(self, key: impl Into<String>, value: Option<FieldValue>) -> Self {
        match value {
            Some(value) => self.with_field(key, value),
            None => self,
        }
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FieldValue::String(value)) => Some(value),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.fields.get(key) {
            Some(FieldValue::Bool(value)) => Some(*value),
            // Some backends store flags as integers
            Some(FieldValue::Int(value)) => Some(*value != 0),
            _ => None,
        }
    }

    pub fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.fields.get(key) {
            Some(FieldValue::Timestamp(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn bytes(&self, key: &str) -> Option<&[u8]> {
        match self.fields.get(key) {
            Some(FieldValue::Bytes(value)) => Some(value),
            _ => None,
        }
    }

    pub fn string_list(&self, key: &str) -> Option<&[String]> {
        match self.fields.get(key) {
            Some(FieldValue::StringList(value)) => Some(value),
            _ => None,
        }
    }
}

/// Changes observed on the remote replica since the last pull.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeBatch {
    /// Added or updated records
    pub changed_records: Vec<RemoteRecord>,
    /// Tombstone identifiers of deleted records
    pub deleted_record_ids: Vec<String>,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.changed_records.is_empty() && self.deleted_record_ids.is_empty()
    }
}

/// Remote Store trait
///
/// Provides pull (change batch) and push (record upsert/delete) operations
/// against the cloud backend, plus an availability signal.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::remote::RemoteStore;
///
/// async fn pull(store: &dyn RemoteStore) -> bridge_traits::error::Result<usize> {
///     if !store.is_available().await {
///         return Ok(0);
///     }
///     let batch = store.fetch_changes().await?;
///     Ok(batch.changed_records.len())
/// }
/// ```
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Whether the backend is currently reachable and signed in
    async fn is_available(&self) -> bool;

    /// Fetch the change batch accumulated since the last pull
    async fn fetch_changes(&self) -> Result<ChangeBatch>;

    /// Upsert a batch of records, returning the records as saved
    async fn save_records(&self, records: Vec<RemoteRecord>) -> Result<Vec<RemoteRecord>>;

    /// Upsert a single record
    async fn save(&self, record: RemoteRecord) -> Result<RemoteRecord>;

    /// Delete a record by its record name
    async fn delete(&self, record_name: &str) -> Result<()>;

    /// Subscribe to availability changes
    ///
    /// Returns a stream that yields the new availability every time it
    /// changes.
    async fn subscribe_availability(&self) -> Result<Box<dyn AvailabilityStream>>;
}

/// Stream of remote availability changes
#[async_trait::async_trait]
pub trait AvailabilityStream: Send {
    /// Get the next availability value
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<bool>;
}
