//! Change Classifier
//!
//! Turns an opaque [`ChangeBatch`] into typed per-entity deltas. The record
//! type discriminator is decoded exactly once here; everything downstream
//! matches on [`RemoteChange`].

use crate::error::RecordError;
use crate::record::{decode_record_name, RecordCodec};
use bridge_traits::remote::{ChangeBatch, RemoteRecord};
use core_library::models::{
    Bookmark, BookmarkFolder, EntityKind, GenTab, ReadingListItem, TabGroup,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// A changed remote record decoded into its entity type.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteChange {
    Bookmark(Bookmark),
    BookmarkFolder(BookmarkFolder),
    ReadingListItem(ReadingListItem),
    GenTab(GenTab),
    TabGroup(TabGroup),
}

impl RemoteChange {
    pub fn kind(&self) -> EntityKind {
        match self {
            RemoteChange::Bookmark(_) => EntityKind::Bookmark,
            RemoteChange::BookmarkFolder(_) => EntityKind::BookmarkFolder,
            RemoteChange::ReadingListItem(_) => EntityKind::ReadingListItem,
            RemoteChange::GenTab(_) => EntityKind::GenTab,
            RemoteChange::TabGroup(_) => EntityKind::TabGroup,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            RemoteChange::Bookmark(entity) => entity.id,
            RemoteChange::BookmarkFolder(entity) => entity.id,
            RemoteChange::ReadingListItem(entity) => entity.id,
            RemoteChange::GenTab(entity) => entity.id,
            RemoteChange::TabGroup(entity) => entity.id,
        }
    }

    /// Page address carried by bookmarks and reading-list items.
    pub fn url(&self) -> Option<&str> {
        match self {
            RemoteChange::Bookmark(entity) => Some(&entity.url),
            RemoteChange::ReadingListItem(entity) => Some(&entity.url),
            _ => None,
        }
    }
}

/// A remote deletion decoded from its tombstone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteDeletion {
    pub kind: EntityKind,
    pub id: Uuid,
}

/// Typed view of one pulled change batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedBatch {
    /// Decoded changes, in batch order
    pub changes: Vec<RemoteChange>,
    /// Decoded tombstones, in batch order
    pub deletions: Vec<RemoteDeletion>,
    /// Changed records that failed to decode
    pub skipped_records: usize,
    /// Tombstones with an unknown prefix or bad id
    pub skipped_tombstones: usize,
}

impl ClassifiedBatch {
    /// Number of decoded changes per entity type.
    pub fn counts(&self) -> BTreeMap<EntityKind, usize> {
        let mut counts = BTreeMap::new();
        for change in &self.changes {
            *counts.entry(change.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.deletions.is_empty()
    }
}

/// Decode one changed record into its typed change.
///
/// # Errors
///
/// `RecordError::UnknownType` for a type tag outside the closed set, or the
/// entity decoder's error.
pub fn decode_change(record: &RemoteRecord) -> Result<RemoteChange, RecordError> {
    let kind = EntityKind::from_tag(&record.record_type)
        .ok_or_else(|| RecordError::UnknownType(record.record_type.clone()))?;

    match kind {
        EntityKind::Bookmark => Bookmark::from_record(record).map(RemoteChange::Bookmark),
        EntityKind::BookmarkFolder => {
            BookmarkFolder::from_record(record).map(RemoteChange::BookmarkFolder)
        }
        EntityKind::ReadingListItem => {
            ReadingListItem::from_record(record).map(RemoteChange::ReadingListItem)
        }
        EntityKind::GenTab => GenTab::from_record(record).map(RemoteChange::GenTab),
        EntityKind::TabGroup => TabGroup::from_record(record).map(RemoteChange::TabGroup),
    }
}

/// Decode one changed record.
///
/// Returns `None` (after logging) for an unknown type or a decode failure.
pub fn classify_record(record: &RemoteRecord) -> Option<RemoteChange> {
    match decode_change(record) {
        Ok(change) => Some(change),
        Err(err) => {
            warn!(
                record_type = %record.record_type,
                record_name = %record.record_name,
                error = %err,
                "Skipping undecodable remote record"
            );
            None
        }
    }
}

/// Decode one deletion tombstone.
///
/// Returns `None` (after logging) for an unknown prefix or a bad UUID.
pub fn classify_tombstone(tombstone: &str) -> Option<RemoteDeletion> {
    match decode_record_name(tombstone) {
        Some((kind, id)) => Some(RemoteDeletion { kind, id }),
        None => {
            warn!(tombstone, "Ignoring unrecognized deletion tombstone");
            None
        }
    }
}

/// Classify a whole change batch.
pub fn classify(batch: &ChangeBatch) -> ClassifiedBatch {
    let mut classified = ClassifiedBatch::default();

    for record in &batch.changed_records {
        match classify_record(record) {
            Some(change) => classified.changes.push(change),
            None => classified.skipped_records += 1,
        }
    }

    for tombstone in &batch.deleted_record_ids {
        match classify_tombstone(tombstone) {
            Some(deletion) => classified.deletions.push(deletion),
            None => classified.skipped_tombstones += 1,
        }
    }

    debug!(
        changes = ?classified.counts(),
        deletions = classified.deletions.len(),
        skipped_records = classified.skipped_records,
        skipped_tombstones = classified.skipped_tombstones,
        "Classified remote change batch"
    );

    classified
}
