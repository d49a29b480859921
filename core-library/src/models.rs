//! Domain models for the synchronized collections
//!
//! Every entity carries a stable UUID that is shared between the local and
//! remote representations. The [`Entity`] trait exposes the bits of each model
//! the sync engine needs generically: its kind, its id and its recency
//! timestamp.

use crate::error::LibraryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// Entity kinds
// =============================================================================

/// Closed set of synchronized entity types.
///
/// The tag returned by [`EntityKind::tag`] is part of the remote record schema
/// (record type discriminator and tombstone prefix) and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Bookmark,
    BookmarkFolder,
    ReadingListItem,
    GenTab,
    TabGroup,
}

impl EntityKind {
    /// All kinds, in push order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::BookmarkFolder,
        EntityKind::Bookmark,
        EntityKind::ReadingListItem,
        EntityKind::GenTab,
        EntityKind::TabGroup,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            EntityKind::Bookmark => "Bookmark",
            EntityKind::BookmarkFolder => "BookmarkFolder",
            EntityKind::ReadingListItem => "ReadingListItem",
            EntityKind::GenTab => "GenTab",
            EntityKind::TabGroup => "TabGroup",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| format!("Unknown entity kind: {}", s))
    }
}

/// Common view of a synchronized entity.
pub trait Entity: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> Uuid;

    /// Timestamp compared by the newer-wins strategy.
    fn recency(&self) -> DateTime<Utc>;

    /// Reject values a user write must not store.
    fn validate(&self) -> crate::error::Result<()> {
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> LibraryError {
    LibraryError::InvalidInput {
        field: field.to_string(),
        message: message.to_string(),
    }
}

// =============================================================================
// Bookmarks
// =============================================================================

/// Saved bookmark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    /// Containing folder, `None` for the bookmarks root
    pub folder_id: Option<Uuid>,
    /// Favicon image data
    pub favicon: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            title: title.into(),
            folder_id: None,
            favicon: None,
            created_at: Utc::now(),
        }
    }
}

impl Entity for Bookmark {
    const KIND: EntityKind = EntityKind::Bookmark;

    fn id(&self) -> Uuid {
        self.id
    }

    fn recency(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.url.trim().is_empty() {
            return Err(invalid("url", "Bookmark url cannot be empty"));
        }
        if self.folder_id == Some(self.id) {
            return Err(invalid("folderId", "Bookmark cannot be its own folder"));
        }
        Ok(())
    }
}

/// Bookmark folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkFolder {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl BookmarkFolder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            parent_id: None,
            created_at: Utc::now(),
        }
    }
}

impl Entity for BookmarkFolder {
    const KIND: EntityKind = EntityKind::BookmarkFolder;

    fn id(&self) -> Uuid {
        self.id
    }

    fn recency(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.name.trim().is_empty() {
            return Err(invalid("name", "Folder name cannot be empty"));
        }
        if self.parent_id == Some(self.id) {
            return Err(invalid("parentId", "Folder cannot be its own parent"));
        }
        Ok(())
    }
}

// =============================================================================
// Reading list
// =============================================================================

/// Reading-list entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingListItem {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub is_read: bool,
    pub added_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl ReadingListItem {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            title: title.into(),
            excerpt: None,
            is_read: false,
            added_at: Utc::now(),
            read_at: None,
        }
    }
}

impl Entity for ReadingListItem {
    const KIND: EntityKind = EntityKind::ReadingListItem;

    fn id(&self) -> Uuid {
        self.id
    }

    fn recency(&self) -> DateTime<Utc> {
        self.added_at
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.url.trim().is_empty() {
            return Err(invalid("url", "Reading list url cannot be empty"));
        }
        Ok(())
    }
}

// =============================================================================
// Generated tabs
// =============================================================================

/// One generated block of a GenTab (heading, paragraph, link list, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenTabComponent {
    pub kind: String,
    pub content: String,
}

impl GenTabComponent {
    pub fn new(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            content: content.into(),
        }
    }
}

/// Tab whose content was generated from a set of source pages.
///
/// Generation only ever appends components, so the component count is used
/// as a proxy for how complete a version is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenTab {
    pub id: Uuid,
    pub title: String,
    pub icon: String,
    pub components: Vec<GenTabComponent>,
    pub source_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl GenTab {
    pub fn new(title: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            icon: icon.into(),
            components: Vec::new(),
            source_urls: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

impl Entity for GenTab {
    const KIND: EntityKind = EntityKind::GenTab;

    fn id(&self) -> Uuid {
        self.id
    }

    fn recency(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// =============================================================================
// Tab groups
// =============================================================================

/// Named group of open tabs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabGroup {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub color_name: String,
    pub tab_ids: BTreeSet<Uuid>,
    pub is_collapsed: bool,
    pub created_at: DateTime<Utc>,
}

impl TabGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            icon: "folder".to_string(),
            color_name: "blue".to_string(),
            tab_ids: BTreeSet::new(),
            is_collapsed: false,
            created_at: Utc::now(),
        }
    }
}

impl Entity for TabGroup {
    const KIND: EntityKind = EntityKind::TabGroup;

    fn id(&self) -> Uuid {
        self.id
    }

    fn recency(&self) -> DateTime<Utc> {
        self.created_at
    }
}
