//! # Entity Stores
//!
//! Each entity type is owned by exactly one Entity Store holding its ordered,
//! id-keyed collection.
//!
//! ## Write paths
//!
//! - **User writes** (`insert`, `update`, `delete` on [`InMemoryEntityStore`])
//!   mutate the collection and publish a [`StoreChange`] on the change channel
//!   so the sync scheduler can count pending changes.
//! - **Sync writes** (`apply_upsert`, `apply_removal` on [`EntityStore`]) are
//!   issued by the sync engine while applying a pull. They never publish a
//!   change, otherwise every pass would re-arm its own pending counter.

use crate::error::{LibraryError, Result};
use crate::models::{Bookmark, BookmarkFolder, Entity, EntityKind, GenTab, ReadingListItem, TabGroup};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Notification that a store's collection was mutated by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChange {
    pub kind: EntityKind,
}

pub type ChangeSender = mpsc::UnboundedSender<StoreChange>;
pub type ChangeReceiver = mpsc::UnboundedReceiver<StoreChange>;

/// Create the channel Entity Stores publish their mutations on.
pub fn change_channel() -> (ChangeSender, ChangeReceiver) {
    mpsc::unbounded_channel()
}

/// Entity store interface used by the sync engine
#[async_trait]
pub trait EntityStore<T: Entity>: Send + Sync {
    /// Ordered snapshot of the whole collection
    async fn snapshot(&self) -> Result<Vec<T>>;

    /// Find an entity by id
    ///
    /// # Returns
    /// - `Ok(Some(entity))` if found
    /// - `Ok(None)` if not found
    async fn get(&self, id: Uuid) -> Result<Option<T>>;

    /// Insert or replace an entity on behalf of the sync engine.
    ///
    /// Replacement keeps the entity's position; new entities are appended.
    async fn apply_upsert(&self, entity: T) -> Result<()>;

    /// Remove an entity on behalf of the sync engine
    ///
    /// # Returns
    /// - `Ok(true)` if the entity was removed
    /// - `Ok(false)` if it was not present
    async fn apply_removal(&self, id: Uuid) -> Result<bool>;
}

/// In-memory entity store backed by an ordered `Vec`.
pub struct InMemoryEntityStore<T: Entity> {
    items: RwLock<Vec<T>>,
    changes: Option<ChangeSender>,
}

impl<T: Entity> InMemoryEntityStore<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            changes: None,
        }
    }

    /// Seed the store with an initial collection.
    ///
    /// Later duplicates of an id are dropped.
    pub fn with_items(items: Vec<T>) -> Self {
        let mut unique: Vec<T> = Vec::with_capacity(items.len());
        for item in items {
            if unique.iter().any(|existing| existing.id() == item.id()) {
                warn!(kind = %T::KIND, id = %item.id(), "Dropping duplicate id while seeding store");
                continue;
            }
            unique.push(item);
        }
        Self {
            items: RwLock::new(unique),
            changes: None,
        }
    }

    /// Publish user mutations on the given change channel.
    pub fn with_change_sender(mut self, sender: ChangeSender) -> Self {
        self.changes = Some(sender);
        self
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Add a new entity as a user action
    ///
    /// # Errors
    /// Returns `LibraryError::InvalidInput` if the entity fails validation,
    /// `LibraryError::Duplicate` if the id is already present.
    pub async fn insert(&self, entity: T) -> Result<()> {
        entity.validate()?;
        {
            let mut items = self.items.write().await;
            if items.iter().any(|existing| existing.id() == entity.id()) {
                return Err(LibraryError::Duplicate {
                    entity_type: T::KIND.to_string(),
                    id: entity.id().to_string(),
                });
            }
            items.push(entity);
        }
        self.notify();
        Ok(())
    }

    /// Replace an existing entity as a user action
    ///
    /// # Errors
    /// Returns `LibraryError::InvalidInput` if the entity fails validation,
    /// `LibraryError::NotFound` if the id is not present.
    pub async fn update(&self, entity: T) -> Result<()> {
        entity.validate()?;
        {
            let mut items = self.items.write().await;
            let slot = items
                .iter_mut()
                .find(|existing| existing.id() == entity.id())
                .ok_or_else(|| LibraryError::NotFound {
                    entity_type: T::KIND.to_string(),
                    id: entity.id().to_string(),
                })?;
            *slot = entity;
        }
        self.notify();
        Ok(())
    }

    /// Delete an entity as a user action
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let removed = remove_by_id(&mut *self.items.write().await, id);
        if removed {
            self.notify();
        }
        Ok(removed)
    }

    fn notify(&self) {
        if let Some(sender) = &self.changes {
            if sender.send(StoreChange { kind: T::KIND }).is_err() {
                debug!(kind = %T::KIND, "Change channel closed, dropping notification");
            }
        }
    }
}

impl<T: Entity> Default for InMemoryEntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_by_id<T: Entity>(items: &mut Vec<T>, id: Uuid) -> bool {
    let before = items.len();
    items.retain(|item| item.id() != id);
    items.len() != before
}

#[async_trait]
impl<T: Entity> EntityStore<T> for InMemoryEntityStore<T> {
    async fn snapshot(&self) -> Result<Vec<T>> {
        Ok(self.items.read().await.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<T>> {
        Ok(self
            .items
            .read()
            .await
            .iter()
            .find(|item| item.id() == id)
            .cloned())
    }

    async fn apply_upsert(&self, entity: T) -> Result<()> {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|existing| existing.id() == entity.id()) {
            Some(slot) => *slot = entity,
            None => items.push(entity),
        }
        Ok(())
    }

    async fn apply_removal(&self, id: Uuid) -> Result<bool> {
        Ok(remove_by_id(&mut *self.items.write().await, id))
    }
}

/// One store per synchronized entity type.
#[derive(Clone)]
pub struct EntityStores {
    pub bookmarks: Arc<dyn EntityStore<Bookmark>>,
    pub bookmark_folders: Arc<dyn EntityStore<BookmarkFolder>>,
    pub reading_list: Arc<dyn EntityStore<ReadingListItem>>,
    pub gen_tabs: Arc<dyn EntityStore<GenTab>>,
    pub tab_groups: Arc<dyn EntityStore<TabGroup>>,
}

impl EntityStores {
    /// Empty in-memory stores publishing on `sender`.
    ///
    /// Returns the typed handles alongside the bundle so hosts and tests can
    /// perform user writes.
    pub fn in_memory(sender: ChangeSender) -> (Self, InMemoryStores) {
        let handles = InMemoryStores {
            bookmarks: Arc::new(InMemoryEntityStore::new().with_change_sender(sender.clone())),
            bookmark_folders: Arc::new(
                InMemoryEntityStore::new().with_change_sender(sender.clone()),
            ),
            reading_list: Arc::new(InMemoryEntityStore::new().with_change_sender(sender.clone())),
            gen_tabs: Arc::new(InMemoryEntityStore::new().with_change_sender(sender.clone())),
            tab_groups: Arc::new(InMemoryEntityStore::new().with_change_sender(sender)),
        };
        (handles.as_entity_stores(), handles)
    }
}

impl std::fmt::Debug for EntityStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStores").finish_non_exhaustive()
    }
}

/// Typed handles to the in-memory stores behind an [`EntityStores`] bundle.
#[derive(Clone)]
pub struct InMemoryStores {
    pub bookmarks: Arc<InMemoryEntityStore<Bookmark>>,
    pub bookmark_folders: Arc<InMemoryEntityStore<BookmarkFolder>>,
    pub reading_list: Arc<InMemoryEntityStore<ReadingListItem>>,
    pub gen_tabs: Arc<InMemoryEntityStore<GenTab>>,
    pub tab_groups: Arc<InMemoryEntityStore<TabGroup>>,
}

impl InMemoryStores {
    pub fn as_entity_stores(&self) -> EntityStores {
        EntityStores {
            bookmarks: self.bookmarks.clone(),
            bookmark_folders: self.bookmark_folders.clone(),
            reading_list: self.reading_list.clone(),
            gen_tabs: self.gen_tabs.clone(),
            tab_groups: self.tab_groups.clone(),
        }
    }
}
