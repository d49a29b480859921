//! # Library Module
//!
//! Domain models of the synchronized collections and the Entity Store
//! contract that owns them.
//!
//! ## Overview
//!
//! This module provides:
//! - Models for bookmarks, bookmark folders, reading-list items, generated
//!   tabs and tab groups, all keyed by a stable UUID
//! - The [`EntityStore`] trait the sync engine reads and rewrites collections
//!   through
//! - An in-memory store that publishes user mutations on a change channel

pub mod error;
pub mod models;
pub mod store;

pub use error::{LibraryError, Result};
pub use models::{
    Bookmark, BookmarkFolder, Entity, EntityKind, GenTab, GenTabComponent, ReadingListItem,
    TabGroup,
};
pub use store::{
    change_channel, ChangeReceiver, ChangeSender, EntityStore, EntityStores, InMemoryEntityStore,
    InMemoryStores, StoreChange,
};
