//! Conflict Resolution for Sync Operations
//!
//! Decides what survives when the local and the remote replica hold
//! different versions of the same logical record.
//!
//! ## Overview
//!
//! The resolver is a pure decision engine. It never touches a store; the
//! coordinator hands it two versions that share an identity and writes back
//! whatever it returns.
//!
//! ## Strategies
//!
//! - **LocalWins**: Keep the local version
//! - **RemoteWins**: Take the remote version
//! - **NewerWins** (default): Compare recency (`created_at`, or `added_at` for
//!   reading-list items); the later one wins wholesale, ties keep local
//! - **Merge**: Combine field by field so no information is lost when a
//!   lossless combination exists (see [`Mergeable`])
//!
//! ## Usage
//!
//! ```
//! use core_sync::conflict_resolver::{ConflictResolver, Resolution, ResolutionStrategy};
//! use core_library::models::TabGroup;
//! use uuid::Uuid;
//!
//! let local = TabGroup::new("Research");
//! let mut remote = local.clone();
//! remote.tab_ids.insert(Uuid::new_v4());
//!
//! let resolver = ConflictResolver::new(ResolutionStrategy::Merge);
//! match resolver.resolve(&local, &remote).unwrap() {
//!     Resolution::Resolved(group) => assert_eq!(group.tab_ids.len(), 1),
//!     Resolution::NoChange => unreachable!(),
//! }
//! ```

use crate::error::{Result, SyncError};
use core_library::models::{
    Bookmark, BookmarkFolder, Entity, EntityKind, GenTab, ReadingListItem, TabGroup,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::trace;
use uuid::Uuid;

/// Conflict resolution strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionStrategy {
    /// Keep the local version
    LocalWins,

    /// Take the remote version
    RemoteWins,

    /// Keep whichever version is more recent
    #[default]
    NewerWins,

    /// Combine both versions field by field
    Merge,
}

impl ResolutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::LocalWins => "localWins",
            ResolutionStrategy::RemoteWins => "remoteWins",
            ResolutionStrategy::NewerWins => "newerWins",
            ResolutionStrategy::Merge => "merge",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "localWins" => Ok(ResolutionStrategy::LocalWins),
            "remoteWins" => Ok(ResolutionStrategy::RemoteWins),
            "newerWins" => Ok(ResolutionStrategy::NewerWins),
            "merge" => Ok(ResolutionStrategy::Merge),
            _ => Err(format!("Unknown resolution strategy: {}", s)),
        }
    }
}

/// Outcome of resolving one pair of versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// Both versions are equal; nothing to write
    NoChange,

    /// The value that should be stored locally
    Resolved(T),
}

impl<T> Resolution<T> {
    /// The value to keep, falling back to `local` on [`Resolution::NoChange`].
    pub fn unwrap_or(self, local: T) -> T {
        match self {
            Resolution::NoChange => local,
            Resolution::Resolved(value) => value,
        }
    }

    pub fn is_no_change(&self) -> bool {
        matches!(self, Resolution::NoChange)
    }
}

/// Field-level merge rules of an entity type.
///
/// `merge` is only ever called with two versions sharing one id; the result
/// keeps that id and, for fields without a rule, the local value.
pub trait Mergeable: Entity {
    fn merge(local: &Self, remote: &Self) -> Self;
}

/// Pick `remote` only when it is strictly more recent.
fn later_of<'a, T>(
    local: &'a T,
    remote: &'a T,
    local_at: chrono::DateTime<chrono::Utc>,
    remote_at: chrono::DateTime<chrono::Utc>,
) -> &'a T {
    if remote_at > local_at {
        remote
    } else {
        local
    }
}

/// Longer string wins, ties keep local.
fn longer(local: &str, remote: &str) -> String {
    if remote.chars().count() > local.chars().count() {
        remote.to_string()
    } else {
        local.to_string()
    }
}

impl Mergeable for Bookmark {
    fn merge(local: &Self, remote: &Self) -> Self {
        let title = if local.title == remote.title {
            local.title.clone()
        } else {
            later_of(&local.title, &remote.title, local.created_at, remote.created_at).clone()
        };

        Self {
            id: local.id,
            url: remote.url.clone(),
            title,
            folder_id: local.folder_id.or(remote.folder_id),
            favicon: local.favicon.clone().or_else(|| remote.favicon.clone()),
            created_at: local.created_at,
        }
    }
}

impl Mergeable for BookmarkFolder {
    fn merge(local: &Self, remote: &Self) -> Self {
        Self {
            id: local.id,
            name: later_of(&local.name, &remote.name, local.created_at, remote.created_at).clone(),
            parent_id: local.parent_id.or(remote.parent_id),
            created_at: local.created_at,
        }
    }
}

impl Mergeable for ReadingListItem {
    fn merge(local: &Self, remote: &Self) -> Self {
        let read_at = match (local.read_at, remote.read_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };

        let excerpt = match (
            local.excerpt.as_deref().filter(|s| !s.is_empty()),
            remote.excerpt.as_deref().filter(|s| !s.is_empty()),
        ) {
            (Some(a), Some(b)) => Some(longer(a, b)),
            (Some(a), None) => Some(a.to_string()),
            (None, Some(b)) => Some(b.to_string()),
            (None, None) => local.excerpt.clone(),
        };

        Self {
            id: local.id,
            url: local.url.clone(),
            title: longer(&local.title, &remote.title),
            excerpt,
            is_read: local.is_read || remote.is_read,
            added_at: local.added_at.min(remote.added_at),
            read_at,
        }
    }
}

impl Mergeable for GenTab {
    fn merge(local: &Self, remote: &Self) -> Self {
        // Generation only appends, so more components means more complete
        if remote.component_count() > local.component_count() {
            remote.clone()
        } else {
            local.clone()
        }
    }
}

impl Mergeable for TabGroup {
    fn merge(local: &Self, remote: &Self) -> Self {
        let mut merged = local.clone();
        merged.tab_ids.extend(remote.tab_ids.iter().copied());
        merged
    }
}

/// Result of reconciling two whole collections.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResolution<T> {
    /// Local order first, then remote-only additions in remote order
    pub records: Vec<T>,

    /// Ids present on both sides whose versions differed
    pub conflicts: usize,

    /// Remote-only records appended
    pub added: usize,
}

/// Conflict resolver for sync operations
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver {
    strategy: ResolutionStrategy,
}

impl ConflictResolver {
    pub fn new(strategy: ResolutionStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ResolutionStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: ResolutionStrategy) {
        self.strategy = strategy;
    }

    /// Resolve two versions of one record.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::IdentityMismatch` if the versions carry different
    /// ids.
    pub fn resolve<T: Mergeable>(&self, local: &T, remote: &T) -> Result<Resolution<T>> {
        if local.id() != remote.id() {
            return Err(SyncError::IdentityMismatch {
                kind: T::KIND,
                local: local.id(),
                remote: remote.id(),
            });
        }
        Ok(self.resolve_same_identity(local, remote))
    }

    fn resolve_same_identity<T: Mergeable>(&self, local: &T, remote: &T) -> Resolution<T> {
        if local == remote {
            return Resolution::NoChange;
        }

        let resolved = match self.strategy {
            ResolutionStrategy::LocalWins => local.clone(),
            ResolutionStrategy::RemoteWins => remote.clone(),
            ResolutionStrategy::NewerWins => {
                later_of(local, remote, local.recency(), remote.recency()).clone()
            }
            ResolutionStrategy::Merge => T::merge(local, remote),
        };

        trace!(kind = %T::KIND, id = %local.id(), strategy = %self.strategy, "Resolved conflict");
        Resolution::Resolved(resolved)
    }

    /// Reconcile a local collection against a remote one.
    ///
    /// Every id from either side appears exactly once. A repeated local id
    /// keeps its first occurrence; a repeated remote id keeps the value of
    /// its last occurrence at the position of its first.
    pub fn resolve_batch<T: Mergeable>(&self, local: &[T], remote: &[T]) -> BatchResolution<T> {
        let mut remote_by_id: HashMap<Uuid, &T> = HashMap::with_capacity(remote.len());
        let mut remote_order: Vec<Uuid> = Vec::with_capacity(remote.len());
        for record in remote {
            if remote_by_id.insert(record.id(), record).is_none() {
                remote_order.push(record.id());
            }
        }

        let mut seen: HashSet<Uuid> = HashSet::with_capacity(local.len() + remote_order.len());
        let mut records = Vec::with_capacity(local.len() + remote_order.len());
        let mut conflicts = 0;

        for record in local {
            if !seen.insert(record.id()) {
                continue;
            }
            match remote_by_id.get(&record.id()) {
                Some(other) => match self.resolve_same_identity(record, other) {
                    Resolution::NoChange => records.push(record.clone()),
                    Resolution::Resolved(value) => {
                        conflicts += 1;
                        records.push(value);
                    }
                },
                None => records.push(record.clone()),
            }
        }

        let mut added = 0;
        for id in remote_order {
            if seen.insert(id) {
                if let Some(record) = remote_by_id.get(&id) {
                    records.push((*record).clone());
                    added += 1;
                }
            }
        }

        BatchResolution {
            records,
            conflicts,
            added,
        }
    }
}

/// Human-readable name of an entity category in reports.
pub fn category_label(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Bookmark => "Bookmarks",
        EntityKind::BookmarkFolder => "Bookmark folders",
        EntityKind::ReadingListItem => "Reading list",
        EntityKind::GenTab => "GenTabs",
        EntityKind::TabGroup => "Tab groups",
    }
}

/// Per-category tallies of one category within a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStats {
    /// Remote records with no local counterpart
    pub added: u64,

    /// Ids present on both sides with differing versions
    pub conflicts: u64,

    /// Local records removed by tombstones
    pub deleted: u64,
}

/// Statistics from the resolution phase of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictResolutionStats {
    pub categories: BTreeMap<EntityKind, CategoryStats>,
}

impl ConflictResolutionStats {
    pub fn category(&self, kind: EntityKind) -> CategoryStats {
        self.categories.get(&kind).copied().unwrap_or_default()
    }

    pub fn record_added(&mut self, kind: EntityKind) {
        self.categories.entry(kind).or_default().added += 1;
    }

    pub fn record_conflict(&mut self, kind: EntityKind) {
        self.categories.entry(kind).or_default().conflicts += 1;
    }

    pub fn record_deleted(&mut self, kind: EntityKind) {
        self.categories.entry(kind).or_default().deleted += 1;
    }

    pub fn total_added(&self) -> u64 {
        self.categories.values().map(|stats| stats.added).sum()
    }

    pub fn total_conflicts(&self) -> u64 {
        self.categories.values().map(|stats| stats.conflicts).sum()
    }

    pub fn total_deleted(&self) -> u64 {
        self.categories.values().map(|stats| stats.deleted).sum()
    }

    /// Summary of per-category conflict counts under `strategy`.
    ///
    /// Diagnostic only; the format is not stable.
    pub fn report(&self, strategy: ResolutionStrategy) -> String {
        let mut lines = vec![format!("Conflict resolution (strategy: {})", strategy)];
        for kind in EntityKind::ALL {
            lines.push(format!(
                "  {}: {} conflicts",
                category_label(kind),
                self.category(kind).conflicts
            ));
        }
        lines.push(format!("  Total: {} conflicts", self.total_conflicts()));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use core_library::models::GenTabComponent;

    const STRATEGIES: [ResolutionStrategy; 4] = [
        ResolutionStrategy::LocalWins,
        ResolutionStrategy::RemoteWins,
        ResolutionStrategy::NewerWins,
        ResolutionStrategy::Merge,
    ];

    fn assert_idempotent<T: Mergeable>(value: &T) {
        for strategy in STRATEGIES {
            let resolver = ConflictResolver::new(strategy);
            assert_eq!(
                resolver.resolve(value, value).unwrap(),
                Resolution::NoChange,
                "{} should not change {:?}",
                strategy,
                T::KIND
            );
        }
    }

    #[test]
    fn test_default_strategy_is_newer_wins() {
        assert_eq!(ConflictResolver::default().strategy(), ResolutionStrategy::NewerWins);
    }

    #[test]
    fn test_strategy_names() {
        for strategy in STRATEGIES {
            assert_eq!(strategy.as_str().parse::<ResolutionStrategy>(), Ok(strategy));
        }
        assert!("oldestWins".parse::<ResolutionStrategy>().is_err());
        assert_eq!(
            serde_json::to_string(&ResolutionStrategy::RemoteWins).unwrap(),
            "\"remoteWins\""
        );
    }

    #[test]
    fn test_resolving_equal_values_is_no_change() {
        let mut bookmark = Bookmark::new("https://example.com", "Example");
        bookmark.favicon = Some(vec![1, 2, 3]);
        assert_idempotent(&bookmark);
        assert_idempotent(&BookmarkFolder::new("Work"));
        assert_idempotent(&ReadingListItem::new("https://example.com/a", "A"));
        assert_idempotent(&GenTab::new("Plan", "map"));
        assert_idempotent(&TabGroup::new("Research"));
    }

    #[test]
    fn test_identity_mismatch_rejected() {
        let resolver = ConflictResolver::default();
        let a = TabGroup::new("A");
        let b = TabGroup::new("B");
        assert!(matches!(
            resolver.resolve(&a, &b),
            Err(SyncError::IdentityMismatch {
                kind: EntityKind::TabGroup,
                ..
            })
        ));
    }

    #[test]
    fn test_local_and_remote_wins() {
        let local = BookmarkFolder::new("Local");
        let mut remote = local.clone();
        remote.name = "Remote".to_string();

        let mut resolver = ConflictResolver::new(ResolutionStrategy::LocalWins);
        assert_eq!(
            resolver.resolve(&local, &remote).unwrap(),
            Resolution::Resolved(local.clone())
        );

        resolver.set_strategy(ResolutionStrategy::RemoteWins);
        assert_eq!(
            resolver.resolve(&local, &remote).unwrap(),
            Resolution::Resolved(remote)
        );
    }

    #[test]
    fn test_newer_wins_bookmark() {
        let t0 = Utc::now();
        let mut local = Bookmark::new("https://example.com", "A");
        local.created_at = t0;
        let mut remote = local.clone();
        remote.title = "B".to_string();
        remote.created_at = t0 + Duration::seconds(10);

        let resolver = ConflictResolver::new(ResolutionStrategy::NewerWins);
        assert_eq!(
            resolver.resolve(&local, &remote).unwrap(),
            Resolution::Resolved(remote.clone())
        );

        // Equal timestamps keep local
        remote.created_at = t0;
        assert_eq!(
            resolver.resolve(&local, &remote).unwrap(),
            Resolution::Resolved(local)
        );
    }

    #[test]
    fn test_newer_wins_reading_list_uses_added_at() {
        let t0 = Utc::now();
        let mut local = ReadingListItem::new("https://example.com/a", "Local");
        local.added_at = t0 + Duration::seconds(5);
        let mut remote = local.clone();
        remote.title = "Remote".to_string();
        remote.added_at = t0;

        let resolver = ConflictResolver::new(ResolutionStrategy::NewerWins);
        assert_eq!(
            resolver.resolve(&local, &remote).unwrap(),
            Resolution::Resolved(local)
        );
    }

    #[test]
    fn test_merge_bookmark_fields() {
        let t0 = Utc::now();
        let mut local = Bookmark::new("https://old.example", "Local title");
        local.created_at = t0;
        local.folder_id = None;
        local.favicon = Some(vec![9]);

        let mut remote = local.clone();
        remote.url = "https://new.example".to_string();
        remote.title = "Remote title".to_string();
        remote.folder_id = Some(Uuid::new_v4());
        remote.favicon = Some(vec![1]);
        remote.created_at = t0 + Duration::seconds(1);

        let merged = Bookmark::merge(&local, &remote);
        assert_eq!(merged.id, local.id);
        assert_eq!(merged.url, "https://new.example");
        assert_eq!(merged.title, "Remote title");
        assert_eq!(merged.folder_id, remote.folder_id);
        assert_eq!(merged.favicon, Some(vec![9]));
        assert_eq!(merged.created_at, t0);
    }

    #[test]
    fn test_merge_bookmark_optional_fields() {
        let folder = Uuid::new_v4();
        let mut local = Bookmark::new("https://example.com", "Example");
        local.folder_id = Some(folder);
        local.favicon = None;

        let mut remote = local.clone();
        remote.folder_id = Some(Uuid::new_v4());
        remote.favicon = Some(vec![7, 7]);

        // Present local folder wins, absent local favicon falls back to remote
        let merged = Bookmark::merge(&local, &remote);
        assert_eq!(merged.folder_id, Some(folder));
        assert_eq!(merged.favicon, Some(vec![7, 7]));

        remote.folder_id = None;
        remote.favicon = None;
        let merged = Bookmark::merge(&local, &remote);
        assert_eq!(merged.folder_id, Some(folder));
        assert_eq!(merged.favicon, None);
    }

    #[test]
    fn test_merge_read_at_one_sided() {
        let at = Utc::now();
        let base = ReadingListItem::new("https://example.com/a", "A");

        let mut read = base.clone();
        read.is_read = true;
        read.read_at = Some(at);

        assert_eq!(ReadingListItem::merge(&base, &read).read_at, Some(at));
        assert_eq!(ReadingListItem::merge(&read, &base).read_at, Some(at));
        assert_eq!(ReadingListItem::merge(&base, &base).read_at, None);
    }

    #[test]
    fn test_merge_excerpt_one_sided() {
        let base = ReadingListItem::new("https://example.com/a", "A");
        let with_excerpt = |excerpt: Option<&str>| {
            let mut item = base.clone();
            item.excerpt = excerpt.map(str::to_string);
            item
        };

        let cases = [
            (None, Some("remote"), Some("remote")),
            (Some(""), Some("remote"), Some("remote")),
            (Some("local"), None, Some("local")),
            (Some("local"), Some(""), Some("local")),
            (Some(""), None, Some("")),
            (None, Some(""), None),
        ];
        for (local, remote, expected) in cases {
            let merged = ReadingListItem::merge(&with_excerpt(local), &with_excerpt(remote));
            assert_eq!(
                merged.excerpt.as_deref(),
                expected,
                "local {:?} remote {:?}",
                local,
                remote
            );
        }
    }

    fn assert_keeps_identity<T: Mergeable>(local: &T, remote: &T) {
        for strategy in STRATEGIES {
            let resolved = ConflictResolver::new(strategy)
                .resolve(local, remote)
                .unwrap()
                .unwrap_or(local.clone());
            assert_eq!(resolved.id(), local.id(), "{} changed {:?} id", strategy, T::KIND);
        }
    }

    #[test]
    fn test_every_strategy_keeps_identity() {
        let later = Utc::now() + Duration::seconds(60);

        let bookmark = Bookmark::new("https://example.com", "Local");
        let mut remote_bookmark = bookmark.clone();
        remote_bookmark.title = "Remote".to_string();
        remote_bookmark.url = "https://example.org".to_string();
        remote_bookmark.created_at = later;
        assert_keeps_identity(&bookmark, &remote_bookmark);

        let folder = BookmarkFolder::new("Local");
        let mut remote_folder = folder.clone();
        remote_folder.name = "Remote".to_string();
        remote_folder.created_at = later;
        assert_keeps_identity(&folder, &remote_folder);

        let item = ReadingListItem::new("https://example.com/a", "Local");
        let mut remote_item = item.clone();
        remote_item.title = "Remote and longer".to_string();
        remote_item.is_read = true;
        remote_item.added_at = later;
        assert_keeps_identity(&item, &remote_item);

        let gen_tab = GenTab::new("Plan", "map");
        let mut remote_gen_tab = gen_tab.clone();
        remote_gen_tab
            .components
            .push(GenTabComponent::new("paragraph", "More"));
        remote_gen_tab.created_at = later;
        assert_keeps_identity(&gen_tab, &remote_gen_tab);

        let group = TabGroup::new("Local");
        let mut remote_group = group.clone();
        remote_group.tab_ids.insert(Uuid::new_v4());
        remote_group.created_at = later;
        assert_keeps_identity(&group, &remote_group);
    }

    #[test]
    fn test_merge_folder_keeps_local_parent() {
        let t0 = Utc::now();
        let mut local = BookmarkFolder::new("Local");
        local.created_at = t0 + Duration::seconds(1);
        local.parent_id = Some(Uuid::new_v4());
        let mut remote = local.clone();
        remote.name = "Remote".to_string();
        remote.parent_id = Some(Uuid::new_v4());
        remote.created_at = t0;

        let merged = BookmarkFolder::merge(&local, &remote);
        assert_eq!(merged.name, "Local");
        assert_eq!(merged.parent_id, local.parent_id);
    }

    #[test]
    fn test_merge_reading_list_item() {
        let t0 = Utc::now();
        let mut local = ReadingListItem::new("https://example.com/a", "Short");
        local.added_at = t0 + Duration::seconds(30);
        local.excerpt = Some(String::new());
        local.read_at = Some(t0 + Duration::seconds(40));
        local.is_read = true;

        let mut remote = local.clone();
        remote.title = "A much longer title".to_string();
        remote.added_at = t0;
        remote.excerpt = Some("Remote excerpt".to_string());
        remote.is_read = false;
        remote.read_at = Some(t0 + Duration::seconds(50));

        let merged = ReadingListItem::merge(&local, &remote);
        assert!(merged.is_read);
        assert_eq!(merged.read_at, Some(t0 + Duration::seconds(50)));
        assert_eq!(merged.excerpt.as_deref(), Some("Remote excerpt"));
        assert_eq!(merged.title, "A much longer title");
        assert_eq!(merged.added_at, t0);
        assert_eq!(merged.url, local.url);
    }

    #[test]
    fn test_merge_is_read_commutes() {
        let base = ReadingListItem::new("https://example.com/a", "A");
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let mut x = base.clone();
            x.is_read = a;
            let mut y = base.clone();
            y.is_read = b;

            let xy = ReadingListItem::merge(&x, &y).is_read;
            let yx = ReadingListItem::merge(&y, &x).is_read;
            assert_eq!(xy, yx);
            assert_eq!(xy, a || b);
        }
    }

    #[test]
    fn test_merge_excerpt_tie_keeps_local() {
        let mut local = ReadingListItem::new("https://example.com/a", "Same");
        local.excerpt = Some("abc".to_string());
        let mut remote = local.clone();
        remote.excerpt = Some("xyz".to_string());
        remote.title = "Diff".to_string();

        let merged = ReadingListItem::merge(&local, &remote);
        assert_eq!(merged.excerpt.as_deref(), Some("abc"));
        assert_eq!(merged.title, "Same");
    }

    #[test]
    fn test_gentab_completeness_wins() {
        let mut local = GenTab::new("Plan", "map");
        local.components = vec![
            GenTabComponent::new("heading", "1"),
            GenTabComponent::new("paragraph", "2"),
        ];
        let mut remote = local.clone();
        remote.components.extend([
            GenTabComponent::new("paragraph", "3"),
            GenTabComponent::new("paragraph", "4"),
            GenTabComponent::new("links", "5"),
        ]);

        let resolver = ConflictResolver::new(ResolutionStrategy::Merge);
        let resolved = resolver.resolve(&local, &remote).unwrap();
        assert_eq!(resolved, Resolution::Resolved(remote.clone()));

        // Tie keeps local
        let mut rival = local.clone();
        rival.title = "Other".to_string();
        assert_eq!(
            resolver.resolve(&local, &rival).unwrap(),
            Resolution::Resolved(local)
        );
    }

    #[test]
    fn test_tab_group_union() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut local = TabGroup::new("Research");
        local.tab_ids = [a, b].into_iter().collect();
        local.is_collapsed = true;
        let mut remote = local.clone();
        remote.tab_ids = [b, c].into_iter().collect();
        remote.name = "Renamed".to_string();
        remote.is_collapsed = false;

        let resolver = ConflictResolver::new(ResolutionStrategy::Merge);
        let merged = resolver.resolve(&local, &remote).unwrap().unwrap_or(local.clone());
        assert_eq!(merged.tab_ids, [a, b, c].into_iter().collect());
        assert_eq!(merged.name, "Research");
        assert!(merged.is_collapsed);
    }

    #[test]
    fn test_resolve_batch_order_and_completeness() {
        let shared = TabGroup::new("Shared");
        let local_only = TabGroup::new("Local");
        let remote_a = TabGroup::new("Remote A");
        let remote_b = TabGroup::new("Remote B");
        let mut shared_remote = shared.clone();
        shared_remote.tab_ids.insert(Uuid::new_v4());

        let resolver = ConflictResolver::new(ResolutionStrategy::Merge);
        let outcome = resolver.resolve_batch(
            &[shared.clone(), local_only.clone()],
            &[remote_a.clone(), shared_remote.clone(), remote_b.clone()],
        );

        let ids: Vec<Uuid> = outcome.records.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![shared.id, local_only.id, remote_a.id, remote_b.id]);
        assert_eq!(outcome.records[0].tab_ids, shared_remote.tab_ids);
        assert_eq!(outcome.conflicts, 1);
        assert_eq!(outcome.added, 2);
    }

    #[test]
    fn test_resolve_batch_collapses_duplicates() {
        let local = Bookmark::new("https://example.com", "Local");
        let mut local_dup = local.clone();
        local_dup.title = "Local duplicate".to_string();

        let remote_new = Bookmark::new("https://r.example", "First");
        let mut remote_newer = remote_new.clone();
        remote_newer.title = "Last".to_string();
        let other = Bookmark::new("https://o.example", "Other");

        let resolver = ConflictResolver::new(ResolutionStrategy::LocalWins);
        let outcome = resolver.resolve_batch(
            &[local.clone(), local_dup],
            &[remote_new.clone(), other.clone(), remote_newer.clone()],
        );

        assert_eq!(outcome.records, vec![local, remote_newer, other]);
        let unique: HashSet<Uuid> = outcome.records.iter().map(|b| b.id).collect();
        assert_eq!(unique.len(), outcome.records.len());
    }

    #[test]
    fn test_resolve_batch_equal_values_not_counted() {
        let folder = BookmarkFolder::new("Work");
        let resolver = ConflictResolver::default();
        let outcome = resolver.resolve_batch(&[folder.clone()], &[folder.clone()]);
        assert_eq!(outcome.records, vec![folder]);
        assert_eq!(outcome.conflicts, 0);
        assert_eq!(outcome.added, 0);
    }

    #[test]
    fn test_stats_report() {
        let mut stats = ConflictResolutionStats::default();
        stats.record_conflict(EntityKind::Bookmark);
        stats.record_conflict(EntityKind::Bookmark);
        stats.record_conflict(EntityKind::TabGroup);
        stats.record_added(EntityKind::GenTab);
        stats.record_deleted(EntityKind::ReadingListItem);

        assert_eq!(stats.total_conflicts(), 3);
        assert_eq!(stats.total_added(), 1);
        assert_eq!(stats.total_deleted(), 1);
        assert_eq!(stats.category(EntityKind::BookmarkFolder), CategoryStats::default());

        let report = stats.report(ResolutionStrategy::Merge);
        assert!(report.contains("strategy: merge"));
        assert!(report.contains("Bookmarks: 2 conflicts"));
        assert!(report.contains("Tab groups: 1 conflicts"));
        assert!(report.contains("Total: 3 conflicts"));
    }
}
