//! Record Codec
//!
//! Translates typed entities to and from the opaque [`RemoteRecord`]s the
//! Remote Store exchanges.
//!
//! ## Schema
//!
//! - `record_type` is the entity tag (`Bookmark`, `BookmarkFolder`,
//!   `ReadingListItem`, `GenTab`, `TabGroup`)
//! - `record_name` is `"<tag>-<uuid>"`, the same form remote tombstones use
//! - field names are camelCase (`folderId`, `addedAt`, `sourceURLs`, ...)
//!
//! The schema is shared with every other client of the remote replica, so
//! field names and the name format must not change.

use crate::error::{RecordError, Result, SyncError};
use bridge_traits::remote::{FieldValue, RemoteRecord};
use chrono::{DateTime, Utc};
use core_library::models::{
    Bookmark, BookmarkFolder, Entity, EntityKind, GenTab, GenTabComponent, ReadingListItem,
    TabGroup,
};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Record name (and tombstone identifier) of an entity.
pub fn record_name(kind: EntityKind, id: Uuid) -> String {
    format!("{}-{}", kind.tag(), id)
}

/// Split a record name or tombstone into its kind and id.
///
/// Returns `None` for an unknown prefix or an unparsable UUID.
///
/// # Example
///
/// ```
/// use core_sync::record::decode_record_name;
/// use core_library::models::EntityKind;
///
/// let (kind, _) = decode_record_name("BookmarkFolder-67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
/// assert_eq!(kind, EntityKind::BookmarkFolder);
/// assert!(decode_record_name("Playlist-67e55044-10b1-426f-9247-bb680e5fe0c8").is_none());
/// ```
pub fn decode_record_name(name: &str) -> Option<(EntityKind, Uuid)> {
    EntityKind::ALL.into_iter().find_map(|kind| {
        let id = name
            .strip_prefix(kind.tag())
            .and_then(|rest| rest.strip_prefix('-'))?;
        Uuid::parse_str(id).ok().map(|id| (kind, id))
    })
}

/// Conversion between an entity and its remote record.
pub trait RecordCodec: Entity + Sized {
    fn to_record(&self) -> Result<RemoteRecord>;

    fn from_record(record: &RemoteRecord) -> std::result::Result<Self, RecordError>;
}

fn new_record<T: Entity>(entity: &T) -> RemoteRecord {
    RemoteRecord::new(T::KIND.tag(), record_name(T::KIND, entity.id()))
}

fn string(value: &str) -> FieldValue {
    FieldValue::String(value.to_string())
}

/// Typed, error-reporting view over the fields of one record.
struct Fields<'a> {
    record: &'a RemoteRecord,
}

impl<'a> Fields<'a> {
    /// Check the type discriminator against the record name and return the id.
    fn open<T: Entity>(record: &'a RemoteRecord) -> std::result::Result<(Self, Uuid), RecordError> {
        let (kind, id) = decode_record_name(&record.record_name)
            .ok_or_else(|| RecordError::BadRecordName(record.record_name.clone()))?;

        if kind != T::KIND || record.record_type != T::KIND.tag() {
            return Err(RecordError::TypeMismatch {
                record_type: record.record_type.clone(),
                record_name: record.record_name.clone(),
            });
        }

        Ok((Self { record }, id))
    }

    fn invalid(&self, field: &str, message: impl Into<String>) -> RecordError {
        RecordError::InvalidField {
            record_name: self.record.record_name.clone(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    fn require<T>(
        &self,
        field: &str,
        value: Option<T>,
        expected: &str,
    ) -> std::result::Result<T, RecordError> {
        match value {
            Some(value) => Ok(value),
            None if self.record.field(field).is_some() => {
                Err(self.invalid(field, format!("expected {}", expected)))
            }
            None => Err(RecordError::MissingField {
                record_name: self.record.record_name.clone(),
                field: field.to_string(),
            }),
        }
    }

    fn optional<T>(
        &self,
        field: &str,
        value: Option<T>,
        expected: &str,
    ) -> std::result::Result<Option<T>, RecordError> {
        match value {
            Some(value) => Ok(Some(value)),
            None if self.record.field(field).is_some() => {
                Err(self.invalid(field, format!("expected {}", expected)))
            }
            None => Ok(None),
        }
    }

    fn string(&self, field: &str) -> std::result::Result<String, RecordError> {
        self.require(field, self.record.string(field), "string")
            .map(str::to_string)
    }

    fn optional_string(&self, field: &str) -> std::result::Result<Option<String>, RecordError> {
        Ok(self
            .optional(field, self.record.string(field), "string")?
            .map(str::to_string))
    }

    fn bool(&self, field: &str) -> std::result::Result<bool, RecordError> {
        self.require(field, self.record.bool(field), "bool")
    }

    fn timestamp(&self, field: &str) -> std::result::Result<DateTime<Utc>, RecordError> {
        self.require(field, self.record.timestamp(field), "timestamp")
    }

    fn optional_timestamp(
        &self,
        field: &str,
    ) -> std::result::Result<Option<DateTime<Utc>>, RecordError> {
        self.optional(field, self.record.timestamp(field), "timestamp")
    }

    fn optional_uuid(&self, field: &str) -> std::result::Result<Option<Uuid>, RecordError> {
        match self.optional_string(field)? {
            Some(raw) => Uuid::parse_str(&raw)
                .map(Some)
                .map_err(|e| self.invalid(field, e.to_string())),
            None => Ok(None),
        }
    }

    fn string_list(&self, field: &str) -> std::result::Result<Vec<String>, RecordError> {
        self.require(field, self.record.string_list(field), "string list")
            .map(<[String]>::to_vec)
    }
}

impl RecordCodec for Bookmark {
    fn to_record(&self) -> Result<RemoteRecord> {
        Ok(new_record(self)
            .with_field("url", string(&self.url))
            .with_field("title", string(&self.title))
            .with_optional_field(
                "folderId",
                self.folder_id.map(|id| FieldValue::String(id.to_string())),
            )
            .with_optional_field("favicon", self.favicon.clone().map(FieldValue::Bytes))
            .with_field("createdAt", FieldValue::Timestamp(self.created_at)))
    }

    fn from_record(record: &RemoteRecord) -> std::result::Result<Self, RecordError> {
        let (fields, id) = Fields::open::<Self>(record)?;
        Ok(Self {
            id,
            url: fields.string("url")?,
            title: fields.string("title")?,
            folder_id: fields.optional_uuid("folderId")?,
            favicon: fields
                .optional("favicon", record.bytes("favicon"), "bytes")?
                .map(<[u8]>::to_vec),
            created_at: fields.timestamp("createdAt")?,
        })
    }
}

impl RecordCodec for BookmarkFolder {
    fn to_record(&self) -> Result<RemoteRecord> {
        Ok(new_record(self)
            .with_field("name", string(&self.name))
            .with_optional_field(
                "parentId",
                self.parent_id.map(|id| FieldValue::String(id.to_string())),
            )
            .with_field("createdAt", FieldValue::Timestamp(self.created_at)))
    }

    fn from_record(record: &RemoteRecord) -> std::result::Result<Self, RecordError> {
        let (fields, id) = Fields::open::<Self>(record)?;
        Ok(Self {
            id,
            name: fields.string("name")?,
            parent_id: fields.optional_uuid("parentId")?,
            created_at: fields.timestamp("createdAt")?,
        })
    }
}

impl RecordCodec for ReadingListItem {
    fn to_record(&self) -> Result<RemoteRecord> {
        Ok(new_record(self)
            .with_field("url", string(&self.url))
            .with_field("title", string(&self.title))
            .with_optional_field("excerpt", self.excerpt.as_deref().map(string))
            .with_field("isRead", FieldValue::Bool(self.is_read))
            .with_field("addedAt", FieldValue::Timestamp(self.added_at))
            .with_optional_field("readAt", self.read_at.map(FieldValue::Timestamp)))
    }

    fn from_record(record: &RemoteRecord) -> std::result::Result<Self, RecordError> {
        let (fields, id) = Fields::open::<Self>(record)?;
        Ok(Self {
            id,
            url: fields.string("url")?,
            title: fields.string("title")?,
            excerpt: fields.optional_string("excerpt")?,
            is_read: fields.bool("isRead")?,
            added_at: fields.timestamp("addedAt")?,
            read_at: fields.optional_timestamp("readAt")?,
        })
    }
}

impl RecordCodec for GenTab {
    fn to_record(&self) -> Result<RemoteRecord> {
        let components = serde_json::to_string(&self.components)
            .map_err(|e| SyncError::Encoding(format!("GenTab {} components: {}", self.id, e)))?;

        Ok(new_record(self)
            .with_field("title", string(&self.title))
            .with_field("icon", string(&self.icon))
            .with_field("components", FieldValue::String(components))
            .with_field("sourceURLs", FieldValue::StringList(self.source_urls.clone()))
            .with_field("createdAt", FieldValue::Timestamp(self.created_at)))
    }

    fn from_record(record: &RemoteRecord) -> std::result::Result<Self, RecordError> {
        let (fields, id) = Fields::open::<Self>(record)?;
        let raw_components = fields.string("components")?;
        let components: Vec<GenTabComponent> = serde_json::from_str(&raw_components)
            .map_err(|e| fields.invalid("components", e.to_string()))?;

        Ok(Self {
            id,
            title: fields.string("title")?,
            icon: fields.string("icon")?,
            components,
            source_urls: fields.string_list("sourceURLs")?,
            created_at: fields.timestamp("createdAt")?,
        })
    }
}

impl RecordCodec for TabGroup {
    fn to_record(&self) -> Result<RemoteRecord> {
        Ok(new_record(self)
            .with_field("name", string(&self.name))
            .with_field("icon", string(&self.icon))
            .with_field("colorName", string(&self.color_name))
            .with_field(
                "tabIds",
                FieldValue::StringList(self.tab_ids.iter().map(Uuid::to_string).collect()),
            )
            .with_field("isCollapsed", FieldValue::Bool(self.is_collapsed))
            .with_field("createdAt", FieldValue::Timestamp(self.created_at)))
    }

    fn from_record(record: &RemoteRecord) -> std::result::Result<Self, RecordError> {
        let (fields, id) = Fields::open::<Self>(record)?;
        let tab_ids = fields
            .string_list("tabIds")?
            .iter()
            .map(|raw| Uuid::parse_str(raw))
            .collect::<std::result::Result<BTreeSet<Uuid>, _>>()
            .map_err(|e| fields.invalid("tabIds", e.to_string()))?;

        Ok(Self {
            id,
            name: fields.string("name")?,
            icon: fields.string("icon")?,
            color_name: fields.string("colorName")?,
            tab_ids,
            is_collapsed: fields.bool("isCollapsed")?,
            created_at: fields.timestamp("createdAt")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_name_format() {
        let id = Uuid::new_v4();
        assert_eq!(
            record_name(EntityKind::ReadingListItem, id),
            format!("ReadingListItem-{}", id)
        );
    }

    #[test]
    fn test_decode_record_name_prefixes() {
        let id = Uuid::new_v4();

        assert_eq!(
            decode_record_name(&format!("Bookmark-{}", id)),
            Some((EntityKind::Bookmark, id))
        );
        // "BookmarkFolder-" must not be read as a Bookmark with a bad id
        assert_eq!(
            decode_record_name(&format!("BookmarkFolder-{}", id)),
            Some((EntityKind::BookmarkFolder, id))
        );
        assert_eq!(
            decode_record_name(&format!("TabGroup-{}", id)),
            Some((EntityKind::TabGroup, id))
        );

        assert_eq!(decode_record_name(&format!("Playlist-{}", id)), None);
        assert_eq!(decode_record_name("GenTab-not-a-uuid"), None);
        assert_eq!(decode_record_name(&format!("GenTab{}", id)), None);
        assert_eq!(decode_record_name(""), None);
    }

    #[test]
    fn test_bookmark_record_fields() {
        let mut bookmark = Bookmark::new("https://example.com", "Example");
        bookmark.folder_id = Some(Uuid::new_v4());

        let record = bookmark.to_record().unwrap();
        assert_eq!(record.record_type, "Bookmark");
        assert_eq!(record.record_name, format!("Bookmark-{}", bookmark.id));
        assert_eq!(record.string("url"), Some("https://example.com"));
        assert!(record.field("favicon").is_none());

        assert_eq!(Bookmark::from_record(&record).unwrap(), bookmark);
    }

    #[test]
    fn test_gentab_components_travel_as_json() {
        let mut tab = GenTab::new("Trip plan", "map");
        tab.components = vec![
            GenTabComponent::new("heading", "Day 1"),
            GenTabComponent::new("paragraph", "Arrive"),
        ];
        tab.source_urls = vec!["https://a.example".to_string()];

        let record = tab.to_record().unwrap();
        let raw = record.string("components").unwrap();
        assert!(raw.starts_with('['));

        let decoded = GenTab::from_record(&record).unwrap();
        assert_eq!(decoded.component_count(), 2);
        assert_eq!(decoded, tab);
    }

    #[test]
    fn test_tab_group_ids_as_strings() {
        let mut group = TabGroup::new("Research");
        group.tab_ids.insert(Uuid::new_v4());
        group.tab_ids.insert(Uuid::new_v4());

        let record = group.to_record().unwrap();
        assert_eq!(record.string_list("tabIds").map(|ids| ids.len()), Some(2));
        assert_eq!(TabGroup::from_record(&record).unwrap(), group);
    }

    #[test]
    fn test_reading_item_accepts_integer_flag() {
        let item = ReadingListItem::new("https://example.com/a", "Article");
        let mut record = item.to_record().unwrap();
        record.fields.insert("isRead".to_string(), FieldValue::Int(1));

        let decoded = ReadingListItem::from_record(&record).unwrap();
        assert!(decoded.is_read);
        assert_eq!(decoded.read_at, None);
    }

    #[test]
    fn test_missing_field() {
        let folder = BookmarkFolder::new("Work");
        let mut record = folder.to_record().unwrap();
        record.fields.remove("createdAt");

        assert!(matches!(
            BookmarkFolder::from_record(&record),
            Err(RecordError::MissingField { field, .. }) if field == "createdAt"
        ));
    }

    #[test]
    fn test_wrong_field_type() {
        let folder = BookmarkFolder::new("Work");
        let record = folder
            .to_record()
            .unwrap()
            .with_field("name", FieldValue::Int(3));

        assert!(matches!(
            BookmarkFolder::from_record(&record),
            Err(RecordError::InvalidField { field, .. }) if field == "name"
        ));
    }

    #[test]
    fn test_type_and_name_must_agree() {
        let bookmark = Bookmark::new("https://example.com", "Example");
        let mut record = bookmark.to_record().unwrap();
        record.record_name = record_name(EntityKind::ReadingListItem, bookmark.id);

        assert!(matches!(
            Bookmark::from_record(&record),
            Err(RecordError::TypeMismatch { .. })
        ));

        record.record_name = "Bookmark-42".to_string();
        assert!(matches!(
            Bookmark::from_record(&record),
            Err(RecordError::BadRecordName(_))
        ));
    }

    #[test]
    fn test_corrupt_components_rejected() {
        let tab = GenTab::new("Broken", "x");
        let record = tab
            .to_record()
            .unwrap()
            .with_field("components", FieldValue::String("{not json".to_string()));

        assert!(matches!(
            GenTab::from_record(&record),
            Err(RecordError::InvalidField { field, .. }) if field == "components"
        ));
    }
}
