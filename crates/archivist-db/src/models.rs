//! Database row types. These map directly to SQLite rows and stay separate
//! from the archivist-types API models.

use archivist_types::media::MediaKind;
use archivist_types::query::{Pagination, SortField, SortOrder};

/// The publicly visible columns of a media row.
///
/// `cid`, `thumbnail_cid` and `uploader_ip` are never selected into this
/// type; only [`StoredMedia`] carries the content identifier.
#[derive(Debug, Clone)]
pub struct MediaRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub media_type: MediaKind,
    pub mime_type: String,
    pub file_size: Option<i64>,
    pub tags: Option<String>,
    pub source_info: Option<String>,
    pub lost_date: Option<String>,
    pub found_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub view_count: i64,
    pub is_public: bool,
}

/// A media row together with its hidden content identifier. Server-side use only.
#[derive(Debug, Clone)]
pub struct StoredMedia {
    pub media: MediaRow,
    pub cid: String,
}

pub struct NewMedia {
    pub id: String,
    pub cid: String,
    pub title: String,
    pub description: Option<String>,
    pub media_type: MediaKind,
    pub mime_type: String,
    pub file_size: Option<u64>,
    pub tags: Option<String>,
    pub source_info: Option<String>,
    pub lost_date: Option<String>,
    pub found_date: Option<String>,
    pub uploader_ip: Option<String>,
}

#[derive(Debug)]
pub enum InsertOutcome {
    Created(MediaRow),
    /// The content identifier is already catalogued under another public id.
    DuplicateContent { existing_id: String },
}

/// Whitelisted mutable columns. `Some(None)` clears an optional column.
#[derive(Debug, Default, Clone)]
pub struct MediaChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub tags: Option<Option<String>>,
    pub source_info: Option<Option<String>>,
    pub lost_date: Option<Option<String>>,
    pub found_date: Option<Option<String>>,
    pub is_public: Option<bool>,
}

impl MediaChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.source_info.is_none()
            && self.lost_date.is_none()
            && self.found_date.is_none()
            && self.is_public.is_none()
    }
}

#[derive(Debug, Default, Clone)]
pub struct MediaFilter {
    pub kind: Option<MediaKind>,
    pub search: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
    pub pagination: Pagination,
}

pub struct MediaPage {
    pub rows: Vec<MediaRow>,
    pub total: u64,
}

pub struct StatsRow {
    pub total_media: u64,
    pub total_views: u64,
    pub by_type: Vec<(String, u64)>,
}

#[derive(Debug, Clone)]
pub struct CollectionRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub cover_image_cid: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct NewCollection {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub cover_image_cid: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct CollectionChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub cover_image_cid: Option<Option<String>>,
}

impl CollectionChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.cover_image_cid.is_none()
    }
}
