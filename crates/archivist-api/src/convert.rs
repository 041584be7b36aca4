//! Row -> API model conversion.

use anyhow::{Context, Result};
use archivist_db::models::{CollectionRow, MediaRow};
use archivist_types::api::{CollectionResponse, MediaResponse};
use chrono::{DateTime, Utc};

pub fn media_response(row: MediaRow) -> Result<MediaResponse> {
    Ok(MediaResponse {
        created_at: timestamp(&row.created_at)?,
        updated_at: timestamp(&row.updated_at)?,
        id: row.id,
        title: row.title,
        description: row.description,
        media_type: row.media_type,
        mime_type: row.mime_type,
        file_size: row.file_size.map(|s| s.max(0) as u64),
        tags: row.tags,
        source_info: row.source_info,
        lost_date: row.lost_date,
        found_date: row.found_date,
        view_count: row.view_count.max(0) as u64,
        is_public: row.is_public,
    })
}

pub fn media_list(rows: Vec<MediaRow>) -> Result<Vec<MediaResponse>> {
    rows.into_iter().map(media_response).collect()
}

pub fn collection_response(row: CollectionRow) -> Result<CollectionResponse> {
    Ok(CollectionResponse {
        created_at: timestamp(&row.created_at)?,
        updated_at: timestamp(&row.updated_at)?,
        id: row.id,
        name: row.name,
        description: row.description,
        cover_image_cid: row.cover_image_cid,
    })
}

pub fn timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .with_context(|| format!("Invalid stored timestamp {:?}", raw))
}
