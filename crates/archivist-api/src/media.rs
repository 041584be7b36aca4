use std::io;
use std::net::SocketAddr;

use archivist_db::models::{InsertOutcome, MediaChanges, MediaFilter, NewMedia};
use archivist_types::api::{
    MediaResponse, PaginatedResponse, StatsResponse, SuccessResponse, UpdateMediaRequest,
    UploadResponse,
};
use archivist_types::media::{MediaKind, essence, join_tags};
use archivist_types::query::{Pagination, shortlist_limit};
use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, Path, Query, Request, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use serde::Deserialize;
use tracing::info;

use crate::convert::{self, media_response};
use crate::error::ApiError;
use crate::ids::public_id;
use crate::state::{AppState, with_db};

const DEFAULT_TITLE: &str = "Untitled";
const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";

pub const TITLE_HEADER: &str = "x-media-title";
pub const DESCRIPTION_HEADER: &str = "x-media-description";
pub const TAGS_HEADER: &str = "x-media-tags";
pub const SOURCE_HEADER: &str = "x-media-source";
pub const LOST_DATE_HEADER: &str = "x-media-lost-date";
pub const FOUND_DATE_HEADER: &str = "x-media-found-date";

pub const METADATA_HEADERS: [&str; 6] = [
    TITLE_HEADER,
    DESCRIPTION_HEADER,
    TAGS_HEADER,
    SOURCE_HEADER,
    LOST_DATE_HEADER,
    FOUND_DATE_HEADER,
];

// ── Upload ──────────────────────────────────────────────────────────────

/// Metadata carried in the percent-encoded `X-Media-*` headers.
#[derive(Debug, PartialEq, Eq)]
struct UploadMetadata {
    title: String,
    description: Option<String>,
    tags: Option<String>,
    source_info: Option<String>,
    lost_date: Option<String>,
    found_date: Option<String>,
}

impl UploadMetadata {
    fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        Ok(Self {
            title: header_text(headers, TITLE_HEADER)?.unwrap_or_else(|| DEFAULT_TITLE.into()),
            description: header_text(headers, DESCRIPTION_HEADER)?,
            tags: header_text(headers, TAGS_HEADER)?.and_then(|t| join_tags(t.split(','))),
            source_info: header_text(headers, SOURCE_HEADER)?,
            lost_date: header_text(headers, LOST_DATE_HEADER)?,
            found_date: header_text(headers, FOUND_DATE_HEADER)?,
        })
    }
}

/// Percent-decoded, trimmed header value. Blank counts as absent.
fn header_text(headers: &HeaderMap, name: &str) -> Result<Option<String>, ApiError> {
    let Some(raw) = headers.get(name) else {
        return Ok(None);
    };

    let invalid = || ApiError::bad_request(format!("Invalid {} header", name));
    let raw = raw.to_str().map_err(|_| invalid())?;
    let decoded = urlencoding::decode(raw).map_err(|_| invalid())?;
    let value = decoded.trim();

    Ok((!value.is_empty()).then(|| value.to_string()))
}

/// First `X-Forwarded-For` hop when the proxy is trusted, else the peer address.
fn uploader_ip(parts: &Parts, trust_proxy: bool) -> Option<String> {
    if trust_proxy {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return Some(ip.to_string());
        }
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// POST /api/media/upload: raw body streamed into the storage daemon.
pub async fn upload_media(
    State(state): State<AppState>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let (parts, body) = request.into_parts();

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let media_type = MediaKind::from_mime(content_type).ok_or(ApiError::UnsupportedType)?;
    let mime_type = essence(content_type);

    let meta = UploadMetadata::from_headers(&parts.headers)?;
    let uploader_ip = uploader_ip(&parts, state.trust_proxy);

    let limit = state.max_upload_bytes;
    if declared_length(&parts.headers).is_some_and(|len| len > limit) {
        return Err(ApiError::TooLarge { limit });
    }

    let added = state
        .ipfs
        .add(body.into_data_stream(), Some(limit))
        .await
        .map_err(ApiError::from_upload)?;

    let new = NewMedia {
        id: public_id(),
        cid: added.cid,
        title: meta.title,
        description: meta.description,
        media_type,
        mime_type,
        file_size: Some(added.size),
        tags: meta.tags,
        source_info: meta.source_info,
        lost_date: meta.lost_date,
        found_date: meta.found_date,
        uploader_ip,
    };

    let row = match with_db(&state, "Upload failed", move |db| db.insert_media(&new)).await? {
        InsertOutcome::Created(row) => row,
        InsertOutcome::DuplicateContent { existing_id } => {
            info!("Upload duplicates existing media {}", existing_id);
            return Err(ApiError::Duplicate { id: existing_id });
        }
    };

    info!(
        "Archived {} ({}, {} bytes) as {}",
        row.title, row.mime_type, added.size, row.id
    );

    let created_at = convert::timestamp(&row.created_at)
        .map_err(|e| ApiError::internal("Upload failed", e))?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            success: true,
            id: row.id,
            title: row.title,
            media_type: row.media_type,
            file_size: added.size,
            created_at,
        }),
    ))
}

// ── Listing ─────────────────────────────────────────────────────────────

/// Raw query string for `GET /api/media`. Parsed by hand so bad values get
/// a JSON 400 rather than the extractor's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    page: Option<String>,
    limit: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    search: Option<String>,
    #[serde(rename = "sortBy")]
    sort_by: Option<String>,
    #[serde(rename = "sortOrder")]
    sort_order: Option<String>,
}

impl ListParams {
    fn into_filter(self) -> Result<MediaFilter, ApiError> {
        let page = parse_count("page", self.page.as_deref())?;
        let limit = parse_count("limit", self.limit.as_deref())?;

        Ok(MediaFilter {
            kind: parse_opt(self.kind.as_deref())?,
            search: present(self.search.as_deref()).map(str::to_string),
            sort: parse_opt(self.sort_by.as_deref())?.unwrap_or_default(),
            order: parse_opt(self.sort_order.as_deref())?.unwrap_or_default(),
            pagination: Pagination::new(page, limit),
        })
    }
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_opt<T>(raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: std::str::FromStr<Err = String>,
{
    present(raw)
        .map(str::parse)
        .transpose()
        .map_err(ApiError::BadRequest)
}

/// Negative values clamp to 0, which the pagination helpers treat as "default".
fn parse_count(name: &str, raw: Option<&str>) -> Result<Option<u32>, ApiError> {
    let Some(raw) = present(raw) else {
        return Ok(None);
    };
    let n: i64 = raw
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid {}: {}", name, raw)))?;
    Ok(Some(n.clamp(0, u32::MAX as i64) as u32))
}

/// GET /api/media: paginated public listing.
pub async fn list_media(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PaginatedResponse<MediaResponse>>, ApiError> {
    let filter = params.into_filter()?;
    let pagination = filter.pagination;

    let (data, total) = with_db(&state, "Failed to fetch media", move |db| {
        let page = db.list_public_media(&filter)?;
        Ok((convert::media_list(page.rows)?, page.total))
    })
    .await?;

    Ok(Json(PaginatedResponse {
        data,
        total,
        page: pagination.page,
        total_pages: pagination.total_pages(total),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ShortlistParams {
    limit: Option<String>,
}

impl ShortlistParams {
    fn limit(&self) -> Result<u32, ApiError> {
        Ok(shortlist_limit(parse_count("limit", self.limit.as_deref())?))
    }
}

/// GET /api/media/recent
pub async fn recent_media(
    State(state): State<AppState>,
    Query(params): Query<ShortlistParams>,
) -> Result<Json<Vec<MediaResponse>>, ApiError> {
    let limit = params.limit()?;
    let media = with_db(&state, "Failed to fetch recent media", move |db| {
        convert::media_list(db.recent_media(limit)?)
    })
    .await?;
    Ok(Json(media))
}

/// GET /api/media/popular
pub async fn popular_media(
    State(state): State<AppState>,
    Query(params): Query<ShortlistParams>,
) -> Result<Json<Vec<MediaResponse>>, ApiError> {
    let limit = params.limit()?;
    let media = with_db(&state, "Failed to fetch popular media", move |db| {
        convert::media_list(db.popular_media(limit)?)
    })
    .await?;
    Ok(Json(media))
}

/// GET /api/media/stats
pub async fn media_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = with_db(&state, "Failed to fetch stats", |db| db.media_stats()).await?;
    Ok(Json(StatsResponse {
        total_media: stats.total_media,
        total_views: stats.total_views,
        by_type: stats.by_type.into_iter().collect(),
    }))
}

// ── Single record ───────────────────────────────────────────────────────

/// GET /api/media/{id}: counts a view; hidden records are not found.
pub async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MediaResponse>, ApiError> {
    let media = with_db(&state, "Failed to fetch media", move |db| {
        db.view_public_media(&id)?.map(media_response).transpose()
    })
    .await?
    .ok_or(ApiError::NotFound("Media not found"))?;

    Ok(Json(media))
}

/// GET /api/media/{id}/stream: content piped from the daemon.
pub async fn stream_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    const FAILED: &str = "Failed to stream media";

    let stored = with_db(&state, FAILED, move |db| db.get_stored_media(&id))
        .await?
        .filter(|stored| stored.media.is_public)
        .ok_or(ApiError::NotFound("Media not found"))?;

    let mut content = Box::pin(
        state
            .ipfs
            .cat_stream(&stored.cid)
            .map_err(|e| ApiError::internal(FAILED, e))?,
    );

    // Wait for data before committing to a 200
    let first: Option<Bytes> = match content.next().await {
        Some(Ok(chunk)) => Some(chunk),
        Some(Err(e)) => return Err(ApiError::internal(FAILED, e)),
        None => None,
    };

    let body = stream::iter(first.map(Ok::<_, io::Error>)).chain(content);

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &stored.media.mime_type)
        .header(header::CACHE_CONTROL, IMMUTABLE_CACHE);
    if let Some(size) = stored.media.file_size {
        response = response.header(header::CONTENT_LENGTH, size);
    }

    response
        .body(Body::from_stream(body))
        .map_err(|e| ApiError::internal(FAILED, e))
}

/// PATCH /api/media/{id}: whitelisted fields only; works on hidden records.
pub async fn update_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateMediaRequest>, JsonRejection>,
) -> Result<Json<MediaResponse>, ApiError> {
    let Json(req) = payload?;
    let changes = media_changes(req)?;

    let media = with_db(&state, "Failed to update media", move |db| {
        db.update_media(&id, &changes)?.map(media_response).transpose()
    })
    .await?
    .ok_or(ApiError::NotFound("Media not found"))?;

    Ok(Json(media))
}

fn media_changes(req: UpdateMediaRequest) -> Result<MediaChanges, ApiError> {
    let title = match req.title {
        None => None,
        Some(Some(title)) if !title.trim().is_empty() => Some(title.trim().to_string()),
        Some(_) => return Err(ApiError::bad_request("Title cannot be empty")),
    };

    Ok(MediaChanges {
        title,
        description: req.description,
        tags: req.tags.map(|tags| tags.and_then(|t| join_tags(t.split(',')))),
        source_info: req.source_info,
        lost_date: req.lost_date,
        found_date: req.found_date,
        is_public: req.is_public,
    })
}

/// DELETE /api/media/{id}: metadata only; stored content is left alone.
pub async fn delete_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let deleted_id = id.clone();
    let deleted = with_db(&state, "Failed to delete media", move |db| db.delete_media(&id)).await?;
    if !deleted {
        return Err(ApiError::NotFound("Media not found"));
    }

    info!("Deleted media {}", deleted_id);
    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use archivist_types::query::{SortField, SortOrder};
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn metadata_headers_are_decoded_and_normalized() {
        let meta = UploadMetadata::from_headers(&headers(&[
            (TITLE_HEADER, "Ceefax%20Pages%20%E2%80%93%201983"),
            (TAGS_HEADER, "teletext%2C%20bbc%2C%2C%20%20"),
            (LOST_DATE_HEADER, "1983-04-01"),
        ]))
        .unwrap();

        assert_eq!(meta.title, "Ceefax Pages \u{2013} 1983");
        assert_eq!(meta.tags.as_deref(), Some("teletext,bbc"));
        assert_eq!(meta.lost_date.as_deref(), Some("1983-04-01"));
        assert_eq!(meta.description, None);
    }

    #[test]
    fn missing_title_defaults() {
        let meta = UploadMetadata::from_headers(&headers(&[(TITLE_HEADER, "%20%20")])).unwrap();
        assert_eq!(meta.title, DEFAULT_TITLE);
    }

    #[test]
    fn undecodable_header_is_rejected() {
        let err = UploadMetadata::from_headers(&headers(&[(DESCRIPTION_HEADER, "%FF%FE")]))
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn forwarded_for_respects_proxy_trust() {
        let request = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .extension(ConnectInfo(SocketAddr::from(([192, 168, 1, 20], 50000))))
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();

        assert_eq!(uploader_ip(&parts, true).as_deref(), Some("203.0.113.9"));
        assert_eq!(uploader_ip(&parts, false).as_deref(), Some("192.168.1.20"));
    }

    #[test]
    fn list_params_parse_and_reject() {
        let filter = ListParams {
            page: Some("-4".into()),
            limit: Some("0".into()),
            kind: Some("video".into()),
            search: Some("  ".into()),
            sort_by: Some("view_count".into()),
            sort_order: Some("ASC".into()),
        }
        .into_filter()
        .unwrap();

        assert_eq!(filter.pagination, Pagination { page: 1, limit: 20 });
        assert_eq!(filter.kind, Some(MediaKind::Video));
        assert_eq!(filter.search, None);
        assert_eq!(filter.sort, SortField::ViewCount);
        assert_eq!(filter.order, SortOrder::Asc);

        for bad in [
            ListParams { kind: Some("hologram".into()), ..Default::default() },
            ListParams { sort_by: Some("cid".into()), ..Default::default() },
            ListParams { sort_order: Some("sideways".into()), ..Default::default() },
            ListParams { page: Some("two".into()), ..Default::default() },
        ] {
            assert!(matches!(bad.into_filter(), Err(ApiError::BadRequest(_))));
        }
    }

    #[test]
    fn blank_title_patch_is_rejected() {
        let req: UpdateMediaRequest = serde_json::from_str(r#"{"title": "   "}"#).unwrap();
        assert!(media_changes(req).is_err());

        let req: UpdateMediaRequest = serde_json::from_str(r#"{"title": null}"#).unwrap();
        assert!(media_changes(req).is_err());
    }

    #[test]
    fn patch_tags_are_normalized_and_clearable() {
        let req: UpdateMediaRequest =
            serde_json::from_str(r#"{"tags": " a , ,b ", "description": null}"#).unwrap();
        let changes = media_changes(req).unwrap();
        assert_eq!(changes.tags, Some(Some("a,b".into())));
        assert_eq!(changes.description, Some(None));
        assert_eq!(changes.title, None);
    }
}
