use archivist_db::models::{CollectionChanges, NewCollection};
use archivist_ipfs::IpfsError;
use archivist_types::api::{
    AddMediaRequest, CollectionDetail, CollectionResponse, CreateCollectionRequest,
    SuccessResponse, UpdateCollectionRequest,
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::info;

use crate::convert::{self, collection_response};
use crate::error::ApiError;
use crate::ids::public_id;
use crate::state::{AppState, with_db};

const NOT_FOUND: ApiError = ApiError::NotFound("Collection not found");

fn required_name(name: Option<&str>) -> Result<String, ApiError> {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("Collection name is required"))
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Pin a cover so it outlives garbage collection on the daemon.
async fn pin_cover(state: &AppState, cid: &str) -> Result<(), ApiError> {
    match state.ipfs.pin(cid).await {
        Ok(()) => Ok(()),
        Err(IpfsError::InvalidCid(_)) => Err(ApiError::bad_request("Invalid cover_image_cid")),
        Err(e) => Err(ApiError::internal("Failed to pin cover image", e)),
    }
}

/// GET /api/collections
pub async fn list_collections(
    State(state): State<AppState>,
) -> Result<Json<Vec<CollectionResponse>>, ApiError> {
    let collections = with_db(&state, "Failed to fetch collections", |db| {
        db.list_collections()?
            .into_iter()
            .map(collection_response)
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await?;
    Ok(Json(collections))
}

/// POST /api/collections
pub async fn create_collection(
    State(state): State<AppState>,
    payload: Result<Json<CreateCollectionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let name = required_name(req.name.as_deref())?;
    let cover_image_cid = blank_to_none(req.cover_image_cid);

    if let Some(cid) = &cover_image_cid {
        pin_cover(&state, cid).await?;
    }

    let new = NewCollection {
        id: public_id(),
        name,
        description: blank_to_none(req.description),
        cover_image_cid,
    };

    let collection = with_db(&state, "Failed to create collection", move |db| {
        collection_response(db.insert_collection(&new)?)
    })
    .await?;

    info!("Created collection {} ({})", collection.name, collection.id);
    Ok((StatusCode::CREATED, Json(collection)))
}

/// GET /api/collections/{id}: with its public media, newest link first.
pub async fn get_collection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CollectionDetail>, ApiError> {
    let detail = with_db(&state, "Failed to fetch collection", move |db| {
        let Some(row) = db.get_collection(&id)? else {
            return Ok(None);
        };
        let media = convert::media_list(db.collection_media(&id)?)?;
        Ok(Some(CollectionDetail {
            collection: collection_response(row)?,
            media,
        }))
    })
    .await?
    .ok_or(NOT_FOUND)?;

    Ok(Json(detail))
}

/// PATCH /api/collections/{id}
pub async fn update_collection(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCollectionRequest>, JsonRejection>,
) -> Result<Json<CollectionResponse>, ApiError> {
    let Json(req) = payload?;

    // Absent leaves the name alone; null or blank is rejected
    let name = match req.name {
        Some(name) => Some(required_name(name.as_deref())?),
        None => None,
    };
    let cover_image_cid = req.cover_image_cid.map(blank_to_none);
    if let Some(Some(cid)) = &cover_image_cid {
        pin_cover(&state, cid).await?;
    }

    let changes = CollectionChanges {
        name,
        description: req.description.map(blank_to_none),
        cover_image_cid,
    };

    let collection = with_db(&state, "Failed to update collection", move |db| {
        db.update_collection(&id, &changes)?
            .map(collection_response)
            .transpose()
    })
    .await?
    .ok_or(NOT_FOUND)?;

    Ok(Json(collection))
}

/// DELETE /api/collections/{id}: member media are untouched.
pub async fn delete_collection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let deleted = with_db(&state, "Failed to delete collection", move |db| {
        db.delete_collection(&id)
    })
    .await?;
    if !deleted {
        return Err(NOT_FOUND);
    }
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/collections/{id}/cover: cover content, buffered.
pub async fn collection_cover(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let collection = with_db(&state, "Failed to fetch cover image", move |db| {
        db.get_collection(&id)
    })
    .await?
    .ok_or(NOT_FOUND)?;

    let cid = collection
        .cover_image_cid
        .ok_or(ApiError::NotFound("Collection has no cover image"))?;

    let bytes = state
        .ipfs
        .cat(&cid)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch cover image", e))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        bytes,
    ))
}

/// POST /api/collections/{id}/media: link by public id; linking twice is a no-op.
pub async fn add_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AddMediaRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(req) = payload?;
    let media_id = blank_to_none(req.media_id)
        .ok_or_else(|| ApiError::bad_request("Media ID is required"))?;

    with_db(&state, "Failed to add media to collection", move |db| {
        if db.get_collection(&id)?.is_none() {
            return Ok(Err(NOT_FOUND));
        }
        if db.get_media(&media_id)?.is_none() {
            return Ok(Err(ApiError::NotFound("Media not found")));
        }
        db.add_to_collection(&id, &media_id)?;
        Ok(Ok(()))
    })
    .await??;

    Ok(Json(SuccessResponse::ok()))
}

/// DELETE /api/collections/{id}/media/{media_id}: unlinking a non-member succeeds.
pub async fn remove_media(
    State(state): State<AppState>,
    Path((id, media_id)): Path<(String, String)>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let found = with_db(&state, "Failed to remove media from collection", move |db| {
        if db.get_collection(&id)?.is_none() {
            return Ok(false);
        }
        db.remove_from_collection(&id, &media_id)?;
        Ok(true)
    })
    .await?;

    if !found {
        return Err(NOT_FOUND);
    }
    Ok(Json(SuccessResponse::ok()))
}
