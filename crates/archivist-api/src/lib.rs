//! HTTP handlers for the archive catalog, mounted under `/api`.

pub mod collections;
mod convert;
pub mod error;
pub mod health;
pub mod ids;
pub mod media;
pub mod state;

use axum::{
    Router,
    routing::{delete, get, post},
};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// All routes with state applied. Cross-cutting layers (CORS, tracing) are
/// added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/media", get(media::list_media))
        .route("/api/media/upload", post(media::upload_media))
        .route("/api/media/recent", get(media::recent_media))
        .route("/api/media/popular", get(media::popular_media))
        .route("/api/media/stats", get(media::media_stats))
        .route(
            "/api/media/{id}",
            get(media::get_media)
                .patch(media::update_media)
                .delete(media::delete_media),
        )
        .route("/api/media/{id}/stream", get(media::stream_media))
        .route(
            "/api/collections",
            get(collections::list_collections).post(collections::create_collection),
        )
        .route(
            "/api/collections/{id}",
            get(collections::get_collection)
                .patch(collections::update_collection)
                .delete(collections::delete_collection),
        )
        .route("/api/collections/{id}/cover", get(collections::collection_cover))
        .route("/api/collections/{id}/media", post(collections::add_media))
        .route(
            "/api/collections/{id}/media/{media_id}",
            delete(collections::remove_media),
        )
        .with_state(state)
}
