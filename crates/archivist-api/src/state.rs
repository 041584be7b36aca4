use std::sync::Arc;

use archivist_db::Database;
use archivist_ipfs::IpfsClient;
use tracing::error;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub ipfs: IpfsClient,
    /// Upload cap in bytes, enforced while the body is streamed.
    pub max_upload_bytes: u64,
    /// Take the uploader address from `X-Forwarded-For` when set.
    pub trust_proxy: bool,
}

/// Run a database call on the blocking pool. Failures become a 500 with
/// `what` as the client-facing message.
pub async fn with_db<F, T>(state: &AppState, what: &'static str, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal(what, e)
        })?
        .map_err(|e| ApiError::internal(what, e))
}
