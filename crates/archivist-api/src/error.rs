use std::sync::atomic::{AtomicBool, Ordering};

use archivist_ipfs::IpfsError;
use archivist_types::media::allowed_mime_types;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Include the underlying error chain as `message` in 500 responses.
/// Off unless running in the development environment.
pub fn expose_details(enabled: bool) {
    EXPOSE_DETAILS.store(enabled, Ordering::Relaxed);
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unsupported file type")]
    UnsupportedType,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("This content is already archived")]
    Duplicate { id: String },

    #[error("Upload exceeds the maximum size of {limit} bytes")]
    TooLarge { limit: u64 },

    /// `what` is the client-facing summary; `source` is logged.
    #[error("{what}")]
    Internal {
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn internal(what: &'static str, source: impl Into<anyhow::Error>) -> Self {
        ApiError::Internal {
            what,
            source: source.into(),
        }
    }

    /// Maps a gateway failure during an upload.
    pub fn from_upload(err: IpfsError) -> Self {
        match err {
            IpfsError::TooLarge { limit } => ApiError::TooLarge { limit },
            IpfsError::Input(reason) => {
                ApiError::BadRequest(format!("Upload stream interrupted: {}", reason))
            }
            other => ApiError::internal("Upload failed", other),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::UnsupportedType => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Duplicate { .. } => StatusCode::CONFLICT,
            ApiError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body for this error. `expose` adds the cause chain to 500s.
    pub fn body(&self, expose: bool) -> Value {
        match self {
            ApiError::UnsupportedType => json!({
                "error": self.to_string(),
                "allowedTypes": allowed_mime_types(),
            }),
            ApiError::Duplicate { id } => json!({
                "error": self.to_string(),
                "id": id,
            }),
            ApiError::Internal { source, .. } if expose => json!({
                "error": self.to_string(),
                "message": format!("{:#}", source),
            }),
            _ => json!({ "error": self.to_string() }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal { what, source } = &self {
            error!("{}: {:#}", what, source);
        }

        let body = self.body(EXPOSE_DETAILS.load(Ordering::Relaxed));
        (self.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_type_lists_the_allow_list() {
        let body = ApiError::UnsupportedType.body(false);
        assert_eq!(body["error"], "Unsupported file type");
        let allowed = body["allowedTypes"].as_array().unwrap();
        assert_eq!(allowed.len(), 18);
        assert!(allowed.iter().any(|m| m == "application/pdf"));
    }

    #[test]
    fn internal_details_only_when_exposed() {
        let err = ApiError::internal("Failed to fetch media", anyhow::anyhow!("disk I/O error"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let hidden = err.body(false);
        assert_eq!(hidden["error"], "Failed to fetch media");
        assert!(hidden.get("message").is_none());

        let shown = err.body(true);
        assert_eq!(shown["message"], "disk I/O error");
    }

    #[test]
    fn upload_errors_map_to_client_statuses() {
        let too_large = ApiError::from_upload(IpfsError::TooLarge { limit: 10 });
        assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let interrupted = ApiError::from_upload(IpfsError::Input("reset".into()));
        assert_eq!(interrupted.status(), StatusCode::BAD_REQUEST);

        let failed = ApiError::from_upload(IpfsError::MissingCid);
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.body(false)["error"], "Upload failed");
    }

    #[test]
    fn duplicate_carries_existing_id() {
        let body = ApiError::Duplicate { id: "abc123".into() }.body(false);
        assert_eq!(body["id"], "abc123");
    }
}
