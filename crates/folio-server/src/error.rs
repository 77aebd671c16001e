use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use folio_content::{BlobError, ControllerError, CountryError, GateError, ViewerError};
use folio_shared::ContentError;
use folio_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upload too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A collaborator (image host, country API) failed.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::TooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::Upstream(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            ServerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Path(_) | StoreError::InvalidValue(_) => {
                ServerError::BadRequest(e.to_string())
            }
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<ContentError> for ServerError {
    fn from(e: ContentError) -> Self {
        match e {
            ContentError::Path(_) => ServerError::BadRequest(e.to_string()),
            ContentError::Validation(v) => ServerError::Validation(v.to_string()),
            ContentError::Malformed { .. } | ContentError::Serialization(_) => {
                ServerError::Internal(e.to_string())
            }
        }
    }
}

impl From<BlobError> for ServerError {
    fn from(e: BlobError) -> Self {
        match e {
            BlobError::TooLarge { size, max } => ServerError::TooLarge { size, max },
            BlobError::Empty | BlobError::InvalidKey(_) => ServerError::BadRequest(e.to_string()),
            BlobError::NotFound(key) => ServerError::NotFound(key),
            BlobError::Http(_) | BlobError::Rejected(_) => ServerError::Upstream(e.to_string()),
            BlobError::Io(_) => ServerError::Internal(e.to_string()),
        }
    }
}

impl From<ControllerError> for ServerError {
    fn from(e: ControllerError) -> Self {
        match e {
            ControllerError::NotOpen | ControllerError::WrongMode(_) => {
                ServerError::BadRequest(e.to_string())
            }
            ControllerError::Validation(v) => ServerError::Validation(v.to_string()),
            ControllerError::Content(c) => c.into(),
            ControllerError::Upload(b) => b.into(),
            ControllerError::Store(s) => s.into(),
        }
    }
}

impl From<ViewerError> for ServerError {
    fn from(e: ViewerError) -> Self {
        match e {
            ViewerError::Content(c) => c.into(),
            ViewerError::Store(s) => s.into(),
            ViewerError::Closed => ServerError::Internal(e.to_string()),
        }
    }
}

impl From<GateError> for ServerError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::InvalidCredential => ServerError::Unauthorized,
            GateError::Config(_) => ServerError::Internal(e.to_string()),
            GateError::Content(c) => c.into(),
            GateError::Store(s) => s.into(),
        }
    }
}

impl From<CountryError> for ServerError {
    fn from(e: CountryError) -> Self {
        ServerError::Upstream(e.to_string())
    }
}
