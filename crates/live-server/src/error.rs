//! HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ofrezco_live_core::NotifyError;
use thiserror::Error;
use tracing::error;

use crate::metrics;

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was malformed.
    #[error("{0}")]
    BadRequest(&'static str),

    /// A notification query failed.
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Notify(NotifyError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            ApiError::Notify(NotifyError::Store(_)) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
            metrics::record_error("store");
        }
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}
