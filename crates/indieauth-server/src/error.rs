//! Server error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::warn;

/// Failures that prevent a handler from reaching the login flow at all
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// No `public_url` is configured and the request has no usable `Host`
    #[error("Cannot determine the public URL of this instance")]
    UnknownHost,

    /// Client URLs could not be derived from the base URL
    #[error("Invalid login path: {0}")]
    InvalidLoginPath(#[from] url::ParseError),
}

impl ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownHost => StatusCode::BAD_REQUEST,
            Self::InvalidLoginPath(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!("Request failed: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}
