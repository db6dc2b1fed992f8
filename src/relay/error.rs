//! Relay failure taxonomy and its mapping to HTTP responses.

use std::time::Duration;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors that terminate a relayed call.
///
/// The `Display` text carries the underlying cause for logs. Callers only
/// ever see [`RelayError::public_message`].
#[derive(Debug, Error)]
pub enum RelayError {
    /// Body did not decode into a descriptor, or method/url was empty.
    #[error("invalid request descriptor: {0}")]
    InvalidInput(String),

    /// Method or URL cannot form an outbound request.
    #[error("cannot build outbound request: {0}")]
    RequestConstruction(String),

    /// Transport failure before response headers arrived.
    #[error("outbound request failed: {0}")]
    Upstream(String),

    /// The outbound deadline expired before response headers arrived.
    #[error("outbound request timed out after {0:?}")]
    UpstreamTimeout(Duration),

    /// The upstream body stream failed, was truncated, or hit the deadline.
    #[error("failed to read response body: {0}")]
    BodyRead(String),

    #[error("failed to encode summary: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed text returned to the caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            RelayError::InvalidInput(_) => "Invalid request format",
            RelayError::RequestConstruction(_) => "Failed to create request",
            RelayError::Upstream(_) | RelayError::UpstreamTimeout(_) => "Failed to perform request",
            RelayError::BodyRead(_) => "Failed to read response body",
            RelayError::Serialization(_) => "Failed to marshal response",
        }
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::InvalidInput(_) => "invalid_input",
            RelayError::RequestConstruction(_) => "request_construction",
            RelayError::Upstream(_) => "upstream",
            RelayError::UpstreamTimeout(_) => "upstream_timeout",
            RelayError::BodyRead(_) => "body_read",
            RelayError::Serialization(_) => "serialization",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::X_CONTENT_TYPE_OPTIONS, "nosniff")],
            format!("{}\n", self.public_message()),
        )
            .into_response()
    }
}
