use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::path::PathBuf;

/// Error type for the gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A required setting is absent or empty.
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    /// A setting is present but unusable.
    #[error("invalid configuration {name}: {reason}")]
    InvalidConfig { name: &'static str, reason: String },

    /// The counter store could not be reached.
    #[error("counter store request failed: {0}")]
    Store(#[from] reqwest::Error),

    /// The counter store answered with an error or something unexpected.
    #[error("counter store replied: {0}")]
    StoreResponse(String),

    #[error("failed to read {}: {source}", path.display())]
    DataFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed todo list: {0}")]
    DataFormat(#[from] serde_json::Error),

    #[error("metrics encoding failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
