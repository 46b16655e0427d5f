//! Error types for registration and bundle requests

use crate::asset::AssetType;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// A bundle request that cannot be served as asked
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("bundle count {0:?} is not a number")]
    InvalidCount(String),

    #[error("bundle declares {declared} file(s) but lists {parsed}")]
    CountMismatch { declared: usize, parsed: usize },

    #[error("file token {0:?} is not a safe relative path")]
    UnsafePath(String),
}

#[derive(Debug, Error)]
pub enum CombinerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{path:?} is not a {asset_type} file")]
    InvalidExtension { asset_type: AssetType, path: String },
}

impl CombinerError {
    /// HTTP status the error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            CombinerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CombinerError::InvalidExtension { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        CombinerError::from(self).into_response()
    }
}

impl IntoResponse for CombinerError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
