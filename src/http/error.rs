use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StorageError;
use crate::CommerceError;

/// Everything a handler can fail with. Rendered as `{success: false, message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Commerce(#[from] CommerceError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Commerce(e) => match e {
                CommerceError::ProductNotFound | CommerceError::CartNotFound | CommerceError::CartItemNotFound | CommerceError::OrderNotFound => StatusCode::NOT_FOUND,
                CommerceError::InsufficientStock { .. } | CommerceError::EmptyCart | CommerceError::Validation(_) | CommerceError::InvalidStatusTransition(_) => StatusCode::BAD_REQUEST,
                CommerceError::Forbidden => StatusCode::FORBIDDEN,
                CommerceError::Storage(StorageError::StockConflict { .. }) => StatusCode::BAD_REQUEST,
                CommerceError::Storage(StorageError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
                CommerceError::Storage(StorageError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Commerce(CommerceError::Storage(StorageError::StockConflict { .. })) => "Not enough stock available".to_string(),
            Self::Commerce(CommerceError::Storage(StorageError::Unavailable(_))) => "Service temporarily unavailable".to_string(),
            Self::Commerce(CommerceError::Storage(StorageError::Backend(_))) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Commerce(CommerceError::Storage(e)) = &self {
            error!(error = %e, "storage failure");
        }
        (self.status(), Json(json!({ "success": false, "message": self.message() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
