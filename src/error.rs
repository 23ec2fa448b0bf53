//! Error taxonomy shared by every handler.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::conversion::ConversionError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// Duplicate registration.
    #[error("{0}")]
    Conflict(String),

    /// Bad credentials or a missing/invalid token.
    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    NotFound(String),

    #[error("rate limit exceeded, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    /// A collaborator failed; `message` is what the endpoint was doing.
    #[error("{message}: {detail}")]
    External { message: String, detail: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::External { .. } | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps a pipeline failure for an endpoint whose generic failure text is `message`.
    pub fn from_conversion(err: ConversionError, message: &str) -> Self {
        match err {
            ConversionError::NoExtractableText => {
                AppError::Validation("No extractable text found in PDF".into())
            }
            ConversionError::NotFound => AppError::NotFound("PDF not found".into()),
            other => AppError::External {
                message: message.to_string(),
                detail: other.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::External { message, detail } => json!({ "message": message, "error": detail }),
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                json!({
                    "message": "Something went wrong, try again later",
                    "error": e.to_string(),
                })
            }
            other => json!({ "message": other.to_string() }),
        };

        let mut res = (status, Json(body)).into_response();
        if let AppError::RateLimited { retry_after } = self {
            if let Ok(v) = HeaderValue::from_str(&retry_after.to_string()) {
                res.headers_mut().insert(header::RETRY_AFTER, v);
            }
        }
        res
    }
}
