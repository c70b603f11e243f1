//! Maps `AppError` onto HTTP responses with a `{detail}` JSON body.
//! Internal failures are logged and never leak their message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use domains::AppError;

pub struct ApiError(AppError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self.0 {
            AppError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg),
            err @ AppError::NotFound(..) => (StatusCode::NOT_FOUND, err.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl ApiError {
    pub fn unauthenticated(detail: &str) -> Self {
        Self(AppError::Unauthenticated(detail.to_string()))
    }

    pub fn validation(detail: &str) -> Self {
        Self(AppError::Validation(detail.to_string()))
    }
}
