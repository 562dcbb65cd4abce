//! HTTP mapping of [`AppError`].

use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use cbx_core::AppError;
use serde_json::json;

/// Wraps a core error so actix can turn it into a JSON `{code, message}` body.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self.0 {
            AppError::NotFound(..) => "not_found",
            AppError::ValidationError(_) => "invalid_request",
            AppError::Conflict(_) => "conflict",
            AppError::Fetch(_) => "fetch_failed",
            AppError::Feed { .. } => "feed_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        ApiError(e)
    }
}

impl From<askama::Error> for ApiError {
    fn from(e: askama::Error) -> Self {
        ApiError(AppError::Internal(format!("template: {e}")))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Fetch(_) | AppError::Feed { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{self}");
        } else {
            log::debug!("{self}");
        }
        HttpResponse::build(status).json(json!({ "code": self.code(), "message": self.to_string() }))
    }
}
