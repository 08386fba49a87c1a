//! HTTP-facing errors.
//!
//! Handlers return `ApiError`; actix turns it into a response through
//! `ResponseError`. The 404 and 500 bodies are filled in by
//! [`crate::middleware::error_pages`], which can see the request path.

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use ql_core::error::AppError;
use thiserror::Error;

pub const LOGIN_URL: &str = "/auth/login/";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Carries the path to come back to after logging in.
    #[error("login required for {0}")]
    LoginRequired(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("upload exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }
}

/// `/auth/login/?next=<path>`
pub fn login_redirect_url(next: &str) -> String {
    format!("{LOGIN_URL}?next={}", urlencoding::encode(next))
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::LoginRequired(_) => StatusCode::FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::LoginRequired(next) => HttpResponse::Found()
                .insert_header((header::LOCATION, login_redirect_url(next)))
                .finish(),
            ApiError::NotFound(what) => {
                log::debug!("404: {what}");
                HttpResponse::NotFound().finish()
            }
            ApiError::Internal(cause) => {
                log::error!("request failed: {cause}");
                HttpResponse::InternalServerError().finish()
            }
            other => HttpResponse::build(other.status_code())
                .content_type("text/plain; charset=utf-8")
                .body(other.to_string()),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(kind, key) => ApiError::NotFound(format!("{kind} {key}")),
            AppError::ValidationError(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app) => app.into(),
            Err(err) => ApiError::Internal(format!("{err:#}")),
        }
    }
}

impl From<askama::Error> for ApiError {
    fn from(err: askama::Error) -> Self {
        ApiError::Internal(format!("template: {err}"))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_redirect_keeps_query() {
        let resp = ApiError::LoginRequired("/new/?a=1&b=2".into()).error_response();
        assert_eq!(resp.status(), StatusCode::FOUND);
        let location = resp.headers().get(header::LOCATION).unwrap().to_str().unwrap();
        assert_eq!(location, "/auth/login/?next=%2Fnew%2F%3Fa%3D1%26b%3D2");
    }

    #[test]
    fn domain_errors_map_to_status() {
        let not_found: ApiError = AppError::not_found("group", "rust").into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let wrapped: ApiError = anyhow::Error::new(AppError::not_found("post", "x")).into();
        assert_eq!(wrapped.status_code(), StatusCode::NOT_FOUND);

        let internal: ApiError = anyhow::anyhow!("disk full").into();
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
