//! quill/crates/ql-api/src/middleware.rs Middleware
//!
//! Access logging, security headers and the HTML error pages.

use actix_web::body::MessageBody;
use actix_web::HttpMessage;
use actix_web::dev::ServiceResponse;
use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::middleware::{DefaultHeaders, ErrorHandlerResponse, ErrorHandlers, Logger};
use askama::Template;
use ql_ui::{NotFoundTemplate, ServerErrorTemplate};

use crate::session::SignedInAs;

/// The default access log:
/// remote-ip "request-line" status-code response-size "referrer" "user-agent"
pub fn standard_middleware() -> Logger {
    Logger::default()
}

pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .add((header::REFERRER_POLICY, "strict-origin-when-cross-origin"))
        .add((header::X_FRAME_OPTIONS, "DENY"))
}

/// Replaces empty 404 and 500 bodies with the site's error pages.
pub fn error_pages<B: MessageBody + 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new()
        .handler(StatusCode::NOT_FOUND, render_not_found)
        .handler(StatusCode::INTERNAL_SERVER_ERROR, render_server_error)
}

/// The viewer is only known when a handler extracted it before failing.
fn viewer_of<B>(res: &ServiceResponse<B>) -> Option<String> {
    res.request()
        .extensions()
        .get::<SignedInAs>()
        .map(|viewer| viewer.0.clone())
}

fn render_not_found<B: MessageBody + 'static>(
    res: ServiceResponse<B>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let path = res.request().path().to_string();
    let viewer = viewer_of(&res);
    let page = NotFoundTemplate {
        viewer: viewer.as_deref(),
        path: &path,
    }
    .render();
    replace_body(res, page)
}

fn render_server_error<B: MessageBody + 'static>(
    res: ServiceResponse<B>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let viewer = viewer_of(&res);
    let page = ServerErrorTemplate {
        viewer: viewer.as_deref(),
    }
    .render();
    replace_body(res, page)
}

fn replace_body<B: MessageBody + 'static>(
    res: ServiceResponse<B>,
    page: askama::Result<String>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let body = match page {
        Ok(body) => body,
        Err(err) => {
            log::error!("error page failed to render: {err}");
            return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
        }
    };

    let (req, res) = res.into_parts();
    let mut res = res.set_body(body);
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    let res = ServiceResponse::new(req, res)
        .map_into_boxed_body()
        .map_into_right_body();
    Ok(ErrorHandlerResponse::Response(res))
}
