use actix_web::{HttpRequest, HttpResponse};
use ql_ui::{AboutAuthorTemplate, AboutTechTemplate};

use super::render;
use crate::error::{ApiError, ApiResult};
use crate::session::MaybeUser;

pub async fn about_author(viewer: MaybeUser) -> ApiResult<HttpResponse> {
    render(&AboutAuthorTemplate {
        viewer: viewer.username(),
    })
}

pub async fn about_tech(viewer: MaybeUser) -> ApiResult<HttpResponse> {
    render(&AboutTechTemplate {
        viewer: viewer.username(),
    })
}

/// Default service for paths no route claims. The viewer is resolved so the
/// error page keeps the signed-in nav bar.
pub async fn not_found(req: HttpRequest, _viewer: MaybeUser) -> ApiResult<HttpResponse> {
    Err(ApiError::not_found(req.path()))
}
