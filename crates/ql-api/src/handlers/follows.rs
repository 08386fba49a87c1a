use actix_web::{web, HttpResponse};

use super::{find_author, profile_url, see_other, AppState};
use crate::error::ApiResult;
use crate::session::CurrentUser;

/// /{username}/follow/: get-or-create. Following yourself does nothing.
pub async fn profile_follow(
    data: web::Data<AppState>,
    path: web::Path<String>,
    user: CurrentUser,
) -> ApiResult<HttpResponse> {
    let author = find_author(&data, &path.into_inner()).await?;
    if author.id != user.0.id && data.repo.follow(user.0.id, author.id).await? {
        log::debug!("{} now follows {}", user.0.username, author.username);
    }
    Ok(see_other(&profile_url(&author.username)))
}

/// /{username}/unfollow/: removing a missing edge does nothing.
pub async fn profile_unfollow(
    data: web::Data<AppState>,
    path: web::Path<String>,
    user: CurrentUser,
) -> ApiResult<HttpResponse> {
    let author = find_author(&data, &path.into_inner()).await?;
    if data.repo.unfollow(user.0.id, author.id).await? {
        log::debug!("{} unfollowed {}", user.0.username, author.username);
    }
    Ok(see_other(&profile_url(&author.username)))
}
