//! Read-only views: the feeds and a single post.

use actix_web::{web, HttpResponse};
use askama::Template;
use ql_core::error::AppError;
use ql_core::models::PostFilter;
use ql_core::pagination::Paginator;
use ql_ui::{
    CommentView, FollowTemplate, GroupTemplate, IndexTemplate, PostTemplate, ProfileTemplate,
};

use super::{card, find_author, html, load_feed, load_page, render, AppState, PageQuery};
use crate::error::{ApiError, ApiResult};
use crate::session::{CurrentUser, MaybeUser};

/// Renders the home feed (e.g., /?page=2), served through the page cache.
///
/// The cache key is the resolved page number and the viewer, so stray query
/// strings all land on the same entry.
pub async fn index(
    data: web::Data<AppState>,
    viewer: MaybeUser,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let total = data.repo.count_posts(PostFilter::All).await?;
    let paginator = Paginator::new(data.feed.page_size, total);
    let number = paginator.resolve(query.requested());
    let key = format!(
        "{number}|{}",
        viewer.id().map(|id| id.to_string()).unwrap_or_default()
    );

    let body = data
        .cache
        .get_or_render(key, || async {
            let page = load_page(&data, PostFilter::All, paginator, number, viewer.id()).await?;
            let body = IndexTemplate {
                viewer: viewer.username(),
                page: &page,
            }
            .render()?;
            Ok::<_, ApiError>(body)
        })
        .await?;

    Ok(html(body))
}

/// Renders a group's feed (e.g., /group/rust/)
pub async fn group_posts(
    data: web::Data<AppState>,
    path: web::Path<String>,
    viewer: MaybeUser,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let slug = path.into_inner();
    let group = data
        .repo
        .get_group(&slug)
        .await?
        .ok_or_else(|| AppError::not_found("group", &slug))?;

    let page = load_feed(
        &data,
        PostFilter::Group(group.id),
        data.feed.page_size,
        query.requested(),
        viewer.id(),
    )
    .await?;

    render(&GroupTemplate {
        viewer: viewer.username(),
        group: &group,
        page: &page,
    })
}

/// Renders an author's profile with their posts (e.g., /leo/)
pub async fn profile(
    data: web::Data<AppState>,
    path: web::Path<String>,
    viewer: MaybeUser,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let author = find_author(&data, &path.into_inner()).await?;

    let page = load_feed(
        &data,
        PostFilter::Author(author.id),
        data.feed.page_size,
        query.requested(),
        viewer.id(),
    )
    .await?;
    let stats = data.repo.follow_stats(author.id).await?;

    let can_follow = viewer.id().is_some_and(|id| id != author.id);
    let following = match viewer.id() {
        Some(id) if can_follow => data.repo.is_following(id, author.id).await?,
        _ => false,
    };

    render(&ProfileTemplate {
        viewer: viewer.username(),
        author: &author,
        count: page.total,
        stats,
        can_follow,
        following,
        page: &page,
    })
}

/// Renders one post with its comments (e.g., /leo/<uuid>/)
pub async fn post_view(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    viewer: MaybeUser,
) -> ApiResult<HttpResponse> {
    let (username, raw_id) = path.into_inner();
    let author = find_author(&data, &username).await?;
    let post = super::find_post(&data, &author, &raw_id).await?;

    let entry = data
        .repo
        .get_entry(post.id)
        .await?
        .ok_or_else(|| AppError::not_found("post", post.id))?;
    let count = data.repo.count_posts(PostFilter::Author(author.id)).await?;
    let comments: Vec<CommentView> = data
        .repo
        .list_comments(post.id)
        .await?
        .iter()
        .map(CommentView::from)
        .collect();
    let card = card(&data, &entry, viewer.id()).await;

    render(&PostTemplate {
        viewer: viewer.username(),
        author: &author,
        count,
        card: &card,
        comments: &comments,
    })
}

/// Posts of every author the viewer follows.
pub async fn follow_index(
    data: web::Data<AppState>,
    user: CurrentUser,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let page = load_feed(
        &data,
        PostFilter::FollowedBy(user.0.id),
        data.feed.follow_page_size,
        query.requested(),
        Some(user.0.id),
    )
    .await?;

    render(&FollowTemplate {
        viewer: user.username(),
        page: &page,
    })
}
