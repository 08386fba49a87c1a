//! # ql-api Handlers
//!
//! This module coordinates the flow between HTTP requests and Core traits.
//! Handlers are grouped by the part of the site they serve.

use actix_web::http::header;
use actix_web::HttpResponse;
use askama::Template;
use ql_config::FeedSettings;
use ql_core::error::AppError;
use ql_core::models::{FeedEntry, Post, PostFilter, User};
use ql_core::pagination::{Page, Paginator};
use ql_core::traits::{AuthProvider, BlogRepo, MediaStore};
use ql_ui::PostCard;
use serde::Deserialize;
use uuid::Uuid;

use crate::cache::PageCache;
use crate::error::{ApiError, ApiResult};

pub mod accounts;
pub mod feed;
pub mod follows;
pub mod pages;
pub mod posts;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub repo: Box<dyn BlogRepo>,
    pub store: Box<dyn MediaStore>,
    pub auth: Box<dyn AuthProvider>,
    /// Rendered index pages
    pub cache: PageCache,
    pub feed: FeedSettings,
    pub session_ttl: chrono::Duration,
}

/// `?page=` is kept raw so garbage falls back to page 1 instead of a 400.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn requested(&self) -> Option<&str> {
        self.page.as_deref()
    }
}

pub(crate) fn render<T: Template>(template: &T) -> ApiResult<HttpResponse> {
    Ok(html(template.render()?))
}

pub(crate) fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

/// 303 after a successful form submission.
pub(crate) fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

pub(crate) fn profile_url(username: &str) -> String {
    format!("/{username}/")
}

pub(crate) fn post_url(username: &str, post_id: Uuid) -> String {
    format!("/{username}/{post_id}/")
}

/// Loads one page of a feed and turns it into cards.
pub(crate) async fn load_feed(
    state: &AppState,
    filter: PostFilter,
    per_page: u32,
    requested: Option<&str>,
    viewer: Option<Uuid>,
) -> ApiResult<Page<PostCard>> {
    let total = state.repo.count_posts(filter).await?;
    let paginator = Paginator::new(per_page, total);
    let number = paginator.resolve(requested);
    load_page(state, filter, paginator, number, viewer).await
}

/// Loads an already resolved page of a feed.
pub(crate) async fn load_page(
    state: &AppState,
    filter: PostFilter,
    paginator: Paginator,
    number: u32,
    viewer: Option<Uuid>,
) -> ApiResult<Page<PostCard>> {
    let (limit, offset) = paginator.window(number);

    let entries = state.repo.list_posts(filter, limit, offset).await?;
    let mut cards = Vec::with_capacity(entries.len());
    for entry in &entries {
        cards.push(card(state, entry, viewer).await);
    }
    Ok(paginator.page(number, cards))
}

pub(crate) async fn card(state: &AppState, entry: &FeedEntry, viewer: Option<Uuid>) -> PostCard {
    let image = match &entry.post.image {
        Some(media_id) => Some((
            state.store.get_url(media_id).await,
            state.store.get_thumbnail_url(media_id).await,
        )),
        None => None,
    };
    PostCard::new(entry, viewer, image)
}

pub(crate) async fn find_author(state: &AppState, username: &str) -> ApiResult<User> {
    state
        .repo
        .get_user_by_username(username)
        .await?
        .ok_or_else(|| AppError::not_found("user", username).into())
}

/// The post `raw_id` written by `author`. A malformed id, a missing post or
/// one by someone else are all 404.
pub(crate) async fn find_post(state: &AppState, author: &User, raw_id: &str) -> ApiResult<Post> {
    let id = Uuid::parse_str(raw_id).map_err(|_| ApiError::not_found(format!("post {raw_id}")))?;
    match state.repo.get_post(id).await? {
        Some(post) if post.author_id == author.id => Ok(post),
        _ => Err(AppError::not_found("post", id).into()),
    }
}
