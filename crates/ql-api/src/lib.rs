//! # ql-api
//!
//! The web routing and orchestration layer for Quill.

pub mod cache;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod multipart;
pub mod session;

use actix_web::web;

pub use cache::PageCache;
pub use error::ApiError;
pub use handlers::AppState;

use handlers::{accounts, feed, follows, pages, posts};

/// Configures every route of the site.
///
/// # Developer Note
/// Fixed prefixes are registered before the `/{username}/...` patterns,
/// which would otherwise swallow them. Usernames equal to those prefixes
/// are refused at signup.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(feed::index))
        .route("/group/{slug}/", web::get().to(feed::group_posts))
        .service(
            web::resource("/new/")
                .route(web::get().to(posts::new_post_form))
                .route(web::post().to(posts::new_post)),
        )
        .route("/follow/", web::get().to(feed::follow_index))
        .route("/about/author/", web::get().to(pages::about_author))
        .route("/about/tech/", web::get().to(pages::about_tech))
        .service(
            web::resource("/auth/signup/")
                .route(web::get().to(accounts::signup_form))
                .route(web::post().to(accounts::signup)),
        )
        .service(
            web::resource("/auth/login/")
                .route(web::get().to(accounts::login_form))
                .route(web::post().to(accounts::login)),
        )
        .service(
            web::resource("/auth/logout/")
                .route(web::get().to(accounts::logout))
                .route(web::post().to(accounts::logout)),
        )
        // Per-author pages
        .route("/{username}/", web::get().to(feed::profile))
        .service(
            web::resource("/{username}/follow/")
                .route(web::get().to(follows::profile_follow))
                .route(web::post().to(follows::profile_follow)),
        )
        .service(
            web::resource("/{username}/unfollow/")
                .route(web::get().to(follows::profile_unfollow))
                .route(web::post().to(follows::profile_unfollow)),
        )
        .route("/{username}/{post_id}/", web::get().to(feed::post_view))
        .service(
            web::resource("/{username}/{post_id}/edit/")
                .route(web::get().to(posts::post_edit_form))
                .route(web::post().to(posts::post_edit)),
        )
        .route(
            "/{username}/{post_id}/comment/",
            web::post().to(posts::add_comment),
        );
}

/// For `App::default_service`: unknown paths get the 404 page.
pub fn not_found_service() -> actix_web::Route {
    web::to(pages::not_found)
}
