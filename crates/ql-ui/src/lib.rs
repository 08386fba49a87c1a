//! # ql-ui
//!
//! Askama templates for every page. Structs borrow what they render; the
//! handlers in ql-api build them and call `render()`.

use askama::Template;
use ql_core::forms::{FormErrors, LoginForm, PostForm, SignupForm};
use ql_core::models::{FollowStats, Group, User};
use ql_core::pagination::Page;

pub mod views;

pub use views::{CommentView, GroupOption, ImageUrls, PostCard};

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub viewer: Option<&'a str>,
    pub page: &'a Page<PostCard>,
}

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate<'a> {
    pub viewer: Option<&'a str>,
    pub group: &'a Group,
    pub page: &'a Page<PostCard>,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate<'a> {
    pub viewer: Option<&'a str>,
    pub author: &'a User,
    pub count: i64,
    pub stats: FollowStats,
    /// Signed in, not the author
    pub can_follow: bool,
    pub following: bool,
    pub page: &'a Page<PostCard>,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate<'a> {
    pub viewer: Option<&'a str>,
    pub author: &'a User,
    pub count: i64,
    pub card: &'a PostCard,
    pub comments: &'a [CommentView],
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate<'a> {
    pub viewer: Option<&'a str>,
    pub page: &'a Page<PostCard>,
}

/// Both the new-post and the edit-post page.
#[derive(Template)]
#[template(path = "new.html")]
pub struct NewPostTemplate<'a> {
    pub viewer: Option<&'a str>,
    pub form: &'a PostForm,
    pub errors: &'a FormErrors,
    pub groups: &'a [GroupOption],
    /// Where the form posts to
    pub action: &'a str,
    pub editing: bool,
    pub current_image: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate<'a> {
    pub viewer: Option<&'a str>,
    pub form: &'a SignupForm,
    pub errors: &'a FormErrors,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate<'a> {
    pub viewer: Option<&'a str>,
    pub form: &'a LoginForm,
    pub errors: &'a FormErrors,
}

#[derive(Template)]
#[template(path = "auth/logged_out.html")]
pub struct LoggedOutTemplate<'a> {
    pub viewer: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "about/author.html")]
pub struct AboutAuthorTemplate<'a> {
    pub viewer: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "about/tech.html")]
pub struct AboutTechTemplate<'a> {
    pub viewer: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "misc/404.html")]
pub struct NotFoundTemplate<'a> {
    pub viewer: Option<&'a str>,
    pub path: &'a str,
}

#[derive(Template)]
#[template(path = "misc/500.html")]
pub struct ServerErrorTemplate<'a> {
    pub viewer: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ql_core::forms::NON_FIELD;
    use ql_core::pagination::Paginator;
    use uuid::Uuid;

    fn card(text: &str) -> PostCard {
        PostCard {
            id: Uuid::now_v7(),
            text_html: text.to_string(),
            pub_date: "01 Jan 2021 00:00".into(),
            author_username: "leo".into(),
            author_name: "Leo".into(),
            group_slug: Some("rust".into()),
            group_title: Some("Rust".into()),
            image_url: None,
            thumb_url: None,
            comment_count: 0,
            is_author: false,
        }
    }

    #[test]
    fn index_renders_cards_and_pager() {
        let paginator = Paginator::new(1, 2);
        let page = paginator.page(1, vec![card("first post")]);
        let html = IndexTemplate {
            viewer: Some("leo"),
            page: &page,
        }
        .render()
        .unwrap();
        assert!(html.contains("first post"));
        assert!(html.contains("/group/rust/"));
        assert!(html.contains("?page=2"));
        assert!(html.contains("/auth/logout/"));
    }

    #[test]
    fn form_errors_are_shown() {
        let mut errors = FormErrors::default();
        errors.add("image", ql_core::forms::INVALID_IMAGE);
        let form = PostForm::default();
        let html = NewPostTemplate {
            viewer: Some("leo"),
            form: &form,
            errors: &errors,
            groups: &[],
            action: "/new/",
            editing: false,
            current_image: None,
        }
        .render()
        .unwrap();
        assert!(html.contains("Upload a valid image."));

        let mut errors = FormErrors::default();
        errors.add(NON_FIELD, "nope");
        let html = LoginTemplate {
            viewer: None,
            form: &LoginForm::default(),
            errors: &errors,
        }
        .render()
        .unwrap();
        assert!(html.contains("nope"));
    }

    #[test]
    fn not_found_echoes_path_escaped() {
        let html = NotFoundTemplate {
            viewer: None,
            path: "/<dex>/",
        }
        .render()
        .unwrap();
        assert!(html.contains("&lt;dex&gt;"));
    }
}
