//! Writing: new posts, edits and comments.

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use ql_core::forms::{CleanPost, CommentForm, FormErrors, PostForm};
use ql_core::models::{Comment, Post, User};
use ql_ui::{GroupOption, NewPostTemplate};
use uuid::Uuid;

use super::{find_author, find_post, post_url, render, see_other, AppState};
use crate::error::ApiResult;
use crate::multipart::read_post_form;
use crate::session::CurrentUser;

const NEW_POST_URL: &str = "/new/";

struct FormPage<'a> {
    user: &'a User,
    form: &'a PostForm,
    errors: &'a FormErrors,
    action: &'a str,
    editing: bool,
    current_image: Option<String>,
}

async fn render_form(data: &AppState, page: FormPage<'_>) -> ApiResult<HttpResponse> {
    let groups = data.repo.list_groups().await?;
    let options = GroupOption::list(&groups, &page.form.group);
    render(&NewPostTemplate {
        viewer: Some(page.user.username.as_str()),
        form: page.form,
        errors: page.errors,
        groups: &options,
        action: page.action,
        editing: page.editing,
        current_image: page.current_image.as_deref(),
    })
}

/// Validates the form and, only if it is clean, stores the upload.
/// Returns the cleaned form and the new media id, or the errors to show.
async fn clean_and_store(
    data: &AppState,
    form: &mut PostForm,
) -> ApiResult<Result<(CleanPost, Option<String>), FormErrors>> {
    let groups = data.repo.list_groups().await?;
    let mut clean = match form.clean(&groups, data.store.as_ref()) {
        Ok(clean) => clean,
        Err(errors) => return Ok(Err(errors)),
    };
    let media_id = match clean.image.take() {
        Some(upload) => Some(data.store.save_upload(upload.data, &upload.filename).await?),
        None => None,
    };
    Ok(Ok((clean, media_id)))
}

/// GET /new/
pub async fn new_post_form(data: web::Data<AppState>, user: CurrentUser) -> ApiResult<HttpResponse> {
    render_form(
        &data,
        FormPage {
            user: &user.0,
            form: &PostForm::default(),
            errors: &FormErrors::default(),
            action: NEW_POST_URL,
            editing: false,
            current_image: None,
        },
    )
    .await
}

/// POST /new/
pub async fn new_post(
    data: web::Data<AppState>,
    user: CurrentUser,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut form = read_post_form(payload).await?;

    let (clean, image) = match clean_and_store(&data, &mut form).await? {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            return render_form(
                &data,
                FormPage {
                    user: &user.0,
                    form: &form,
                    errors: &errors,
                    action: NEW_POST_URL,
                    editing: false,
                    current_image: None,
                },
            )
            .await;
        }
    };

    let post = Post {
        id: Uuid::now_v7(),
        text: clean.text,
        pub_date: Utc::now(),
        author_id: user.0.id,
        group_id: clean.group_id,
        image,
    };
    log::info!("{} published {:?}", user.0.username, post.excerpt());
    data.repo.create_post(post).await?;

    Ok(see_other("/"))
}

/// GET /{username}/{post_id}/edit/
pub async fn post_edit_form(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    user: CurrentUser,
) -> ApiResult<HttpResponse> {
    let (username, raw_id) = path.into_inner();
    let author = find_author(&data, &username).await?;
    let post = find_post(&data, &author, &raw_id).await?;
    if user.0.id != author.id {
        return Ok(see_other(&post_url(&author.username, post.id)));
    }

    let form = PostForm {
        text: post.text.clone(),
        group: post.group_id.map(|id| id.to_string()).unwrap_or_default(),
        ..Default::default()
    };
    let current_image = match &post.image {
        Some(media_id) => Some(data.store.get_url(media_id).await),
        None => None,
    };
    render_form(
        &data,
        FormPage {
            user: &user.0,
            form: &form,
            errors: &FormErrors::default(),
            action: &format!("{}edit/", post_url(&author.username, post.id)),
            editing: true,
            current_image,
        },
    )
    .await
}

/// POST /{username}/{post_id}/edit/
///
/// Only the author may edit; anyone else is sent back to the post untouched.
pub async fn post_edit(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    user: CurrentUser,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let (username, raw_id) = path.into_inner();
    let author = find_author(&data, &username).await?;
    let mut post = find_post(&data, &author, &raw_id).await?;
    let post_page = post_url(&author.username, post.id);
    if user.0.id != author.id {
        log::warn!("{} tried to edit post {} of {}", user.0.username, post.id, author.username);
        return Ok(see_other(&post_page));
    }

    let mut form = read_post_form(payload).await?;
    let (clean, new_image) = match clean_and_store(&data, &mut form).await? {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            let current_image = match &post.image {
                Some(media_id) => Some(data.store.get_url(media_id).await),
                None => None,
            };
            return render_form(
                &data,
                FormPage {
                    user: &user.0,
                    form: &form,
                    errors: &errors,
                    action: &format!("{post_page}edit/"),
                    editing: true,
                    current_image,
                },
            )
            .await;
        }
    };

    post.text = clean.text;
    post.group_id = clean.group_id;
    if new_image.is_some() {
        post.image = new_image;
    } else if clean.clear_image {
        post.image = None;
    }
    data.repo.update_post(&post).await?;
    log::debug!("post {} updated", post.id);

    Ok(see_other(&post_page))
}

/// POST /{username}/{post_id}/comment/
///
/// Blank comments are dropped; the reader lands back on the post either way.
pub async fn add_comment(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    user: CurrentUser,
    form: web::Form<CommentForm>,
) -> ApiResult<HttpResponse> {
    let (username, raw_id) = path.into_inner();
    let author = find_author(&data, &username).await?;
    let post = find_post(&data, &author, &raw_id).await?;

    if let Ok(text) = form.clean() {
        data.repo
            .create_comment(Comment {
                id: Uuid::now_v7(),
                post_id: post.id,
                author_id: user.0.id,
                text,
                created: Utc::now(),
            })
            .await?;
    }

    Ok(see_other(&post_url(&author.username, post.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PageCache;
    use ql_config::FeedSettings;
    use ql_core::error::AppError;
    use ql_core::forms::{Upload, INVALID_IMAGE};
    use ql_core::traits::{MockAuthProvider, MockBlogRepo, MockMediaStore};

    fn state(store: MockMediaStore) -> AppState {
        let mut repo = MockBlogRepo::new();
        repo.expect_list_groups().returning(|| Ok(vec![]));
        AppState {
            repo: Box::new(repo),
            store: Box::new(store),
            auth: Box::new(MockAuthProvider::new()),
            cache: PageCache::disabled(),
            feed: FeedSettings::default(),
            session_ttl: chrono::Duration::hours(1),
        }
    }

    #[actix_web::test]
    async fn invalid_form_never_reaches_storage() {
        let mut store = MockMediaStore::new();
        store
            .expect_check_image()
            .returning(|_| Err(AppError::ValidationError("not an image".into())));
        store.expect_save_upload().times(0);
        let data = state(store);

        let mut form = PostForm {
            text: "hello".into(),
            image: Some(Upload {
                filename: "small.txt".into(),
                data: b"plain text".to_vec(),
            }),
            ..Default::default()
        };
        let errors = clean_and_store(&data, &mut form).await.unwrap().unwrap_err();
        assert_eq!(errors.get("image"), [INVALID_IMAGE.to_string()]);
    }

    #[actix_web::test]
    async fn clean_form_stores_upload_once() {
        let mut store = MockMediaStore::new();
        store.expect_check_image().returning(|_| Ok(()));
        store
            .expect_save_upload()
            .times(1)
            .returning(|_, _| Ok("abcd.png".to_string()));
        let data = state(store);

        let mut form = PostForm {
            text: "hello".into(),
            image: Some(Upload {
                filename: "a.png".into(),
                data: vec![1, 2, 3],
            }),
            ..Default::default()
        };
        let (clean, media_id) = clean_and_store(&data, &mut form).await.unwrap().unwrap();
        assert_eq!(clean.text, "hello");
        assert!(clean.image.is_none());
        assert_eq!(media_id.as_deref(), Some("abcd.png"));
    }
}
