//! Signup, login and logout.

use actix_web::{web, HttpRequest, HttpResponse};
use askama::Template;
use chrono::Utc;
use ql_core::error::AppError;
use ql_core::forms::{
    safe_next, FormErrors, LoginForm, SignupForm, DUPLICATE_USERNAME, INVALID_LOGIN, NON_FIELD,
};
use ql_core::models::User;
use ql_ui::{LoggedOutTemplate, LoginTemplate, SignupTemplate};
use serde::Deserialize;
use uuid::Uuid;

use super::{render, AppState};
use crate::error::{ApiError, ApiResult};
use crate::session::{self, MaybeUser};

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

fn redirect_with_session(location: &str, cookie: actix_web::cookie::Cookie<'static>) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((actix_web::http::header::LOCATION, location))
        .cookie(cookie)
        .finish()
}

pub async fn signup_form(viewer: MaybeUser) -> ApiResult<HttpResponse> {
    render(&SignupTemplate {
        viewer: viewer.username(),
        form: &SignupForm::default(),
        errors: &FormErrors::default(),
    })
}

pub async fn signup(
    data: web::Data<AppState>,
    form: web::Form<SignupForm>,
) -> ApiResult<HttpResponse> {
    let form = form.into_inner();
    let mut errors = form.validate();
    if !errors.has("username") && data.repo.get_user_by_username(&form.username).await?.is_some() {
        errors.add("username", DUPLICATE_USERNAME);
    }
    if !errors.is_empty() {
        return render(&SignupTemplate {
            viewer: None,
            form: &form,
            errors: &errors,
        });
    }

    let user = User {
        id: Uuid::now_v7(),
        username: form.username.clone(),
        password_hash: data.auth.hash_password(&form.password1)?,
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        date_joined: Utc::now(),
    };
    let user_id = user.id;

    // Two signups may race past the lookup above.
    if let Err(err) = data.repo.create_user(user).await {
        if let Some(AppError::Conflict(_)) = err.downcast_ref::<AppError>() {
            errors.add("username", DUPLICATE_USERNAME);
            return render(&SignupTemplate {
                viewer: None,
                form: &form,
                errors: &errors,
            });
        }
        return Err(err.into());
    }
    log::info!("new account {}", form.username);

    let cookie = session::open(&data, user_id).await?;
    Ok(redirect_with_session("/", cookie))
}

pub async fn login_form(viewer: MaybeUser, query: web::Query<NextQuery>) -> ApiResult<HttpResponse> {
    let form = LoginForm {
        next: query.into_inner().next.unwrap_or_default(),
        ..Default::default()
    };
    render(&LoginTemplate {
        viewer: viewer.username(),
        form: &form,
        errors: &FormErrors::default(),
    })
}

pub async fn login(data: web::Data<AppState>, form: web::Form<LoginForm>) -> ApiResult<HttpResponse> {
    let mut form = form.into_inner();
    let mut errors = form.validate();

    if errors.is_empty() {
        match authenticate(&data, &form).await? {
            Some(user) => {
                let cookie = session::open(&data, user.id).await?;
                log::debug!("{} logged in", user.username);
                let location = safe_next(&form.next).unwrap_or("/");
                return Ok(redirect_with_session(location, cookie));
            }
            None => errors.add(NON_FIELD, INVALID_LOGIN),
        }
    }

    form.password.clear();
    render(&LoginTemplate {
        viewer: None,
        form: &form,
        errors: &errors,
    })
}

/// `None` for an unknown user or a wrong password.
async fn authenticate(data: &AppState, form: &LoginForm) -> ApiResult<Option<User>> {
    let Some(user) = data.repo.get_user_by_username(form.username.trim()).await? else {
        return Ok(None);
    };
    match data.auth.verify_password(&form.password, &user.password_hash).await {
        Ok(()) => Ok(Some(user)),
        Err(AppError::Unauthorized(_)) => Ok(None),
        Err(other) => Err(ApiError::from(other)),
    }
}

/// Accepts GET and POST, like the link in the nav bar.
pub async fn logout(data: web::Data<AppState>, req: HttpRequest) -> ApiResult<HttpResponse> {
    let removal = session::close(&data, &req).await?;
    let body = LoggedOutTemplate { viewer: None }.render()?;
    Ok(HttpResponse::Ok()
        .cookie(removal)
        .content_type("text/html; charset=utf-8")
        .body(body))
}
