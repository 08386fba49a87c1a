//! Cookie sessions.
//!
//! The browser holds a random token in the `session_id` cookie; the database
//! holds only its digest. [`MaybeUser`] resolves the cookie for any page,
//! [`CurrentUser`] additionally sends guests to the login page.

use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use chrono::Utc;
use futures_util::future::LocalBoxFuture;
use ql_core::models::{Session, User};
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::AppState;

pub const SESSION_COOKIE: &str = "session_id";

/// The signed-in user, if any.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|u| u.id)
    }

    pub fn username(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.username.as_str())
    }
}

/// Username of the resolved viewer, left in the request extensions so the
/// error pages can show the signed-in nav bar.
#[derive(Debug, Clone)]
pub struct SignedInAs(pub String);

/// A signed-in user. Extraction fails with a redirect to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn username(&self) -> Option<&str> {
        Some(self.0.username.as_str())
    }
}

fn app_state(req: &HttpRequest) -> Result<web::Data<AppState>, ApiError> {
    req.app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| ApiError::Internal("application state is not registered".into()))
}

/// Looks up the user behind a cookie token. Expired sessions are removed
/// and treated as anonymous.
pub async fn resolve(state: &AppState, token: &str) -> Result<Option<User>, ApiError> {
    let digest = state.auth.digest_token(token);
    let Some(session) = state.repo.get_session(&digest).await? else {
        return Ok(None);
    };
    if session.is_expired(Utc::now()) {
        log::debug!("session for user {} expired", session.user_id);
        state.repo.delete_session(&digest).await?;
        return Ok(None);
    }
    Ok(state.repo.get_user(session.user_id).await?)
}

impl FromRequest for MaybeUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = app_state(req);
        let token = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());
        let req = req.clone();

        Box::pin(async move {
            let state = state?;
            let Some(token) = token else {
                return Ok(MaybeUser(None));
            };
            let user = resolve(&state, &token).await?;
            if let Some(user) = &user {
                req.extensions_mut().insert(SignedInAs(user.username.clone()));
            }
            Ok(MaybeUser(user))
        })
    }
}

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let next = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());
        let maybe = MaybeUser::from_request(req, payload);

        Box::pin(async move {
            match maybe.await? {
                MaybeUser(Some(user)) => Ok(CurrentUser(user)),
                MaybeUser(None) => Err(ApiError::LoginRequired(next)),
            }
        })
    }
}

/// Starts a session for `user_id` and returns the cookie to set.
pub async fn open(state: &AppState, user_id: Uuid) -> Result<Cookie<'static>, ApiError> {
    let token = state.auth.new_session_token()?;
    let session = Session {
        token_hash: state.auth.digest_token(&token),
        user_id,
        expires_at: Utc::now() + state.session_ttl,
    };
    state.repo.create_session(session).await?;

    let max_age = time::Duration::seconds(state.session_ttl.num_seconds());
    Ok(Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .finish())
}

/// Ends the session behind `req`'s cookie, if any, and returns a removal
/// cookie.
pub async fn close(state: &AppState, req: &HttpRequest) -> Result<Cookie<'static>, ApiError> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        state
            .repo
            .delete_session(&state.auth.digest_token(cookie.value()))
            .await?;
    }
    let mut removal = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    removal.make_removal();
    Ok(removal)
}
