use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use sea_orm::EntityTrait;

use entity::user;

use crate::{flash, session, AppState};

/// The session identity resolved for this request.
///
/// Resolution is tolerant by contract: a missing cookie, a bad signature, or
/// a stale user id all mean "anonymous"; it never fails the request. Handlers
/// receive the resolved user explicitly instead of reading ambient state.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<user::Model>);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let Some(cookie) = jar.get(session::SESSION_COOKIE) else {
            return Ok(Self(None));
        };
        let Some(user_id) =
            session::user_id_from_token(state.config.session_secret.as_bytes(), cookie.value())
        else {
            return Ok(Self(None));
        };

        let found = user::Entity::find_by_id(user_id)
            .one(&state.db)
            .await
            .ok()
            .flatten();

        Ok(Self(found))
    }
}

pub enum AuthResult {
    Authorized(user::Model),
    Unauthorized(Response),
}

/// Gate for every authenticated operation: anonymous callers get the
/// redirect-plus-notice response before any storage code runs.
pub fn require_user(user: CurrentUser, jar: &CookieJar) -> AuthResult {
    match user.0 {
        Some(u) => AuthResult::Authorized(u),
        None => {
            let jar = flash::push(jar.clone(), "danger", "Access unauthorized.");
            AuthResult::Unauthorized((jar, Redirect::to("/")).into_response())
        }
    }
}
