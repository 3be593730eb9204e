use std::sync::Arc;

use axum::extract::{Form, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::auth::{self, AuthError, NewUser, SignupError};
use crate::error::AppError;
use crate::handlers::current_user::CurrentUser;
use crate::templates::{self, LoginPage, SignupPage, SignupValues};
use crate::{flash, session, AppState};

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn validate_signup(form: &SignupForm) -> Result<(), &'static str> {
    if form.username.trim().is_empty()
        || form.first_name.trim().is_empty()
        || form.last_name.trim().is_empty()
    {
        return Err("All fields except the image URL are required.");
    }
    if !form.email.contains('@') {
        return Err("A valid e-mail address is required.");
    }
    if form.password.chars().count() < 8 {
        return Err("Password must be at least 8 characters.");
    }
    Ok(())
}

fn signup_values(form: &SignupForm) -> SignupValues {
    SignupValues {
        username: form.username.clone(),
        email: form.email.clone(),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        image_url: form.image_url.clone(),
    }
}

pub async fn signup_page(user: CurrentUser, jar: CookieJar) -> Result<Response, AppError> {
    let (notice, jar) = flash::take(jar);
    let page = SignupPage {
        ctx: templates::page_ctx(user.0.as_ref(), notice),
        form: SignupValues::default(),
    };
    Ok((jar, templates::render(&page)?).into_response())
}

pub async fn signup_submit(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    if let Err(msg) = validate_signup(&form) {
        let page = SignupPage {
            ctx: templates::page_ctx(
                user.0.as_ref(),
                Some(flash::Notice {
                    level: "danger".to_string(),
                    message: msg.to_string(),
                }),
            ),
            form: signup_values(&form),
        };
        return Ok(templates::render(&page)?.into_response());
    }

    let new = NewUser {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_lowercase(),
        password: form.password.clone(),
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        image_url: Some(form.image_url.clone()),
    };

    let created = match auth::signup(&state.db, new).await {
        Ok(u) => u,
        Err(SignupError::DuplicateIdentity) => {
            let page = SignupPage {
                ctx: templates::page_ctx(
                    user.0.as_ref(),
                    Some(flash::Notice {
                        level: "danger".to_string(),
                        message: "Username or e-mail already taken.".to_string(),
                    }),
                ),
                form: signup_values(&form),
            };
            return Ok(templates::render(&page)?.into_response());
        }
        Err(SignupError::Db(e)) => return Err(e.into()),
    };

    tracing::info!(user_id = created.id, username = %created.username, "account created");

    let token = session::issue(state.config.session_secret.as_bytes(), created.id)?;
    let jar = jar.add(session::cookie(token));
    Ok((jar, Redirect::to("/")).into_response())
}

pub async fn login_page(user: CurrentUser, jar: CookieJar) -> Result<Response, AppError> {
    let (notice, jar) = flash::take(jar);
    let page = LoginPage {
        ctx: templates::page_ctx(user.0.as_ref(), notice),
        username: String::new(),
    };
    Ok((jar, templates::render(&page)?).into_response())
}

pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim();

    let authenticated = match auth::authenticate(&state.db, username, &form.password).await {
        Ok(u) => u,
        Err(AuthError::InvalidCredentials) => {
            // Same message whether the username or the password was wrong.
            let page = LoginPage {
                ctx: templates::page_ctx(
                    user.0.as_ref(),
                    Some(flash::Notice {
                        level: "danger".to_string(),
                        message: "Invalid username/password.".to_string(),
                    }),
                ),
                username: username.to_string(),
            };
            return Ok(templates::render(&page)?.into_response());
        }
        Err(AuthError::Db(e)) => return Err(e.into()),
    };

    tracing::info!(user_id = authenticated.id, "login");

    let token = session::issue(state.config.session_secret.as_bytes(), authenticated.id)?;
    let jar = jar.add(session::cookie(token));
    let jar = flash::push(jar, "success", &format!("Hello, {}!", authenticated.username));
    Ok((jar, Redirect::to("/")).into_response())
}

pub async fn logout(jar: CookieJar) -> Response {
    let jar = jar.remove(session::removal_cookie());
    let jar = flash::push(jar, "success", "You have been successfully logged out.");
    (jar, Redirect::to("/login")).into_response()
}
