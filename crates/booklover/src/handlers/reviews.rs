use std::sync::Arc;

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use sea_orm::{ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use entity::{review, user};

use crate::error::AppError;
use crate::handlers::books::{book_href, BookActionForm};
use crate::handlers::current_user::{require_user, AuthResult, CurrentUser};
use crate::templates::{self, EditReviewPage};
use crate::util::now_ts;
use crate::{flash, AppState};

pub const MAX_TEXT_LEN: usize = 240;

/// Check a submitted review body and rating, returning a user-facing message
/// on failure.
fn validated(text: &Option<String>, rating: Option<i32>) -> Result<(String, i32), &'static str> {
    let text = text.as_deref().unwrap_or("").trim().to_string();
    if text.is_empty() {
        return Err("Review text cannot be blank.");
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err("Review text must be at most 240 characters.");
    }
    match rating {
        Some(r) if (1..=5).contains(&r) => Ok((text, r)),
        _ => Err("A rating between 1 and 5 is required."),
    }
}

pub async fn add(
    state: &Arc<AppState>,
    user: &user::Model,
    jar: CookieJar,
    key: &str,
    title: &str,
    text: &Option<String>,
    rating: Option<i32>,
) -> Result<Response, AppError> {
    let back = book_href(key, title);

    let (text, rating) = match validated(text, rating) {
        Ok(ok) => ok,
        Err(message) => {
            let jar = flash::push(jar, "danger", message);
            return Ok((jar, Redirect::to(&back)).into_response());
        }
    };

    review::ActiveModel {
        text: ActiveValue::Set(text),
        user_rating: ActiveValue::Set(rating),
        user_id: ActiveValue::Set(user.id),
        book_key: ActiveValue::Set(key.to_string()),
        created_at: ActiveValue::Set(now_ts()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let jar = flash::push(jar, "success", "Review added successfully.");
    Ok((jar, Redirect::to(&back)).into_response())
}

/// The viewer's own review of a book, if any.
async fn find_owned(
    db: &DatabaseConnection,
    user_id: i32,
    key: &str,
) -> Result<Option<review::Model>, AppError> {
    Ok(review::Entity::find()
        .filter(review::Column::BookKey.eq(key))
        .filter(review::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

pub async fn edit_page(
    state: &Arc<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    key: &str,
    title: &str,
) -> Result<Response, AppError> {
    let u = match require_user(user, &jar) {
        AuthResult::Authorized(u) => u,
        AuthResult::Unauthorized(resp) => return Ok(resp),
    };

    let Some(existing) = find_owned(&state.db, u.id, key).await? else {
        let jar = flash::push(jar, "danger", "You have no review to edit.");
        return Ok((jar, Redirect::to(&book_href(key, title))).into_response());
    };

    let (notice, jar) = flash::take(jar);
    let page = EditReviewPage {
        ctx: templates::page_ctx(Some(&u), notice),
        action_href: format!("{}/edit", book_href(key, title)),
        text: existing.text,
        user_rating: existing.user_rating,
    };
    Ok((jar, templates::render(&page)?).into_response())
}

pub async fn edit_submit(
    state: &Arc<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    key: &str,
    title: &str,
    form: BookActionForm,
) -> Result<Response, AppError> {
    let u = match require_user(user, &jar) {
        AuthResult::Authorized(u) => u,
        AuthResult::Unauthorized(resp) => return Ok(resp),
    };

    let back = book_href(key, title);

    let Some(existing) = find_owned(&state.db, u.id, key).await? else {
        let jar = flash::push(jar, "danger", "You have no review to edit.");
        return Ok((jar, Redirect::to(&back)).into_response());
    };

    let (text, rating) = match validated(&form.text, form.user_rating) {
        Ok(ok) => ok,
        Err(message) => {
            let jar = flash::push(jar, "danger", message);
            return Ok((jar, Redirect::to(format!("{back}/edit").as_str())).into_response());
        }
    };

    let mut active: review::ActiveModel = existing.into();
    active.text = ActiveValue::Set(text);
    active.user_rating = ActiveValue::Set(rating);
    active.update(&state.db).await?;

    let jar = flash::push(jar, "success", "Review updated successfully.");
    Ok((jar, Redirect::to(&back)).into_response())
}

pub async fn delete_submit(
    state: &Arc<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    key: &str,
    title: &str,
) -> Result<Response, AppError> {
    let u = match require_user(user, &jar) {
        AuthResult::Authorized(u) => u,
        AuthResult::Unauthorized(resp) => return Ok(resp),
    };

    // Scoped to the acting user; deleting a review you never wrote is a no-op.
    review::Entity::delete_many()
        .filter(review::Column::BookKey.eq(key))
        .filter(review::Column::UserId.eq(u.id))
        .exec(&state.db)
        .await?;

    let jar = flash::push(jar, "success", "Review deleted.");
    Ok((jar, Redirect::to(&book_href(key, title))).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        let err = validated(&Some("   ".to_string()), Some(3)).unwrap_err();
        assert_eq!(err, "Review text cannot be blank.");
        assert!(validated(&None, Some(3)).is_err());
    }

    #[test]
    fn overlong_text_is_rejected() {
        let long = "x".repeat(MAX_TEXT_LEN + 1);
        assert!(validated(&Some(long), Some(3)).is_err());
        let exact = "x".repeat(MAX_TEXT_LEN);
        assert!(validated(&Some(exact), Some(3)).is_ok());
    }

    #[test]
    fn rating_must_be_one_through_five() {
        for bad in [None, Some(0), Some(6), Some(-1), Some(9)] {
            assert_eq!(
                validated(&Some("fine".to_string()), bad).unwrap_err(),
                "A rating between 1 and 5 is required."
            );
        }
        let (text, rating) = validated(&Some(" fine ".to_string()), Some(5)).unwrap();
        assert_eq!(text, "fine");
        assert_eq!(rating, 5);
    }
}
