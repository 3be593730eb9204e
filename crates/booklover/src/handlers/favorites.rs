use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use sea_orm::{ActiveModelTrait, ActiveValue, ColumnTrait, EntityTrait, QueryFilter};

use entity::{favorite, user};

use crate::catalog::{self, CatalogClient};
use crate::db::is_unique_violation;
use crate::error::AppError;
use crate::handlers::books::book_href;
use crate::handlers::current_user::{require_user, AuthResult, CurrentUser};
use crate::templates::{self, FavoriteItem, FavoritesPage};
use crate::{flash, AppState};

const STATUSES: [&str; 3] = ["want", "reading", "read"];

pub async fn add(
    state: &Arc<AppState>,
    user: &user::Model,
    jar: CookieJar,
    key: &str,
    title: &str,
    status: &str,
) -> Result<Response, AppError> {
    let back = book_href(key, title);

    let status = status.trim().to_lowercase();
    if !STATUSES.contains(&status.as_str()) {
        let jar = flash::push(jar, "danger", "Pick a reading status.");
        return Ok((jar, Redirect::to(&back)).into_response());
    }

    let existing = favorite::Entity::find()
        .filter(favorite::Column::UserId.eq(user.id))
        .filter(favorite::Column::BookKey.eq(key))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        let jar = flash::push(jar, "danger", "Already in your list.");
        return Ok((jar, Redirect::to(&back)).into_response());
    }

    let insert = favorite::ActiveModel {
        status: ActiveValue::Set(status),
        user_id: ActiveValue::Set(user.id),
        book_key: ActiveValue::Set(key.to_string()),
        ..Default::default()
    }
    .insert(&state.db)
    .await;

    let jar = match insert {
        Ok(_) => flash::push(jar, "success", "Successfully added."),
        // Lost the race against a concurrent insert for the same book.
        Err(e) if is_unique_violation(&e) => flash::push(jar, "danger", "Already in your list."),
        Err(e) => return Err(e.into()),
    };
    Ok((jar, Redirect::to(&back)).into_response())
}

pub async fn my_list(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let u = match require_user(user, &jar) {
        AuthResult::Authorized(u) => u,
        AuthResult::Unauthorized(resp) => return Ok(resp),
    };

    let rows = favorite::Entity::find()
        .filter(favorite::Column::UserId.eq(u.id))
        .all(&state.db)
        .await?;

    let mut books = Vec::with_capacity(rows.len());
    for row in rows {
        books.push(enrich(&state.catalog, row).await);
    }

    let (notice, jar) = flash::take(jar);
    let page = FavoritesPage {
        ctx: templates::page_ctx(Some(&u), notice),
        books,
    };
    Ok((jar, templates::render(&page)?).into_response())
}

/// Decorate a stored favorite with catalog data, keeping the entry usable
/// when the catalog cannot be reached.
async fn enrich(catalog_client: &CatalogClient, row: favorite::Model) -> FavoriteItem {
    match catalog_client.fetch_book(&row.book_key).await {
        Ok(book) => {
            let title = catalog::title_of(&book);
            let author = match catalog::first_author_key(&book) {
                Some(author_key) => match catalog_client.fetch_author(&author_key).await {
                    Ok(author) => catalog::name_of(&author),
                    Err(_) => catalog::UNKNOWN_AUTHOR.to_string(),
                },
                None => catalog::UNKNOWN_AUTHOR.to_string(),
            };
            FavoriteItem {
                href: book_href(&row.book_key, &title),
                title,
                author,
                status: row.status,
            }
        }
        Err(e) => {
            tracing::warn!(key = %row.book_key, error = %e, "favorite enrich failed");
            FavoriteItem {
                href: book_href(&row.book_key, "-"),
                title: row.book_key,
                author: catalog::UNKNOWN_AUTHOR.to_string(),
                status: row.status,
            }
        }
    }
}

pub async fn delete_my_list(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let u = match require_user(user, &jar) {
        AuthResult::Authorized(u) => u,
        AuthResult::Unauthorized(resp) => return Ok(resp),
    };

    favorite::Entity::delete_many()
        .filter(favorite::Column::UserId.eq(u.id))
        .exec(&state.db)
        .await?;

    let jar = flash::push(jar, "success", "Your list has been cleared.");
    Ok((jar, Redirect::to("/my/list")).into_response())
}
