use std::sync::Arc;

use axum::extract::{Form, FromRequest, Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;
use serde_json::Value;

use entity::{review, user};

use crate::catalog::{self, CatalogError};
use crate::error::AppError;
use crate::handlers::current_user::{require_user, AuthResult, CurrentUser};
use crate::handlers::{favorites, reviews};
use crate::templates::{self, AuthorPage, BookCard, BookPage, HomePage, NotFoundPage, ReviewItem};
use crate::util::ts_to_date;
use crate::{flash, AppState};

const BOOK_LIST_LIMIT: usize = 18;
const AUTHOR_WORKS_LIMIT: usize = 10;

/// Form posted from the book page. Both the favorite form and the review form
/// target the same URL; whichever fields are present decide the action.
#[derive(Debug, Default, Deserialize)]
pub struct BookActionForm {
    pub status: Option<String>,
    pub text: Option<String>,
    pub user_rating: Option<i32>,
}

pub async fn home(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let works = match state.catalog.trending().await {
        Ok(works) => works,
        Err(e) => {
            // Degrade to an empty shelf instead of failing the page.
            tracing::warn!(error = %e, "trending fetch failed");
            Vec::new()
        }
    };

    let (notice, jar) = flash::take(jar);
    let page = HomePage {
        ctx: templates::page_ctx(user.0.as_ref(), notice),
        heading: "Trending books".to_string(),
        books: shape_cards(&works, BOOK_LIST_LIMIT),
    };
    Ok((jar, templates::render(&page)?).into_response())
}

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub q: String,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<SearchForm>,
) -> Result<Response, AppError> {
    let query = form.q.trim();

    let docs = if query.is_empty() {
        Vec::new()
    } else {
        match state.catalog.search(query).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(error = %e, "search fetch failed");
                Vec::new()
            }
        }
    };

    let (notice, jar) = flash::take(jar);
    let page = HomePage {
        ctx: templates::page_ctx(user.0.as_ref(), notice),
        heading: format!("Results for \"{query}\""),
        books: shape_cards(&docs, BOOK_LIST_LIMIT),
    };
    Ok((jar, templates::render(&page)?).into_response())
}

/// Fallback dispatcher for catalog-key routes.
///
/// Catalog keys span path segments ("works/OL45883W"), so these routes cannot
/// be expressed as typed router captures; known suffixes are stripped off the
/// raw path instead.
pub async fn catalog_dispatch(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    jar: CookieJar,
    req: Request,
) -> Result<Response, AppError> {
    let method = req.method().clone();
    let path = req.uri().path().trim_matches('/').to_string();

    if let Some(key) = path.strip_suffix("/author") {
        if key.is_empty() {
            return not_found_page(user, jar).await;
        }
        // GET and POST both just render the author page.
        return author_page(&state, user, jar, key).await;
    }

    if let Some(rest) = path.strip_suffix("/edit") {
        let Some((key, title)) = split_title(rest) else {
            return not_found_page(user, jar).await;
        };
        let (key, title) = (key.to_string(), title.to_string());
        return match method {
            Method::GET => reviews::edit_page(&state, user, jar, &key, &title).await,
            Method::POST => {
                let form = parse_action_form(req).await;
                reviews::edit_submit(&state, user, jar, &key, &title, form).await
            }
            _ => Ok(method_not_allowed()),
        };
    }

    if let Some(rest) = path.strip_suffix("/delete") {
        let Some((key, title)) = split_title(rest) else {
            return not_found_page(user, jar).await;
        };
        if method != Method::POST {
            return Ok(method_not_allowed());
        }
        return reviews::delete_submit(&state, user, jar, key, title).await;
    }

    if let Some((key, title)) = split_title(&path) {
        let (key, title) = (key.to_string(), title.to_string());
        return match method {
            Method::GET => book_page(&state, user, jar, &key, &title).await,
            Method::POST => {
                let form = parse_action_form(req).await;
                book_post(&state, user, jar, &key, &title, form).await
            }
            _ => Ok(method_not_allowed()),
        };
    }

    not_found_page(user, jar).await
}

async fn book_page(
    state: &Arc<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    key: &str,
    title: &str,
) -> Result<Response, AppError> {
    let book = match state.catalog.fetch_book(key).await {
        Ok(doc) => doc,
        Err(CatalogError::NotFound) => return not_found_page(user, jar).await,
        Err(e) => {
            // The book is the primary resource of this page.
            tracing::warn!(key, error = %e, "book fetch failed");
            return not_found_page(user, jar).await;
        }
    };

    // The author block is secondary; losing it must not lose the page.
    let (author_name, author_href) = match catalog::first_author_key(&book) {
        Some(author_key) => match state.catalog.fetch_author(&author_key).await {
            Ok(author) => (catalog::name_of(&author), format!("/{author_key}/author")),
            Err(e) => {
                tracing::warn!(key, error = %e, "author fetch failed");
                (String::new(), String::new())
            }
        },
        None => (String::new(), String::new()),
    };

    let rating_summary = match state.catalog.fetch_ratings(key).await {
        Ok(ratings) => format_rating(&ratings),
        Err(_) => String::new(),
    };

    let rows = review::Entity::find()
        .filter(review::Column::BookKey.eq(key))
        .order_by_desc(review::Column::CreatedAt)
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?;

    let viewer_id = user.0.as_ref().map(|u| u.id);
    let viewer_has_review = rows
        .iter()
        .any(|(r, _)| Some(r.user_id) == viewer_id);

    let review_items = rows
        .into_iter()
        .map(|(r, author)| ReviewItem {
            username: author.map(|u| u.username).unwrap_or_else(|| "someone".to_string()),
            rating: r.user_rating,
            text: r.text,
            date: ts_to_date(r.created_at),
        })
        .collect();

    let (notice, jar) = flash::take(jar);
    let page = BookPage {
        ctx: templates::page_ctx(user.0.as_ref(), notice),
        title: catalog::title_of(&book),
        description: catalog::text_field(&book, "description").unwrap_or_default(),
        cover_url: catalog::cover_url_of(&book),
        author_name,
        author_href,
        rating_summary,
        reviews: review_items,
        logged_in: viewer_id.is_some(),
        viewer_has_review,
        post_href: format!("/{key}/{title}"),
        edit_href: format!("/{key}/{title}/edit"),
        delete_href: format!("/{key}/{title}/delete"),
    };
    Ok((jar, templates::render(&page)?).into_response())
}

async fn book_post(
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

    if let Some(status) = form.status {
        return favorites::add(state, &u, jar, key, title, &status).await;
    }
    if form.text.is_some() || form.user_rating.is_some() {
        return reviews::add(state, &u, jar, key, title, &form.text, form.user_rating).await;
    }

    let jar = flash::push(jar, "danger", "Nothing to submit.");
    Ok((jar, axum::response::Redirect::to(&format!("/{key}/{title}"))).into_response())
}

async fn author_page(
    state: &Arc<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    key: &str,
) -> Result<Response, AppError> {
    let author = match state.catalog.fetch_author(key).await {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!(key, error = %e, "author page fetch failed");
            return not_found_page(user, jar).await;
        }
    };

    let works = match state.catalog.fetch_author_works(key).await {
        Ok(works) => works,
        Err(e) => {
            tracing::warn!(key, error = %e, "author works fetch failed");
            Vec::new()
        }
    };

    let (notice, jar) = flash::take(jar);
    let page = AuthorPage {
        ctx: templates::page_ctx(user.0.as_ref(), notice),
        name: catalog::name_of(&author),
        bio: catalog::text_field(&author, "bio").unwrap_or_default(),
        works: shape_cards(&works, AUTHOR_WORKS_LIMIT),
    };
    Ok((jar, templates::render(&page)?).into_response())
}

pub async fn not_found_page(user: CurrentUser, jar: CookieJar) -> Result<Response, AppError> {
    let (notice, jar) = flash::take(jar);
    let page = NotFoundPage {
        ctx: templates::page_ctx(user.0.as_ref(), notice),
    };
    Ok((StatusCode::NOT_FOUND, jar, templates::render(&page)?).into_response())
}

fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response()
}

async fn parse_action_form(req: Request) -> BookActionForm {
    match Form::<BookActionForm>::from_request(req, &()).await {
        Ok(Form(form)) => form,
        Err(_) => BookActionForm::default(),
    }
}

/// Split "works/OL1W/Some_Title" into the catalog key and the title slug.
fn split_title(path: &str) -> Option<(&str, &str)> {
    let (key, title) = path.rsplit_once('/')?;
    if key.is_empty() || title.is_empty() {
        return None;
    }
    Some((key, title))
}

/// Link target for a book: "/{key}/{title-as-slug}".
pub(crate) fn book_href(key: &str, title: &str) -> String {
    if key.is_empty() {
        return String::new();
    }

    let slug: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let slug = if slug.is_empty() { "-".to_string() } else { slug };

    format!("/{key}/{slug}")
}

fn shape_cards(docs: &[Value], limit: usize) -> Vec<BookCard> {
    docs.iter()
        .take(limit)
        .filter_map(|doc| {
            let key = catalog::key_of(doc)?;
            let title = catalog::title_of(doc);
            Some(BookCard {
                href: book_href(&key, &title),
                title,
                author: catalog::author_name_of(doc),
                cover_url: catalog::cover_url_of(doc),
            })
        })
        .collect()
}

fn format_rating(ratings: &Value) -> String {
    match catalog::average_rating_of(ratings) {
        Some(average) => format!(
            "{average:.1} / 5 ({} ratings)",
            catalog::ratings_count_of(ratings)
        ),
        None => String::new(),
    }
}
