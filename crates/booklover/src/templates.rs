use askama::Template;
use axum::response::Html;

use entity::user;

use crate::error::AppError;
use crate::flash::Notice;

/// Fields shared by every page: the navigation identity and the one-shot
/// notice, both pre-flattened so templates never see `Option`s.
#[derive(Debug, Default)]
pub struct PageCtx {
    /// Empty when the request is anonymous.
    pub username: String,
    pub notice_level: String,
    pub notice_message: String,
}

pub fn page_ctx(user: Option<&user::Model>, notice: Option<Notice>) -> PageCtx {
    let (notice_level, notice_message) = notice
        .map(|n| (n.level, n.message))
        .unwrap_or_default();

    PageCtx {
        username: user.map(|u| u.username.clone()).unwrap_or_default(),
        notice_level,
        notice_message,
    }
}

pub fn render<T: Template>(page: &T) -> Result<Html<String>, AppError> {
    Ok(Html(page.render()?))
}

/// One tile in a book listing (home, search results, author works).
#[derive(Debug)]
pub struct BookCard {
    pub href: String,
    pub title: String,
    pub author: String,
    pub cover_url: String,
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage {
    pub ctx: PageCtx,
    pub heading: String,
    pub books: Vec<BookCard>,
}

#[derive(Debug, Default)]
pub struct SignupValues {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub image_url: String,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupPage {
    pub ctx: PageCtx,
    pub form: SignupValues,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub ctx: PageCtx,
    pub username: String,
}

#[derive(Debug)]
pub struct ReviewItem {
    pub username: String,
    pub rating: i32,
    pub text: String,
    pub date: String,
}

#[derive(Template)]
#[template(path = "book.html")]
pub struct BookPage {
    pub ctx: PageCtx,
    pub title: String,
    /// Empty when the catalog record has no usable description.
    pub description: String,
    pub cover_url: String,
    /// Empty when the author block could not be resolved.
    pub author_name: String,
    pub author_href: String,
    pub rating_summary: String,
    pub reviews: Vec<ReviewItem>,
    pub logged_in: bool,
    pub viewer_has_review: bool,
    pub post_href: String,
    pub edit_href: String,
    pub delete_href: String,
}

#[derive(Template)]
#[template(path = "author.html")]
pub struct AuthorPage {
    pub ctx: PageCtx,
    pub name: String,
    pub bio: String,
    pub works: Vec<BookCard>,
}

#[derive(Debug)]
pub struct FavoriteItem {
    pub href: String,
    pub title: String,
    pub author: String,
    pub status: String,
}

#[derive(Template)]
#[template(path = "favorites.html")]
pub struct FavoritesPage {
    pub ctx: PageCtx,
    pub books: Vec<FavoriteItem>,
}

#[derive(Template)]
#[template(path = "edit_review.html")]
pub struct EditReviewPage {
    pub ctx: PageCtx,
    pub action_href: String,
    pub text: String,
    pub user_rating: i32,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundPage {
    pub ctx: PageCtx,
}
