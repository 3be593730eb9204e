use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use sea_orm::DatabaseConnection;

pub mod auth;
pub mod catalog;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod flash;
pub mod handlers;
pub mod session;
pub mod templates;
pub mod util;

use catalog::CatalogClient;
use config::Config;

pub struct AppState {
    pub db: DatabaseConnection,
    pub catalog: CatalogClient,
    pub config: Config,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::books::home))
        .route("/search", post(handlers::books::search))
        .route(
            "/signup",
            get(handlers::accounts::signup_page).post(handlers::accounts::signup_submit),
        )
        .route(
            "/login",
            get(handlers::accounts::login_page).post(handlers::accounts::login_submit),
        )
        .route("/logout", get(handlers::accounts::logout))
        .route("/my/list", get(handlers::favorites::my_list))
        .route("/my/list/delete", post(handlers::favorites::delete_my_list))
        // Catalog keys contain slashes, so book and author pages are resolved
        // off the raw path instead of router captures.
        .fallback(handlers::books::catalog_dispatch)
        .with_state(state)
}
