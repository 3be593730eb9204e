use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

/// Failures that escape a handler.
///
/// The recoverable cases (duplicate signup, bad credentials, unauthorized
/// mutation, missing edit target) never reach this type; handlers turn those
/// into a notice plus redirect. What is left is genuinely unexpected, so it
/// is logged and rendered as a plain 500 with no internals leaked.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),
    #[error("session error: {0}")]
    Session(#[from] crate::session::SessionError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h1>Something went wrong.</h1>".to_string()),
        )
            .into_response()
    }
}
