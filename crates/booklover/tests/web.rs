use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, EntityTrait};
use tower::ServiceExt;

use booklover::auth::{self, NewUser};
use booklover::catalog::CatalogClient;
use booklover::config::Config;
use booklover::{router, session, AppState};
use entity::{favorite, review, user};

const SECRET: &str = "test secret";

async fn test_state() -> Arc<AppState> {
    // A single connection keeps every query on the same in-memory database.
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    Arc::new(AppState {
        db,
        // Nothing listens here; catalog calls fail fast and pages degrade.
        catalog: CatalogClient::new("http://127.0.0.1:9"),
        config: Config {
            database_url: "sqlite::memory:".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            session_secret: SECRET.to_string(),
            catalog_base_url: "http://127.0.0.1:9".to_string(),
        },
    })
}

async fn signup_user(state: &Arc<AppState>, username: &str) -> user::Model {
    auth::signup(
        &state.db,
        NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "correct horse battery".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            image_url: None,
        },
    )
    .await
    .unwrap()
}

fn session_cookie(user_id: i32) -> String {
    let token = session::issue(SECRET.as_bytes(), user_id).unwrap();
    format!("{}={token}", session::SESSION_COOKIE)
}

fn form_request(path: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(path: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn app(state: &Arc<AppState>) -> Router {
    router(state.clone())
}

#[tokio::test]
async fn signup_creates_a_user_and_logs_them_in() {
    let state = test_state().await;

    let response = app(&state)
        .oneshot(form_request(
            "/signup",
            None,
            "username=alice&email=alice%40example.com&password=longenough&first_name=Alice&last_name=Ames",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("session="));

    let users = user::Entity::find().all(&state.db).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "alice");
    assert_eq!(users[0].email, "alice@example.com");
    assert_eq!(users[0].image_url, auth::DEFAULT_IMAGE_URL);
}

#[tokio::test]
async fn duplicate_signup_reshows_the_form() {
    let state = test_state().await;
    signup_user(&state, "alice").await;

    let response = app(&state)
        .oneshot(form_request(
            "/signup",
            None,
            "username=alice&email=other%40example.com&password=longenough&first_name=A&last_name=B",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Username or e-mail already taken."));

    let users = user::Entity::find().all(&state.db).await.unwrap();
    assert_eq!(users.len(), 1);
    // The original account still works.
    auth::authenticate(&state.db, "alice", "correct horse battery")
        .await
        .unwrap();
}

#[tokio::test]
async fn short_password_is_rejected_before_storage() {
    let state = test_state().await;

    let response = app(&state)
        .oneshot(form_request(
            "/signup",
            None,
            "username=bob&email=bob%40example.com&password=short&first_name=B&last_name=C",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Password must be at least 8 characters."));
    assert!(user::Entity::find().all(&state.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn login_round_trip() {
    let state = test_state().await;
    signup_user(&state, "alice").await;

    let ok = app(&state)
        .oneshot(form_request(
            "/login",
            None,
            "username=alice&password=correct+horse+battery",
        ))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::SEE_OTHER);
    assert_eq!(ok.headers().get(header::LOCATION).unwrap(), "/");
    let cookies: Vec<_> = ok
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("session=")));

    let bad = app(&state)
        .oneshot(form_request(
            "/login",
            None,
            "username=alice&password=wrong+password",
        ))
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::OK);
    assert!(body_text(bad).await.contains("Invalid username/password."));
}

#[tokio::test]
async fn login_with_unknown_username_reshows_the_form() {
    let state = test_state().await;

    let response = app(&state)
        .oneshot(form_request(
            "/login",
            None,
            "username=nobody&password=whatever+else",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Invalid username/password."));
}

#[tokio::test]
async fn logout_clears_the_session_and_redirects() {
    let state = test_state().await;
    let alice = signup_user(&state, "alice").await;

    let response = app(&state)
        .oneshot(get_request("/logout", Some(&session_cookie(alice.id))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
}

#[tokio::test]
async fn anonymous_mutations_are_turned_away() {
    let state = test_state().await;

    for (path, body) in [
        ("/works/OL1W/Dune", "status=want"),
        ("/works/OL1W/Dune", "text=Nice&user_rating=4"),
        ("/works/OL1W/Dune/delete", ""),
        ("/my/list/delete", ""),
    ] {
        let response = app(&state)
            .oneshot(form_request(path, None, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "path {path}");
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    }

    assert!(favorite::Entity::find().all(&state.db).await.unwrap().is_empty());
    assert!(review::Entity::find().all(&state.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn review_is_stored_for_the_posting_user() {
    let state = test_state().await;
    let alice = signup_user(&state, "alice").await;

    let response = app(&state)
        .oneshot(form_request(
            "/works/OL1W/Dune",
            Some(&session_cookie(alice.id)),
            "text=Great+read&user_rating=4",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/works/OL1W/Dune"
    );

    let rows = review::Entity::find().all(&state.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text, "Great read");
    assert_eq!(rows[0].user_rating, 4);
    assert_eq!(rows[0].user_id, alice.id);
    assert_eq!(rows[0].book_key, "works/OL1W");
}

#[tokio::test]
async fn out_of_range_rating_is_not_stored() {
    let state = test_state().await;
    let alice = signup_user(&state, "alice").await;

    let response = app(&state)
        .oneshot(form_request(
            "/works/OL1W/Dune",
            Some(&session_cookie(alice.id)),
            "text=Fine&user_rating=9",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(review::Entity::find().all(&state.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn second_favorite_for_the_same_book_is_refused() {
    let state = test_state().await;
    let alice = signup_user(&state, "alice").await;
    let cookie = session_cookie(alice.id);

    let first = app(&state)
        .oneshot(form_request(
            "/works/OL1W/Dune",
            Some(&cookie),
            "status=want",
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::SEE_OTHER);

    let second = app(&state)
        .oneshot(form_request(
            "/works/OL1W/Dune",
            Some(&cookie),
            "status=read",
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::SEE_OTHER);

    let rows = favorite::Entity::find().all(&state.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, "want");
}

#[tokio::test]
async fn unknown_status_is_refused() {
    let state = test_state().await;
    let alice = signup_user(&state, "alice").await;

    let response = app(&state)
        .oneshot(form_request(
            "/works/OL1W/Dune",
            Some(&session_cookie(alice.id)),
            "status=devoured",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(favorite::Entity::find().all(&state.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn review_edits_are_scoped_to_the_owner() {
    let state = test_state().await;
    let alice = signup_user(&state, "alice").await;
    let bob = signup_user(&state, "bob").await;

    app(&state)
        .oneshot(form_request(
            "/works/OL1W/Dune",
            Some(&session_cookie(alice.id)),
            "text=Original&user_rating=5",
        ))
        .await
        .unwrap();

    // Bob has no review of this book, so his edit goes nowhere.
    let response = app(&state)
        .oneshot(form_request(
            "/works/OL1W/Dune/edit",
            Some(&session_cookie(bob.id)),
            "text=Hijacked&user_rating=1",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let rows = review::Entity::find().all(&state.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text, "Original");
    assert_eq!(rows[0].user_rating, 5);
}

#[tokio::test]
async fn owner_can_edit_their_review() {
    let state = test_state().await;
    let alice = signup_user(&state, "alice").await;
    let cookie = session_cookie(alice.id);

    app(&state)
        .oneshot(form_request(
            "/works/OL1W/Dune",
            Some(&cookie),
            "text=Original&user_rating=3",
        ))
        .await
        .unwrap();

    let response = app(&state)
        .oneshot(form_request(
            "/works/OL1W/Dune/edit",
            Some(&cookie),
            "text=Updated&user_rating=5",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/works/OL1W/Dune"
    );

    let rows = review::Entity::find().all(&state.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text, "Updated");
    assert_eq!(rows[0].user_rating, 5);
}

#[tokio::test]
async fn review_delete_only_touches_the_callers_row() {
    let state = test_state().await;
    let alice = signup_user(&state, "alice").await;
    let bob = signup_user(&state, "bob").await;

    app(&state)
        .oneshot(form_request(
            "/works/OL1W/Dune",
            Some(&session_cookie(alice.id)),
            "text=Keep+me&user_rating=5",
        ))
        .await
        .unwrap();

    // Bob deleting a review he never wrote is a quiet no-op.
    let response = app(&state)
        .oneshot(form_request(
            "/works/OL1W/Dune/delete",
            Some(&session_cookie(bob.id)),
            "",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(review::Entity::find().all(&state.db).await.unwrap().len(), 1);

    let response = app(&state)
        .oneshot(form_request(
            "/works/OL1W/Dune/delete",
            Some(&session_cookie(alice.id)),
            "",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(review::Entity::find().all(&state.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn clearing_the_list_spares_other_users() {
    let state = test_state().await;
    let alice = signup_user(&state, "alice").await;
    let bob = signup_user(&state, "bob").await;

    for (user_id, key) in [(alice.id, "works/OL1W"), (bob.id, "works/OL2W")] {
        app(&state)
            .oneshot(form_request(
                &format!("/{key}/Some_Book"),
                Some(&session_cookie(user_id)),
                "status=want",
            ))
            .await
            .unwrap();
    }
    assert_eq!(favorite::Entity::find().all(&state.db).await.unwrap().len(), 2);

    let response = app(&state)
        .oneshot(form_request(
            "/my/list/delete",
            Some(&session_cookie(alice.id)),
            "",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/my/list"
    );

    let rows = favorite::Entity::find().all(&state.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, bob.id);
}

#[tokio::test]
async fn favorites_page_degrades_when_the_catalog_is_down() {
    let state = test_state().await;
    let alice = signup_user(&state, "alice").await;
    let cookie = session_cookie(alice.id);

    app(&state)
        .oneshot(form_request(
            "/works/OL1W/Dune",
            Some(&cookie),
            "status=reading",
        ))
        .await
        .unwrap();

    let response = app(&state)
        .oneshot(get_request("/my/list", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("OL1W"));
    assert!(body.contains("Unknown author"));
    assert!(body.contains("reading"));
}

#[tokio::test]
async fn my_list_requires_a_session() {
    let state = test_state().await;

    let response = app(&state)
        .oneshot(get_request("/my/list", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
}

#[tokio::test]
async fn tampered_session_cookie_means_anonymous() {
    let state = test_state().await;
    let alice = signup_user(&state, "alice").await;

    let tampered = format!("{}x", session_cookie(alice.id));
    let response = app(&state)
        .oneshot(get_request("/my/list", Some(&tampered)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
}

#[tokio::test]
async fn stale_session_for_a_deleted_user_is_anonymous() {
    let state = test_state().await;

    let response = app(&state)
        .oneshot(get_request("/", Some(&session_cookie(999))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Log in"));
}

#[tokio::test]
async fn home_degrades_to_an_empty_shelf() {
    let state = test_state().await;

    let response = app(&state).oneshot(get_request("/", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Trending books"));
    assert!(body.contains("No books to show right now."));
}

#[tokio::test]
async fn empty_search_returns_an_empty_page() {
    let state = test_state().await;

    let response = app(&state)
        .oneshot(form_request("/search", None, "q="))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Results for &quot;&quot;") || body.contains("Results for \"\""));
}

#[tokio::test]
async fn single_segment_paths_are_not_found() {
    let state = test_state().await;

    let response = app(&state)
        .oneshot(get_request("/no-such-page", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Page not found"));
}
