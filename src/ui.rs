use axum::{
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};

use crate::state::AppState;

// Pages ship inside the binary so the server needs no separate static
// file host or front-end build step.
const INDEX_HTML: &str = include_str!("ui/index.html");
const SIGNUP_HTML: &str = include_str!("ui/signup.html");
const LOGIN_HTML: &str = include_str!("ui/login.html");
const HOME_HTML: &str = include_str!("ui/home.html");
const APP_CSS: &str = include_str!("ui/app.css");
const APP_JS: &str = include_str!("ui/app.js");

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Html(INDEX_HTML) }))
        .route("/signup", get(|| async { Html(SIGNUP_HTML) }))
        .route("/login", get(|| async { Html(LOGIN_HTML) }))
        .route("/home", get(|| async { Html(HOME_HTML) }))
        .route("/assets/app.css", get(app_css))
        .route("/assets/app.js", get(app_js))
}

async fn app_css() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], APP_CSS)
}

async fn app_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        APP_JS,
    )
}
