//! Embedded browser client

use axum::{response::Html, routing::get, Router};

const INDEX_HTML: &str = include_str!("../../web/index.html");

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Serve the single-page client at `/`
pub fn router() -> Router {
    Router::new().route("/", get(index))
}
