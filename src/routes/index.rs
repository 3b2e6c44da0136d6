use axum::{
    Router,
    response::Html,
    routing::get,
};
use tracing::info;

use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
}

async fn index() -> Html<&'static str> {
    info!("GET / - Upload page");
    Html(INDEX_HTML)
}
