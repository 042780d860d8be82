use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod editor;
pub mod preamble;
pub mod preview;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(preview::index))
        .route("/preview", get(preview::preview))
        .route("/update", post(preview::update))
        .route("/line-clicked", post(editor::line_clicked))
        .route("/preamble", get(preamble::show))
        .route("/preamble/reload", post(preamble::reload))
        .route("/preamble/import", post(preamble::import))
        .route("/preamble/reset", post(preamble::reset))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
