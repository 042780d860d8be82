use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;

use crate::editor_link::{editor_line, notify_line};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LineClicked {
    /// 0-based source line of the clicked anchor.
    pub line: usize,
}

/// Forward a click in the preview to the editor. Delivery problems are
/// logged and otherwise ignored.
pub async fn line_clicked(
    State(state): State<AppState>,
    payload: Result<Json<LineClicked>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(clicked) = payload?;
    let addr = state.cfg().editor.listener_addr.clone();
    let line = editor_line(clicked.line);
    match notify_line(&addr, line).await {
        Ok(()) => tracing::debug!(%addr, line, "sent line to editor"),
        Err(error) => tracing::warn!(%addr, line, %error, "could not reach editor"),
    }
    Ok(StatusCode::NO_CONTENT)
}
