//! Preamble management. Every change swaps the delegate's preamble and
//! invalidates the render cache through the session.

use std::path::PathBuf;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use glimpse_renderer::SessionCommand;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PreambleStatus {
    pub custom: bool,
    pub path: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ImportPreamble {
    pub path: PathBuf,
}

fn status(state: &AppState) -> PreambleStatus {
    PreambleStatus {
        custom: state.preamble().is_custom(),
        path: state.preamble().path().display().to_string(),
        content: state.latex().preamble(),
    }
}

async fn apply(state: &AppState, content: String) -> Result<Json<PreambleStatus>, ApiError> {
    state.latex().set_preamble(content);
    state.send(SessionCommand::SettingsChanged).await?;
    Ok(Json(status(state)))
}

pub async fn show(State(state): State<AppState>) -> Json<PreambleStatus> {
    Json(status(&state))
}

pub async fn reload(State(state): State<AppState>) -> Result<Json<PreambleStatus>, ApiError> {
    let content = state.preamble().load();
    tracing::info!(custom = state.preamble().is_custom(), "preamble reloaded");
    apply(&state, content).await
}

pub async fn import(
    State(state): State<AppState>,
    payload: Result<Json<ImportPreamble>, JsonRejection>,
) -> Result<Json<PreambleStatus>, ApiError> {
    let Json(request) = payload?;
    let content = state.preamble().import(&request.path)?;
    apply(&state, content).await
}

pub async fn reset(State(state): State<AppState>) -> Result<Json<PreambleStatus>, ApiError> {
    let content = state.preamble().reset()?;
    apply(&state, content).await
}
