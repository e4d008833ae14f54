//! View API endpoints
//!
//! The HTTP face of the dispatcher:
//! - Create, attach, detach and destroy views by tag
//! - Inspect a view's lifecycle state
//! - Run commands against a view

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::dispatch::{Command, Reply, ViewInfo};
use crate::error::Result;
use crate::state::AppState;
use crate::view::Tag;

/// Create the views router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:tag", post(create_view).get(view_info).delete(destroy_view))
        .route("/:tag/attach", post(attach_view))
        .route("/:tag/detach", post(detach_view))
        .route("/:tag/commands", post(run_command))
}

/// Command result envelope
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub value: Reply,
}

async fn create_view(State(state): State<AppState>, Path(tag): Path<Tag>) -> Result<StatusCode> {
    state.dispatcher().create_view(tag).await?;
    Ok(StatusCode::CREATED)
}

async fn view_info(State(state): State<AppState>, Path(tag): Path<Tag>) -> Result<Json<ViewInfo>> {
    Ok(Json(state.dispatcher().view_info(tag).await?))
}

async fn attach_view(State(state): State<AppState>, Path(tag): Path<Tag>) -> Result<StatusCode> {
    state.dispatcher().attach_view(tag).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn detach_view(State(state): State<AppState>, Path(tag): Path<Tag>) -> Result<StatusCode> {
    state.dispatcher().detach_view(tag).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn destroy_view(State(state): State<AppState>, Path(tag): Path<Tag>) -> Result<StatusCode> {
    state.dispatcher().destroy_view(tag).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn run_command(
    State(state): State<AppState>,
    Path(tag): Path<Tag>,
    Json(command): Json<Command>,
) -> Result<Json<CommandResponse>> {
    let value = state.dispatcher().execute(tag, command).await?;
    Ok(Json(CommandResponse { value }))
}
