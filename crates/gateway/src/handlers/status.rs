//! Service status handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// Status report
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub graphrag_api_available: bool,
    pub data_loaded: bool,
    pub fallback_mode: String,
    pub project_directory: String,
    pub community_level: u32,
    pub response_type: String,
}

/// Report engine availability, data state and search settings
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let dispatcher = &state.dispatcher;
    let api_available = dispatcher.engine_available();

    let fallback_mode = if api_available {
        "API + CLI fallback"
    } else {
        "CLI available"
    };

    Json(StatusResponse {
        status: "Server is up and running".to_string(),
        graphrag_api_available: api_available,
        data_loaded: dispatcher.data_loaded(),
        fallback_mode: fallback_mode.to_string(),
        project_directory: dispatcher.project_directory().display().to_string(),
        community_level: dispatcher.community_level(),
        response_type: dispatcher.response_type().to_string(),
    })
}

/// Root endpoint; same body as `/status`
pub async fn root(state: State<AppState>) -> Json<StatusResponse> {
    status(state).await
}
