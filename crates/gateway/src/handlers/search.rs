//! Search handlers

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::AppState;
use graphrag_common::{
    errors::{AppError, Result},
    SearchMethod, SearchResult,
};

/// `/search/{method}` parameters
#[derive(Debug, Deserialize, Validate)]
pub struct SearchParams {
    #[validate(required)]
    pub query: Option<String>,
}

/// `/query` parameters
#[derive(Debug, Deserialize, Validate)]
pub struct QueryParams {
    #[validate(required)]
    pub q: Option<String>,

    /// global, local, drift or basic
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String { "global".to_string() }

fn required<T: Validate>(params: &T, field: &str) -> Result<()> {
    params.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some(field.to_string()),
    })
}

async fn run(state: &AppState, method: SearchMethod, query: &str) -> Result<Json<SearchResult>> {
    let result = state.dispatcher.search(method, query).await?;
    Ok(Json(result))
}

/// Query string that failed to deserialize is reported as a JSON 400
type Params<T> = std::result::Result<Query<T>, QueryRejection>;

async fn search(state: AppState, method: SearchMethod, params: Params<SearchParams>) -> Result<Json<SearchResult>> {
    let Query(params) = params?;
    required(&params, "query")?;
    let query = params.query.unwrap_or_default();
    run(&state, method, &query).await
}

/// Global search over community reports
pub async fn global_search(
    State(state): State<AppState>,
    params: Params<SearchParams>,
) -> Result<Json<SearchResult>> {
    search(state, SearchMethod::Global, params).await
}

/// Local search around matching entities
pub async fn local_search(
    State(state): State<AppState>,
    params: Params<SearchParams>,
) -> Result<Json<SearchResult>> {
    search(state, SearchMethod::Local, params).await
}

/// DRIFT search; the CLI path answers with local search
pub async fn drift_search(
    State(state): State<AppState>,
    params: Params<SearchParams>,
) -> Result<Json<SearchResult>> {
    search(state, SearchMethod::Drift, params).await
}

/// Basic search; the CLI path answers with local search
pub async fn basic_search(
    State(state): State<AppState>,
    params: Params<SearchParams>,
) -> Result<Json<SearchResult>> {
    search(state, SearchMethod::Basic, params).await
}

/// Backward-compatible `/query?q=...&method=...`
pub async fn query(
    State(state): State<AppState>,
    params: Params<QueryParams>,
) -> Result<Json<SearchResult>> {
    let Query(params) = params?;
    required(&params, "q")?;
    let method: SearchMethod = params.method.parse()?;
    let query = params.q.unwrap_or_default();
    run(&state, method, &query).await
}
