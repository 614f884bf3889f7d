//! Search engine abstraction
//!
//! The engine owns retrieval and answer generation. The gateway only needs
//! the four query entry points:
//! - global: map-reduce over community reports
//! - local: entity-centred neighbourhood search
//! - drift: local search primed with community context
//! - basic: vector search over text units

mod remote;

pub use remote::RemoteEngine;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;
use crate::context::ContextValue;
use crate::dataset::{Datasets, ProjectSettings};

/// Inputs shared by every engine call
#[derive(Debug, Clone, Copy)]
pub struct EngineRequest<'a> {
    pub settings: &'a ProjectSettings,
    pub datasets: &'a Datasets,
    pub community_level: u32,
    pub response_type: &'a str,
    pub query: &'a str,
}

/// Generated answer plus its supporting context
#[derive(Debug, Clone, PartialEq)]
pub struct EngineAnswer {
    pub response: String,
    pub context: ContextValue,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine client error: {message}")]
    Client { message: String },

    #[error("engine request failed: {message}")]
    Request { message: String },

    #[error("engine returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed engine response: {message}")]
    InvalidResponse { message: String },
}

/// Trait for GraphRAG query engines
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Answer from community reports at the configured level
    async fn global_search(
        &self,
        request: &EngineRequest<'_>,
        dynamic_community_selection: bool,
    ) -> Result<EngineAnswer, EngineError>;

    async fn local_search(&self, request: &EngineRequest<'_>) -> Result<EngineAnswer, EngineError>;

    async fn drift_search(&self, request: &EngineRequest<'_>) -> Result<EngineAnswer, EngineError>;

    /// Plain retrieval over text units; ignores community level and response type
    async fn basic_search(&self, request: &EngineRequest<'_>) -> Result<EngineAnswer, EngineError>;

    /// Engine name for logs
    fn name(&self) -> &str;
}

/// Create the configured engine, if any.
///
/// Returns `None` when no endpoint is configured or the client cannot be
/// built; the gateway then answers every query through the CLI.
pub fn create_engine(config: &AppConfig) -> Option<Arc<dyn SearchEngine>> {
    let Some(endpoint) = config.engine.endpoint.as_deref() else {
        tracing::warn!("No search engine endpoint configured");
        return None;
    };

    match RemoteEngine::new(endpoint, config.engine.api_key.clone(), config.engine_timeout()) {
        Ok(engine) => {
            tracing::info!(endpoint = endpoint, "Search engine client initialized");
            Some(Arc::new(engine))
        }
        Err(e) => {
            tracing::warn!(endpoint = endpoint, error = %e, "Search engine unavailable");
            None
        }
    }
}
