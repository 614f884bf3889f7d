//! GraphRAG Gateway Common Library
//!
//! Shared code for the gateway:
//! - Configuration management
//! - Error types and handling
//! - Index artifact loading
//! - Context data normalization
//! - Search engine abstraction
//! - CLI fallback bridge
//! - Search dispatch
//! - Metrics and observability

pub mod cli;
pub mod config;
pub mod context;
pub mod dataset;
pub mod engine;
pub mod errors;
pub mod metrics;
pub mod search;

// Re-export commonly used types
pub use config::AppConfig;
pub use engine::SearchEngine;
pub use errors::{AppError, Result};
pub use search::{MethodUsed, SearchDispatcher, SearchMethod, SearchResult};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
