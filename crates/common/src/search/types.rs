//! Search request and result types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

/// Retrieval strategy exposed by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    Global,
    Local,
    Drift,
    Basic,
}

impl SearchMethod {
    pub const ALL: [SearchMethod; 4] = [
        SearchMethod::Global,
        SearchMethod::Local,
        SearchMethod::Drift,
        SearchMethod::Basic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Global => "global",
            SearchMethod::Local => "local",
            SearchMethod::Drift => "drift",
            SearchMethod::Basic => "basic",
        }
    }

    /// `--method` value passed to the CLI. The tool only knows global and
    /// local, so drift and basic run as local.
    pub fn cli_method(&self) -> &'static str {
        match self {
            SearchMethod::Global => "global",
            SearchMethod::Local | SearchMethod::Drift | SearchMethod::Basic => "local",
        }
    }

    /// Tag reported when the CLI answered this method
    pub fn cli_tag(&self) -> MethodUsed {
        match self {
            SearchMethod::Global | SearchMethod::Local => MethodUsed::Cli,
            SearchMethod::Drift => MethodUsed::CliLocalFallback,
            SearchMethod::Basic => MethodUsed::CliBasicFallback,
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(SearchMethod::Global),
            "local" => Ok(SearchMethod::Local),
            "drift" => Ok(SearchMethod::Drift),
            "basic" => Ok(SearchMethod::Basic),
            other => Err(AppError::InvalidMethod {
                method: other.to_string(),
            }),
        }
    }
}

/// Which path produced a search answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodUsed {
    Api,
    Cli,
    CliLocalFallback,
    CliBasicFallback,
}

impl MethodUsed {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodUsed::Api => "api",
            MethodUsed::Cli => "cli",
            MethodUsed::CliLocalFallback => "cli_local_fallback",
            MethodUsed::CliBasicFallback => "cli_basic_fallback",
        }
    }
}

/// Search answer returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub response: String,
    pub context_data: Value,
    pub success: bool,
    pub method_used: MethodUsed,
}
