//! Configuration management for the GraphRAG gateway
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// GraphRAG project configuration
    #[serde(default)]
    pub project: ProjectConfig,

    /// External CLI fallback configuration
    #[serde(default)]
    pub cli: CliConfig,

    /// Search engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    /// GraphRAG project root (holds settings.yaml and the output directory)
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Index output directory, relative to the project root
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Community hierarchy level used for retrieval
    #[serde(default = "default_community_level")]
    pub community_level: u32,

    /// Whether claim extraction ran during indexing (enables covariates)
    #[serde(default)]
    pub claim_extraction_enabled: bool,

    /// Free-form response verbosity label passed to the engine
    #[serde(default = "default_response_type")]
    pub response_type: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    /// Command line used to invoke the GraphRAG tool (shell-style words)
    #[serde(default = "default_cli_command")]
    pub command: String,

    /// Per-invocation timeout in seconds
    #[serde(default = "default_cli_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Base URL of the GraphRAG engine server; unset disables the API phase
    pub endpoint: Option<String>,

    /// Bearer token sent to the engine server
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_engine_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Prometheus exporter port (0 to disable)
    #[serde(default)]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_root_dir() -> PathBuf { PathBuf::from(".") }
fn default_output_dir() -> PathBuf { PathBuf::from("output") }
fn default_community_level() -> u32 { 2 }
fn default_response_type() -> String { "Multiple Paragraphs".to_string() }
fn default_cli_command() -> String { "graphrag".to_string() }
fn default_cli_timeout() -> u64 { 300 }
fn default_engine_timeout() -> u64 { 120 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "graphrag-gateway".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            output_dir: default_output_dir(),
            community_level: default_community_level(),
            claim_extraction_enabled: false,
            response_type: default_response_type(),
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            command: default_cli_command(),
            timeout_secs: default_cli_timeout(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_engine_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: 0,
            service_name: default_service_name(),
        }
    }
}

impl ProjectConfig {
    /// Directory the index artifacts are read from
    pub fn output_path(&self) -> PathBuf {
        self.root_dir.join(&self.output_dir)
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // e.g., APP__PROJECT__COMMUNITY_LEVEL=3
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific configuration file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get CLI timeout as Duration
    pub fn cli_timeout(&self) -> Duration {
        Duration::from_secs(self.cli.timeout_secs)
    }

    /// Get engine request timeout as Duration
    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            project: ProjectConfig::default(),
            cli: CliConfig::default(),
            engine: EngineConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
