//! External CLI fallback
//!
//! Runs `graphrag query ...` as a child process and turns its text output
//! into a [`SearchResult`]. Used whenever the engine cannot answer.

use serde_json::json;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::search::{MethodUsed, SearchResult};

/// Marker the CLI prints before the answer
pub const SUCCESS_MARKER: &str = "SUCCESS:";

/// Header lines the CLI prints above the answer
pub const RESPONSE_HEADERS: [&str; 2] = ["Local Search Response:", "Global Search Response:"];

/// Prefix of the response text for a nonzero exit
pub const CLI_ERROR_PREFIX: &str = "CLI Error: ";

/// Prefix of the response text for a spawn failure or timeout
pub const CLI_EXCEPTION_PREFIX: &str = "CLI Exception: ";

/// Optional flags appended to the CLI invocation
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub community_level: Option<u32>,
    pub response_type: Option<String>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command `{program}` timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("failed to collect output of `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// How a CLI run ended
///
/// Every variant carries the uniform [`SearchResult`]; failures have
/// `success=false` and a `CLI Error:`/`CLI Exception:` response.
#[derive(Debug, Clone)]
pub enum CliOutcome {
    /// Exit status zero; the response is the cleaned stdout
    Completed(SearchResult),
    /// The process ran and exited with a failure status
    Exited(SearchResult),
    /// The process could not be spawned, waited on, or timed out
    Exception(SearchResult),
}

impl CliOutcome {
    pub fn result(&self) -> &SearchResult {
        match self {
            CliOutcome::Completed(result) | CliOutcome::Exited(result) | CliOutcome::Exception(result) => result,
        }
    }

    pub fn into_result(self) -> SearchResult {
        match self {
            CliOutcome::Completed(result) | CliOutcome::Exited(result) | CliOutcome::Exception(result) => result,
        }
    }
}

/// Invokes the GraphRAG command-line tool
#[derive(Debug, Clone)]
pub struct CliBridge {
    program: String,
    leading_args: Vec<String>,
    working_dir: PathBuf,
    timeout: Duration,
}

impl CliBridge {
    /// Create a bridge from a shell-style command line, e.g. `graphrag` or
    /// `uv run graphrag`
    pub fn new(command: &str, working_dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let mut words = shell_words::split(command)
            .map_err(|e| AppError::Configuration {
                message: format!("invalid CLI command {:?}: {}", command, e),
            })?
            .into_iter();

        let program = words.next().ok_or_else(|| AppError::Configuration {
            message: "CLI command is empty".to_string(),
        })?;

        Ok(Self {
            program,
            leading_args: words.collect(),
            working_dir: working_dir.into(),
            timeout,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            &config.cli.command,
            config.project.root_dir.clone(),
            config.cli_timeout(),
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments following the program name
    pub fn build_args(&self, query: &str, method: &str, options: &CliOptions) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.extend(
            ["query", "--root", ".", "--method", method, "--query", query]
                .iter()
                .map(|s| s.to_string()),
        );

        if let Some(level) = options.community_level {
            args.push("--community_level".to_string());
            args.push(level.to_string());
        }
        if let Some(response_type) = &options.response_type {
            args.push("--response_type".to_string());
            args.push(response_type.clone());
        }

        args
    }

    /// Run one search through the CLI.
    ///
    /// Never fails: process errors are reported as [`CliOutcome::Exited`]
    /// or [`CliOutcome::Exception`].
    pub async fn execute(&self, query: &str, method: &str, options: &CliOptions) -> CliOutcome {
        let start = Instant::now();
        let args = self.build_args(query, method, options);

        tracing::info!(
            program = %self.program,
            method = method,
            "Running CLI fallback"
        );

        let outcome = self.run(&args).await;
        let execution_time = start.elapsed().as_secs_f64();

        let outcome = match outcome {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                CliOutcome::Completed(SearchResult {
                    response: clean_output(&stdout),
                    context_data: json!({
                        "method": "cli_fallback",
                        "execution_time": execution_time,
                    }),
                    success: true,
                    method_used: MethodUsed::Cli,
                })
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
                tracing::warn!(
                    code = ?output.status.code(),
                    stderr = %stderr,
                    "CLI exited with failure"
                );
                CliOutcome::Exited(SearchResult {
                    response: format!("{}{}", CLI_ERROR_PREFIX, stderr),
                    context_data: json!({ "error": stderr }),
                    success: false,
                    method_used: MethodUsed::Cli,
                })
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(error = %message, "CLI invocation failed");
                CliOutcome::Exception(SearchResult {
                    response: format!("{}{}", CLI_EXCEPTION_PREFIX, message),
                    context_data: json!({ "error": message }),
                    success: false,
                    method_used: MethodUsed::Cli,
                })
            }
        };

        metrics::record_cli(execution_time, outcome.result().success);
        outcome
    }

    /// Spawn the child and wait for it. The child is killed if the wait is
    /// abandoned, including on timeout.
    async fn run(&self, args: &[String]) -> std::result::Result<Output, CliError> {
        let child = Command::new(&self.program)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CliError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|source| CliError::Wait {
                program: self.program.clone(),
                source,
            }),
            Err(_) => Err(CliError::Timeout {
                program: self.program.clone(),
                timeout: self.timeout,
            }),
        }
    }
}

/// Extract the answer from CLI stdout.
///
/// Everything up to the last `SUCCESS:` marker is dropped, then a leading
/// `Local/Global Search Response:` header line if present.
pub fn clean_output(stdout: &str) -> String {
    let text = stdout.trim();
    let Some((_, answer)) = text.rsplit_once(SUCCESS_MARKER) else {
        return text.to_string();
    };

    let answer = answer.trim();
    if RESPONSE_HEADERS.iter().any(|header| answer.starts_with(header)) {
        answer
            .split_once('\n')
            .map(|(_, rest)| rest.trim())
            .unwrap_or_default()
            .to_string()
    } else {
        answer.to_string()
    }
}
