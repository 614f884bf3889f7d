//! Two-phase search dispatch: engine first, CLI fallback second

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::cli::{CliBridge, CliOptions, CliOutcome};
use crate::config::{AppConfig, ProjectConfig};
use crate::context;
use crate::dataset::{DatasetLoader, LoadedProject};
use crate::engine::{create_engine, EngineAnswer, EngineError, EngineRequest, SearchEngine};
use crate::errors::{AppError, Result};
use crate::metrics;

use super::{MethodUsed, SearchMethod, SearchResult};

/// Process-wide search state, built once at startup and read-only afterwards
pub struct SearchDispatcher {
    engine: Option<Arc<dyn SearchEngine>>,
    project: Option<LoadedProject>,
    cli: CliBridge,
    project_directory: PathBuf,
    community_level: u32,
    response_type: String,
}

impl SearchDispatcher {
    pub fn new(
        project_config: &ProjectConfig,
        engine: Option<Arc<dyn SearchEngine>>,
        project: Option<LoadedProject>,
        cli: CliBridge,
    ) -> Self {
        Self {
            engine,
            project,
            cli,
            project_directory: project_config.root_dir.clone(),
            community_level: project_config.community_level,
            response_type: project_config.response_type.clone(),
        }
    }

    /// Resolve the engine and load index artifacts.
    ///
    /// Artifacts are only loaded when an engine is available. A failed load
    /// is logged and leaves the gateway in CLI-only mode.
    pub async fn initialize(config: &AppConfig) -> Result<Self> {
        let cli = CliBridge::from_config(config)?;
        let engine = create_engine(config);

        let project = match &engine {
            Some(engine) => {
                tracing::info!(engine = engine.name(), "Loading GraphRAG project data");
                match DatasetLoader::new(&config.project).load().await {
                    Ok(project) => Some(project),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to load project data, engine search disabled");
                        None
                    }
                }
            }
            None => {
                tracing::info!("Search engine unavailable, serving through CLI fallback only");
                None
            }
        };

        Ok(Self::new(&config.project, engine, project, cli))
    }

    pub fn engine_available(&self) -> bool {
        self.engine.is_some()
    }

    pub fn data_loaded(&self) -> bool {
        self.project.is_some()
    }

    pub fn project_directory(&self) -> &Path {
        &self.project_directory
    }

    pub fn community_level(&self) -> u32 {
        self.community_level
    }

    pub fn response_type(&self) -> &str {
        &self.response_type
    }

    /// Answer a query, preferring the engine and falling back to the CLI.
    ///
    /// Engine errors are logged and never returned. Only a failed CLI run
    /// produces an error. Failed searches are still timed and counted.
    pub async fn search(&self, method: SearchMethod, query: &str) -> Result<SearchResult> {
        let start = Instant::now();
        tracing::info!(method = %method, query = %query, "Search requested");

        let result = match self.try_engine(method, query).await {
            Some(Ok(answer)) => {
                tracing::info!(method = %method, "Engine search succeeded");
                Ok(SearchResult {
                    response: answer.response,
                    context_data: context::normalize(answer.context),
                    success: true,
                    method_used: MethodUsed::Api,
                })
            }
            Some(Err(e)) => {
                tracing::warn!(method = %method, error = %e, "Engine search failed, using CLI fallback");
                metrics::record_engine_failure(method.as_str());
                self.search_cli(method, query).await
            }
            None => self.search_cli(method, query).await,
        };

        metrics::record_search(
            start.elapsed().as_secs_f64(),
            method.as_str(),
            search_outcome(&result),
        );

        result
    }

    /// Engine phase; `None` when the engine or its data is unavailable
    async fn try_engine(
        &self,
        method: SearchMethod,
        query: &str,
    ) -> Option<std::result::Result<EngineAnswer, EngineError>> {
        let (engine, project) = match (&self.engine, &self.project) {
            (Some(engine), Some(project)) => (engine, project),
            _ => return None,
        };

        let request = EngineRequest {
            settings: &project.settings,
            datasets: &project.datasets,
            community_level: self.community_level,
            response_type: &self.response_type,
            query,
        };

        let answer = match method {
            SearchMethod::Global => engine.global_search(&request, false).await,
            SearchMethod::Local => engine.local_search(&request).await,
            SearchMethod::Drift => engine.drift_search(&request).await,
            SearchMethod::Basic => engine.basic_search(&request).await,
        };

        Some(answer)
    }

    async fn search_cli(&self, method: SearchMethod, query: &str) -> Result<SearchResult> {
        let options = CliOptions {
            community_level: Some(self.community_level),
            response_type: Some(self.response_type.clone()),
        };

        match self.cli.execute(query, method.cli_method(), &options).await {
            CliOutcome::Completed(mut result) => {
                result.method_used = method.cli_tag();
                Ok(result)
            }
            CliOutcome::Exited(result) => Err(AppError::CliProcess { detail: result.response }),
            CliOutcome::Exception(result) => Err(AppError::CliTimeoutOrSpawn { detail: result.response }),
        }
    }
}

/// `method_used` label recorded for a finished search
fn search_outcome(result: &Result<SearchResult>) -> &'static str {
    match result {
        Ok(result) => result.method_used.as_str(),
        Err(_) => metrics::SEARCH_FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextValue;
    use crate::dataset::{Datasets, ProjectSettings, Table};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::time::Duration;

    /// Engine answering every method with its name and a table of entities
    struct TableEngine;

    impl TableEngine {
        fn answer(method: &str, request: &EngineRequest<'_>) -> EngineAnswer {
            EngineAnswer {
                response: format!("{} answer to {}", method, request.query),
                context: ContextValue::map([
                    ("entities", ContextValue::Table(request.datasets.entities.clone())),
                    ("level", ContextValue::Scalar(json!(request.community_level))),
                ]),
            }
        }
    }

    #[async_trait]
    impl SearchEngine for TableEngine {
        async fn global_search(
            &self,
            request: &EngineRequest<'_>,
            dynamic_community_selection: bool,
        ) -> std::result::Result<EngineAnswer, EngineError> {
            assert!(!dynamic_community_selection);
            Ok(Self::answer("global", request))
        }

        async fn local_search(&self, request: &EngineRequest<'_>) -> std::result::Result<EngineAnswer, EngineError> {
            Ok(Self::answer("local", request))
        }

        async fn drift_search(&self, request: &EngineRequest<'_>) -> std::result::Result<EngineAnswer, EngineError> {
            Ok(Self::answer("drift", request))
        }

        async fn basic_search(&self, request: &EngineRequest<'_>) -> std::result::Result<EngineAnswer, EngineError> {
            Ok(Self::answer("basic", request))
        }

        fn name(&self) -> &str {
            "table"
        }
    }

    /// Engine that fails every call
    struct BrokenEngine;

    #[async_trait]
    impl SearchEngine for BrokenEngine {
        async fn global_search(&self, _: &EngineRequest<'_>, _: bool) -> std::result::Result<EngineAnswer, EngineError> {
            Err(EngineError::Request { message: "connection refused".into() })
        }

        async fn local_search(&self, _: &EngineRequest<'_>) -> std::result::Result<EngineAnswer, EngineError> {
            Err(EngineError::Status { status: 503, body: "overloaded".into() })
        }

        async fn drift_search(&self, _: &EngineRequest<'_>) -> std::result::Result<EngineAnswer, EngineError> {
            Err(EngineError::InvalidResponse { message: "missing response".into() })
        }

        async fn basic_search(&self, _: &EngineRequest<'_>) -> std::result::Result<EngineAnswer, EngineError> {
            Err(EngineError::Request { message: "timeout".into() })
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn loaded_project() -> LoadedProject {
        LoadedProject {
            settings: ProjectSettings::new(".", Value::Null),
            datasets: Datasets {
                entities: Table::from_rows("entities", &["id", "title"], vec![vec![json!("e0"), json!("ALICE")]]),
                ..Datasets::default()
            },
        }
    }

    fn cli(script: &str) -> CliBridge {
        let command = format!("sh -c {} graphrag", shell_words::quote(script));
        CliBridge::new(&command, ".", Duration::from_secs(10)).unwrap()
    }

    fn dispatcher(
        engine: Option<Arc<dyn SearchEngine>>,
        project: Option<LoadedProject>,
        cli: CliBridge,
    ) -> SearchDispatcher {
        SearchDispatcher::new(&ProjectConfig::default(), engine, project, cli)
    }

    fn entities_flattened(context: &Value) -> bool {
        context["entities"] == json!([{"id": "e0", "title": "ALICE"}])
    }

    #[tokio::test]
    async fn test_engine_success_short_circuits_cli() {
        // A CLI that would fail proves the fallback is never reached
        let dispatcher = dispatcher(
            Some(Arc::new(TableEngine)),
            Some(loaded_project()),
            cli("printf unreachable >&2; exit 1"),
        );

        for method in SearchMethod::ALL {
            let result = dispatcher.search(method, "who is alice?").await.unwrap();
            assert_eq!(result.method_used, MethodUsed::Api);
            assert!(result.success);
            assert_eq!(result.response, format!("{} answer to who is alice?", method));
            assert!(entities_flattened(&result.context_data));
            assert_eq!(result.context_data["level"], json!(2));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_engine_failure_falls_back_to_cli() {
        let dispatcher = dispatcher(
            Some(Arc::new(BrokenEngine)),
            Some(loaded_project()),
            cli("printf 'SUCCESS:\\nLocal Search Response:\\nfrom cli'"),
        );

        let expected = [
            (SearchMethod::Global, MethodUsed::Cli),
            (SearchMethod::Local, MethodUsed::Cli),
            (SearchMethod::Drift, MethodUsed::CliLocalFallback),
            (SearchMethod::Basic, MethodUsed::CliBasicFallback),
        ];
        for (method, tag) in expected {
            let result = dispatcher.search(method, "q").await.unwrap();
            assert_eq!(result.method_used, tag);
            assert_eq!(result.response, "from cli");
            assert_eq!(result.context_data["method"], json!("cli_fallback"));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_engine_skipped_without_data() {
        // Engine is present but the dataset load failed
        let dispatcher = dispatcher(
            Some(Arc::new(TableEngine)),
            None,
            cli("printf 'SUCCESS:\\n%s' \"$5\""),
        );

        let result = dispatcher.search(SearchMethod::Drift, "q").await.unwrap();
        assert_eq!(result.method_used, MethodUsed::CliLocalFallback);
        // drift runs the CLI in local mode
        assert_eq!(result.response, "local");
        assert!(!dispatcher.data_loaded());
        assert!(dispatcher.engine_available());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_passes_process_settings() {
        let dispatcher = dispatcher(None, None, cli("printf 'SUCCESS:%s|%s' \"$9\" \"${11}\""));
        let result = dispatcher.search(SearchMethod::Global, "q").await.unwrap();
        assert_eq!(result.response, "2|Multiple Paragraphs");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_failure_is_surfaced() {
        let dispatcher = dispatcher(None, None, cli("printf boom >&2; exit 1"));
        let err = dispatcher.search(SearchMethod::Local, "q").await.unwrap_err();

        assert!(matches!(err, AppError::CliProcess { .. }));
        assert_eq!(err.to_string(), "CLI Error: boom");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_exit_with_exception_text_is_process_failure() {
        let dispatcher = dispatcher(None, None, cli("printf 'CLI Exception: fake' >&2; exit 1"));
        let err = dispatcher.search(SearchMethod::Global, "q").await.unwrap_err();

        assert!(matches!(err, AppError::CliProcess { .. }));
        assert_eq!(err.to_string(), "CLI Error: CLI Exception: fake");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_search_outcome_labels() {
        let failing = dispatcher(None, None, cli("exit 3"));
        let result = failing.search(SearchMethod::Local, "q").await;
        assert!(result.is_err());
        assert_eq!(search_outcome(&result), "error");

        let working = dispatcher(None, None, cli("printf 'SUCCESS: ok'"));
        let result = working.search(SearchMethod::Basic, "q").await;
        assert_eq!(search_outcome(&result), "cli_basic_fallback");
    }

    #[tokio::test]
    async fn test_cli_spawn_failure_is_surfaced() {
        let bridge = CliBridge::new("graphrag-binary-that-does-not-exist", ".", Duration::from_secs(1)).unwrap();
        let dispatcher = dispatcher(None, None, bridge);
        let err = dispatcher.search(SearchMethod::Basic, "q").await.unwrap_err();

        assert!(matches!(err, AppError::CliTimeoutOrSpawn { .. }));
        assert!(err.to_string().starts_with("CLI Exception: "));
    }

    #[tokio::test]
    async fn test_initialize_without_engine() {
        let config = AppConfig::default();
        let dispatcher = SearchDispatcher::initialize(&config).await.unwrap();

        assert!(!dispatcher.engine_available());
        assert!(!dispatcher.data_loaded());
        assert_eq!(dispatcher.community_level(), 2);
        assert_eq!(dispatcher.response_type(), "Multiple Paragraphs");
        assert_eq!(dispatcher.project_directory(), Path::new("."));
    }

    #[tokio::test]
    async fn test_initialize_with_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.project.root_dir = dir.path().to_path_buf();
        config.engine.endpoint = Some("http://127.0.0.1:9".to_string());

        let dispatcher = SearchDispatcher::initialize(&config).await.unwrap();
        assert!(dispatcher.engine_available());
        assert!(!dispatcher.data_loaded());
    }
}
