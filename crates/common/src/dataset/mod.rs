//! Index artifact loading
//!
//! The gateway serves queries over the output of an offline GraphRAG
//! indexing run. At startup the project settings are resolved and the
//! Parquet artifacts are read into memory once; they are never mutated
//! afterwards and are shared by every request.

mod table;

#[cfg(test)]
pub(crate) use table::test_support;
pub use table::{Row, Table};

use config::{Config, File};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use crate::errors::{AppError, Result};
use crate::metrics;

pub const ENTITIES: &str = "entities";
pub const COMMUNITIES: &str = "communities";
pub const COMMUNITY_REPORTS: &str = "community_reports";
pub const TEXT_UNITS: &str = "text_units";
pub const RELATIONSHIPS: &str = "relationships";
pub const COVARIATES: &str = "covariates";

/// GraphRAG project settings (`settings.yaml` in the project root)
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSettings {
    root: PathBuf,
    values: Value,
}

impl ProjectSettings {
    pub fn new(root: impl Into<PathBuf>, values: Value) -> Self {
        Self {
            root: root.into(),
            values,
        }
    }

    /// Resolve `settings.{yaml,yml,json,toml}` under the project root
    pub fn load(root: &Path) -> Result<Self> {
        let base = root.join("settings");
        let values = Config::builder()
            .add_source(File::with_name(&base.to_string_lossy()))
            .build()?
            .try_deserialize::<Value>()?;

        Ok(Self::new(root, values))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Raw settings tree as parsed from disk
    pub fn values(&self) -> &Value {
        &self.values
    }

    /// Look up a dotted key, e.g. `local_search.max_tokens`
    pub fn get(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.values, |node, part| node.get(part))
    }
}

/// Artifacts produced by the indexing pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Datasets {
    pub entities: Table,
    pub communities: Table,
    pub community_reports: Table,
    pub text_units: Table,
    pub relationships: Table,
    /// Claims; only present when claim extraction ran
    pub covariates: Option<Table>,
}

/// Everything the engine needs that is resolved once at startup
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub settings: ProjectSettings,
    pub datasets: Datasets,
}

/// Reads the project settings and index artifacts from disk
pub struct DatasetLoader {
    root: PathBuf,
    output: PathBuf,
    load_covariates: bool,
}

impl DatasetLoader {
    pub fn new(project: &ProjectConfig) -> Self {
        Self {
            root: project.root_dir.clone(),
            output: project.output_path(),
            load_covariates: project.claim_extraction_enabled,
        }
    }

    /// Load settings and all required artifacts.
    ///
    /// Any missing or unreadable required artifact fails the whole load.
    /// Covariates are best effort.
    pub async fn load(&self) -> Result<LoadedProject> {
        let root = self.root.clone();
        let output = self.output.clone();
        let load_covariates = self.load_covariates;

        tokio::task::spawn_blocking(move || Self::load_blocking(&root, &output, load_covariates))
            .await
            .map_err(|e| AppError::Internal {
                message: format!("dataset loader task failed: {}", e),
            })?
    }

    fn load_blocking(root: &Path, output: &Path, load_covariates: bool) -> Result<LoadedProject> {
        tracing::info!(root = %root.display(), "Loading GraphRAG settings");
        let settings = ProjectSettings::load(root)?;

        tracing::info!(output = %output.display(), "Loading parquet artifacts");
        let read = |name: &str| -> Result<Table> {
            let table = Table::read_parquet(name, &output.join(format!("{}.parquet", name)))?;
            metrics::record_dataset_rows(name, table.len());
            Ok(table)
        };

        let datasets = Datasets {
            entities: read(ENTITIES)?,
            communities: read(COMMUNITIES)?,
            community_reports: read(COMMUNITY_REPORTS)?,
            text_units: read(TEXT_UNITS)?,
            relationships: read(RELATIONSHIPS)?,
            covariates: if load_covariates {
                match read(COVARIATES) {
                    Ok(table) => Some(table),
                    Err(e) => {
                        tracing::info!(error = %e, "Covariates unavailable");
                        None
                    }
                }
            } else {
                None
            },
        };

        tracing::info!(
            entities = datasets.entities.len(),
            relationships = datasets.relationships.len(),
            covariates = datasets.covariates.is_some(),
            "Index artifacts loaded"
        );

        Ok(LoadedProject { settings, datasets })
    }
}
