//! Pipeline runner - iterates source entries and wires the copy components together.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::{PipelineConfig, SourceDatabase};
use crate::connection::{destination_url, ConnectionManager};
use crate::core::Connector;
use crate::error::{FlowError, Result};
use crate::postscript::PostScriptRunner;
use crate::progress::ProgressSink;
use crate::transfer::{CopyEngine, TableStats, TransferJob};

/// Runs a loaded configuration.
pub struct Pipeline {
    config: PipelineConfig,
    connector: Box<dyn Connector>,
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Unique run identifier.
    pub run_id: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Per source entry results, in processing order.
    pub databases: Vec<DatabaseSummary>,

    /// Total rows copied.
    pub rows_transferred: u64,
}

/// Result for one source entry.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseSummary {
    pub name: String,
    pub tables: Vec<TableStats>,
    pub scripts_run: usize,
}

/// What a run would do, resolved without connecting.
#[derive(Debug, Clone, Serialize)]
pub struct RunPlan {
    pub databases: Vec<DatabasePlan>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabasePlan {
    pub name: String,
    pub destination_url: String,
    pub tables: Vec<TablePlan>,
    pub post_scripts: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TablePlan {
    pub table: String,
    pub query: String,
    pub fetch_size: usize,
    pub batch_size: usize,
}

/// Connectivity report for one source entry.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub name: String,
    pub source_product: String,
    pub destination_product: String,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, connector: Box<dyn Connector>) -> Self {
        Self { config, connector }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Source entries to process. An empty filter selects all of them.
    pub fn select(&self, names: &[String]) -> Result<Vec<&SourceDatabase>> {
        if names.is_empty() {
            return Ok(self.config.databases.iter().collect());
        }
        if let Some(unknown) = names
            .iter()
            .find(|n| !self.config.databases.iter().any(|db| &db.name == *n))
        {
            return Err(FlowError::Config(format!(
                "unknown database '{}'",
                unknown
            )));
        }
        Ok(self
            .config
            .databases
            .iter()
            .filter(|db| names.contains(&db.name))
            .collect())
    }

    /// Resolve destinations, queries and sizes without connecting.
    pub fn plan(&self, names: &[String]) -> Result<RunPlan> {
        let export = &self.config.export;
        let databases = self
            .select(names)?
            .into_iter()
            .map(|db| DatabasePlan {
                name: db.name.clone(),
                destination_url: destination_url(export, &db.name),
                tables: db
                    .imports
                    .iter()
                    .map(|import| {
                        let job = TransferJob::from_import(db, export, import);
                        TablePlan {
                            table: job.table,
                            query: job.query,
                            fetch_size: job.fetch.fetch_size,
                            batch_size: job.batch_size,
                        }
                    })
                    .collect(),
                post_scripts: db.post_scripts.iter().map(|s| s.label.clone()).collect(),
            })
            .collect();
        Ok(RunPlan { databases })
    }

    /// Copy every selected entry in declared order.
    pub fn run(&self, names: &[String], progress: &dyn ProgressSink) -> Result<RunSummary> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting run: {}", run_id);

        let selected = self.select(names)?;
        let manager = ConnectionManager::new(self.connector.as_ref(), &self.config.export)?;

        let mut databases = Vec::with_capacity(selected.len());
        for db in selected {
            info!("Processing database {}", db.name);
            let pair = manager.open(db)?;

            let jobs: Vec<TransferJob> = db
                .imports
                .iter()
                .map(|import| TransferJob::from_import(db, &self.config.export, import))
                .collect();
            let tables = CopyEngine::for_pair(&pair, progress)
                .with_database(&db.name)
                .run(&jobs)?;
            let scripts_run =
                PostScriptRunner::new(pair.destination.as_ref(), progress).run(&db.post_scripts)?;

            databases.push(DatabaseSummary {
                name: db.name.clone(),
                tables,
                scripts_run,
            });
        }

        let completed_at = Utc::now();
        let rows_transferred: u64 = databases
            .iter()
            .flat_map(|d| d.tables.iter())
            .map(|t| t.rows)
            .sum();
        let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        info!(
            "Run {} complete: {} rows in {:.1}s",
            run_id, rows_transferred, duration_seconds
        );

        Ok(RunSummary {
            run_id,
            started_at,
            completed_at,
            duration_seconds,
            databases,
            rows_transferred,
        })
    }

    /// Open every selected entry's connection pair, including setup SQL.
    pub fn health_check(&self, names: &[String]) -> Result<Vec<HealthReport>> {
        let manager = ConnectionManager::new(self.connector.as_ref(), &self.config.export)?;
        let mut reports = Vec::new();
        for db in self.select(names)? {
            let pair = manager.open(db)?;
            let source = pair
                .source
                .info()
                .map_err(|e| FlowError::connection(format!("source '{}'", db.name), e))?;
            let destination = pair
                .destination
                .info()
                .map_err(|e| FlowError::connection("destination", e))?;
            info!(
                "{}: source {} -> destination {}",
                db.name,
                source.banner(),
                destination.banner()
            );
            reports.push(HealthReport {
                name: db.name.clone(),
                source_product: source.banner(),
                destination_product: destination.banner(),
            });
        }
        Ok(reports)
    }
}

impl RunSummary {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
