//! # dataflow
//!
//! Copy tables between relational databases reachable through ODBC.
//!
//! This library provides the core functionality for copying data driven by
//! a declarative job description:
//!
//! - **Schema inference** creating missing destination tables from source metadata
//! - **Streaming transfers** through forward-only cursors with bounded memory
//! - **Batched commits** of parameterized inserts
//! - **Post scripts** run against the destination after the copy
//!
//! ## Example
//!
//! ```rust,no_run
//! use dataflow::{ConsoleProgress, OdbcConnector, Pipeline, PipelineConfig};
//!
//! fn main() -> dataflow::Result<()> {
//!     let config = PipelineConfig::load("pipeline-config.json")?;
//!     let pipeline = Pipeline::new(config, Box::new(OdbcConnector::new()));
//!     let summary = pipeline.run(&[], &ConsoleProgress::stdout())?;
//!     println!("Copied {} rows", summary.rows_transferred);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod core;
pub mod error;
pub mod orchestrator;
pub mod postscript;
pub mod progress;
pub mod schema;
pub mod transfer;
pub mod typemap;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use config::{DestinationConfig, ImportJob, PipelineConfig, PostScript, SourceDatabase};
pub use connection::odbc::OdbcConnector;
pub use connection::{ConnectionManager, ConnectionPair, Endpoint};
pub use error::{FlowError, Result};
pub use orchestrator::{Pipeline, RunPlan, RunSummary};
pub use progress::{ConsoleProgress, JsonProgress, ProgressEvent, ProgressSink};
pub use schema::{ensure_table, TableStatus};
pub use transfer::{CopyEngine, TableStats, TransferJob};
pub use typemap::GenericType;
