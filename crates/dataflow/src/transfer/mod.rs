//! Streaming batched copy from a source connection to a destination connection.
//!
//! For each job the engine ensures the destination table exists, streams the
//! source query through a forward-only cursor and writes the rows with a
//! prepared `INSERT`, committing every `batch_size` rows. Memory use per table
//! is bounded by one fetched row-set plus one pending batch.
//!
//! A failure stops the run. Batches committed before it stay committed; the
//! uncommitted remainder is rolled back when the connection is dropped.

pub mod bind;

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{DestinationConfig, ImportJob, SourceDatabase};
use crate::connection::ConnectionPair;
use crate::core::{Connection, FetchOptions, SqlValue};
use crate::error::{FlowError, Result};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::schema::{self, TableStatus};

use bind::ColumnBinder;

/// Copy job for a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    /// Destination table, also the source table probed for column types.
    pub table: String,

    /// Query streamed from the source.
    pub query: String,

    /// Source row-set sizing.
    pub fetch: FetchOptions,

    /// Rows per committed destination batch.
    pub batch_size: usize,
}

impl TransferJob {
    /// Resolve an import's effective query and sizes.
    pub fn from_import(
        source: &SourceDatabase,
        destination: &DestinationConfig,
        import: &ImportJob,
    ) -> Self {
        Self {
            table: import.table.clone(),
            query: import.select_sql(),
            fetch: FetchOptions {
                fetch_size: source.fetch_size_for(import),
                max_text_length: source.max_text_length(),
            },
            batch_size: destination.batch_size_for(import),
        }
    }
}

/// Statistics from a table copy.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableStats {
    /// Table name.
    pub table: String,

    /// Rows copied.
    pub rows: u64,

    /// Batches committed.
    pub batches: u64,

    /// Whether the destination table was created by this run.
    pub created: bool,

    /// Wall time for the table.
    #[serde(rename = "duration_seconds", serialize_with = "serialize_secs")]
    pub duration: Duration,
}

fn serialize_secs<S>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64())
}

/// Copies configured tables over one connection pair.
pub struct CopyEngine<'a> {
    source: &'a dyn Connection,
    destination: &'a dyn Connection,
    progress: &'a dyn ProgressSink,
    database: String,
}

impl<'a> CopyEngine<'a> {
    pub fn new(
        source: &'a dyn Connection,
        destination: &'a dyn Connection,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            source,
            destination,
            progress,
            database: String::new(),
        }
    }

    /// Engine over an open connection pair.
    pub fn for_pair(pair: &'a ConnectionPair, progress: &'a dyn ProgressSink) -> Self {
        Self::new(pair.source.as_ref(), pair.destination.as_ref(), progress)
    }

    /// Name of the source entry, used in progress events.
    pub fn with_database(mut self, name: impl Into<String>) -> Self {
        self.database = name.into();
        self
    }

    /// Copy every job in order.
    ///
    /// Both connections run in manual-commit mode for the duration; auto-commit
    /// is restored once all jobs succeed.
    pub fn run(&self, jobs: &[TransferJob]) -> Result<Vec<TableStats>> {
        let info = self
            .source
            .info()
            .map_err(|e| FlowError::connection(format!("source '{}'", self.database), e))?;
        info!("Source database: {}", info.banner());
        self.progress.report(&ProgressEvent::DatabaseInfo {
            database: self.database.clone(),
            product: info.product,
            version: info.version,
        });

        self.set_auto_commit(false)?;

        let mut stats = Vec::with_capacity(jobs.len());
        for job in jobs {
            stats.push(self.copy_table(job)?);
        }

        self.set_auto_commit(true)?;
        Ok(stats)
    }

    fn set_auto_commit(&self, enabled: bool) -> Result<()> {
        self.source
            .set_auto_commit(enabled)
            .map_err(|e| FlowError::connection(format!("source '{}'", self.database), e))?;
        self.destination
            .set_auto_commit(enabled)
            .map_err(|e| FlowError::connection("destination", e))
    }

    /// Copy one table.
    pub fn copy_table(&self, job: &TransferJob) -> Result<TableStats> {
        let start = Instant::now();
        let table = job.table.as_str();
        info!("Importing {}", table);
        self.progress.report(&ProgressEvent::TableStarted {
            table: table.to_string(),
        });

        let status = schema::ensure_table(self.source, self.destination, table)?;
        if let TableStatus::Created { ddl } = &status {
            self.progress.report(&ProgressEvent::TableCreated {
                table: table.to_string(),
                ddl: ddl.clone(),
            });
        }

        // Column types come from the table itself, also for custom queries
        let columns = self
            .source
            .describe(&schema::probe_query(table))
            .map_err(|e| FlowError::transfer(table, format!("cannot describe source: {}", e)))?;
        let binders: Vec<ColumnBinder> = columns
            .iter()
            .map(|c| ColumnBinder::for_type(c.generic_type))
            .collect();

        let mut cursor = self
            .source
            .open_cursor(&job.query, job.fetch)
            .map_err(|e| FlowError::transfer(table, format!("source query failed: {}", e)))?;
        let batch_size = job.batch_size.max(1);
        let mut insert = self
            .destination
            .prepare(&insert_sql(table, binders.len()), batch_size)
            .map_err(|e| FlowError::transfer(table, format!("cannot prepare insert: {}", e)))?;

        let mut pending: Vec<Vec<SqlValue>> = Vec::with_capacity(batch_size.min(65_536));
        let mut rows: u64 = 0;
        let mut batches: u64 = 0;

        while let Some(raw) = cursor
            .next_row()
            .map_err(|e| FlowError::transfer(table, format!("fetch failed: {}", e)))?
        {
            if raw.len() != binders.len() {
                return Err(FlowError::transfer(
                    table,
                    format!(
                        "row {} has {} columns, expected {}",
                        rows + 1,
                        raw.len(),
                        binders.len()
                    ),
                ));
            }

            let mut values = Vec::with_capacity(binders.len());
            for (index, (binder, cell)) in binders.iter().zip(raw.iter()).enumerate() {
                let value = binder.bind(cell.as_deref()).map_err(|e| {
                    FlowError::transfer(
                        table,
                        format!("row {}, column {}: {}", rows + 1, columns[index].name, e),
                    )
                })?;
                values.push(value);
            }
            pending.push(values);
            rows += 1;

            if pending.len() >= batch_size {
                self.flush(table, &mut *insert, &mut pending)?;
                batches += 1;
                debug!("{}: committed batch {} ({} rows total)", table, batches, rows);
                self.progress.report(&ProgressEvent::BatchCommitted {
                    table: table.to_string(),
                    rows,
                });
            }
        }

        if !pending.is_empty() {
            self.flush(table, &mut *insert, &mut pending)?;
            batches += 1;
            debug!("{}: committed final batch {}", table, batches);
        }

        drop(insert);
        drop(cursor);

        let duration = start.elapsed();
        info!(
            "Processed {} rows from {} in {:.2}s",
            rows,
            table,
            duration.as_secs_f64()
        );
        self.progress.report(&ProgressEvent::TableFinished {
            table: table.to_string(),
            rows,
        });

        Ok(TableStats {
            table: table.to_string(),
            rows,
            batches,
            created: status.created(),
            duration,
        })
    }

    fn flush(
        &self,
        table: &str,
        insert: &mut dyn crate::core::InsertStatement,
        pending: &mut Vec<Vec<SqlValue>>,
    ) -> Result<()> {
        insert
            .execute_batch(pending)
            .map_err(|e| FlowError::transfer(table, format!("batch insert failed: {}", e)))?;
        self.destination
            .commit()
            .map_err(|e| FlowError::transfer(table, format!("commit failed: {}", e)))?;
        pending.clear();
        Ok(())
    }
}

/// `INSERT INTO <table> VALUES (?, ?, ...)` with one marker per column.
pub fn insert_sql(table: &str, columns: usize) -> String {
    let markers = vec!["?"; columns].join(", ");
    format!("INSERT INTO {} VALUES ({})", table, markers)
}
