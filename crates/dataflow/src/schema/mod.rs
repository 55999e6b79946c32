//! Destination table detection and `CREATE TABLE` synthesis.
//!
//! Existence is probed with an empty query against the destination. When the
//! probe fails the table is assumed absent and its definition is inferred from
//! the metadata of the same probe run against the source.

use tracing::{info, warn};

use crate::core::{Connection, GeneratedColumn};
use crate::error::{FlowError, Result};

/// Outcome of [`ensure_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    /// Probe succeeded; nothing was done.
    Existing,
    /// The table was created with this statement.
    Created { ddl: String },
}

impl TableStatus {
    pub fn created(&self) -> bool {
        matches!(self, TableStatus::Created { .. })
    }
}

/// Query returning the table's columns and no rows.
pub fn probe_query(table: &str) -> String {
    format!("SELECT * FROM {} WHERE 1 = 2", table)
}

/// Build `CREATE TABLE` text from column metadata.
pub fn create_table_sql(table: &str, columns: &[GeneratedColumn]) -> String {
    let definitions: Vec<String> = columns.iter().map(GeneratedColumn::definition).collect();
    format!("CREATE TABLE {} ( {})", table, definitions.join(", "))
}

/// Infer the `CREATE TABLE` statement for `table` from the source.
pub fn generate_ddl(source: &dyn Connection, table: &str) -> Result<String> {
    let columns = source
        .describe(&probe_query(table))
        .map_err(|e| FlowError::schema(table, format!("cannot describe source table: {}", e)))?;
    if columns.is_empty() {
        return Err(FlowError::schema(table, "source query returned no columns"));
    }
    Ok(create_table_sql(table, &columns))
}

/// Make sure `table` exists on the destination, creating it from the source
/// definition when the existence probe fails.
///
/// Any probe failure counts as "absent", so a transient error leads to a
/// `CREATE TABLE` attempt that then fails as a schema error.
pub fn ensure_table(
    source: &dyn Connection,
    destination: &dyn Connection,
    table: &str,
) -> Result<TableStatus> {
    let probe = probe_query(table);
    match destination.describe(&probe) {
        Ok(_) => return Ok(TableStatus::Existing),
        Err(e) => {
            warn!("Probe of {} on destination failed, assuming absent: {}", table, e);
        }
    }

    // Some databases abort the open transaction on a failed statement
    destination
        .rollback()
        .map_err(|e| FlowError::schema(table, e))?;

    let ddl = generate_ddl(source, table)?;
    info!("Creating table {}", table);
    destination
        .execute(&ddl)
        .and_then(|_| destination.commit())
        .map_err(|e| FlowError::schema(table, format!("CREATE TABLE failed: {}", e)))?;

    Ok(TableStatus::Created { ddl })
}
