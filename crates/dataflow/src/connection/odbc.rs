//! ODBC implementation of the connection seams.
//!
//! A driver name plus a connection string selects the backend, so any
//! database with an installed ODBC driver can be a source or destination.
//!
//! **Requirements:**
//! - An ODBC driver manager (unixODBC on Linux/macOS, built in on Windows)
//! - An ODBC driver for every database named in the configuration

use std::cell::Cell;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::OnceLock;

use odbc_api::buffers::{TextColumn, TextRowSet};
use odbc_api::handles::StatementImpl;
use odbc_api::{
    BlockCursor, ColumnDescription, ColumnarBulkInserter, ConnectionOptions, Cursor,
    Environment, ResultSetMetadata,
};
use tracing::{debug, warn};

use super::Endpoint;
use crate::core::{
    Connection, Connector, DatabaseInfo, FetchOptions, GeneratedColumn, InsertStatement,
    Nullability, RawRow, RowCursor, SqlValue,
};
use crate::error::{FlowError, Result};
use crate::typemap::GenericType;

static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

/// Starting width of a text parameter buffer. Buffers grow to the longest
/// value bound so far.
const INITIAL_PARAMETER_LENGTH: usize = 64;

/// Process-wide ODBC environment, created on first use.
fn environment() -> Result<&'static Environment> {
    if let Some(env) = ENVIRONMENT.get() {
        return Ok(env);
    }
    let env = Environment::new()?;
    // Loses to a concurrent initializer at most once
    let _ = ENVIRONMENT.set(env);
    ENVIRONMENT
        .get()
        .ok_or_else(|| FlowError::Config("ODBC environment unavailable".into()))
}

/// Opens connections through the ODBC driver manager.
#[derive(Debug, Default, Clone, Copy)]
pub struct OdbcConnector;

impl OdbcConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for OdbcConnector {
    fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>> {
        let env = environment()?;
        debug!(
            "ODBC connection string (credentials hidden): Driver={{{}}};{};...",
            endpoint.driver, endpoint.url
        );
        let connection_string = endpoint.connection_string();
        let conn = env
            .connect_with_connection_string(&connection_string, ConnectionOptions::default())
            .map_err(|e| FlowError::connection(endpoint.describe(), e))?;
        Ok(Box::new(OdbcConnection {
            conn,
            manual_commit: Cell::new(false),
            label: endpoint.describe(),
        }))
    }
}

/// An open ODBC connection.
///
/// Dropping it in manual-commit mode rolls back the uncommitted remainder.
pub struct OdbcConnection {
    conn: odbc_api::Connection<'static>,
    manual_commit: Cell<bool>,
    label: String,
}

impl Connection for OdbcConnection {
    /// odbc-api only exposes the DBMS name (`SQL_DBMS_NAME`), so the version
    /// is never reported and the banner shows the product alone.
    fn info(&self) -> Result<DatabaseInfo> {
        let product = self.conn.database_management_system_name()?;
        Ok(DatabaseInfo {
            product,
            version: None,
        })
    }

    fn execute(&self, sql: &str) -> Result<()> {
        // Any result set is closed when the cursor drops
        self.conn.execute(sql, ())?;
        Ok(())
    }

    fn describe(&self, sql: &str) -> Result<Vec<GeneratedColumn>> {
        let Some(mut cursor) = self.conn.execute(sql, ())? else {
            return Err(FlowError::Config(format!(
                "query produced no result set: {}",
                sql
            )));
        };

        let num_cols = cursor.num_result_cols()?.max(0) as u16;
        let mut columns = Vec::with_capacity(num_cols as usize);
        for index in 1..=num_cols {
            let mut desc = ColumnDescription::default();
            cursor.describe_col(index, &mut desc)?;
            let name = cursor.col_name(index)?;
            let nullability = match desc.nullability {
                odbc_api::Nullability::NoNulls => Nullability::NoNulls,
                odbc_api::Nullability::Nullable => Nullability::Nullable,
                odbc_api::Nullability::Unknown => Nullability::Unknown,
            };
            columns.push(GeneratedColumn {
                name,
                generic_type: GenericType::from_sql_code(desc.data_type.data_type().0),
                precision: desc.data_type.column_size().map(NonZeroUsize::get).unwrap_or(0),
                scale: desc.data_type.decimal_digits(),
                nullability,
            });
        }
        Ok(columns)
    }

    fn set_auto_commit(&self, enabled: bool) -> Result<()> {
        self.conn.set_autocommit(enabled)?;
        self.manual_commit.set(!enabled);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.conn.commit()?;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.conn.rollback()?;
        Ok(())
    }

    fn open_cursor<'c>(
        &'c self,
        sql: &str,
        options: FetchOptions,
    ) -> Result<Box<dyn RowCursor + 'c>> {
        let Some(mut cursor) = self.conn.execute(sql, ())? else {
            return Err(FlowError::Config(format!(
                "query produced no result set: {}",
                sql
            )));
        };
        let num_cols = cursor.num_result_cols()?.max(0) as u16;
        let column_names = (1..=num_cols)
            .map(|index| cursor.col_name(index))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let buffer = TextRowSet::for_cursor(
            options.fetch_size,
            &mut cursor,
            Some(options.max_text_length),
        )?;
        let block = cursor.bind_buffer(buffer)?;
        Ok(Box::new(OdbcRowCursor {
            block,
            column_names,
            max_text_length: options.max_text_length,
            pending: VecDeque::new(),
            exhausted: false,
        }))
    }

    fn prepare<'c>(
        &'c self,
        sql: &str,
        batch_size: usize,
    ) -> Result<Box<dyn InsertStatement + 'c>> {
        let mut prepared = self.conn.prepare(sql)?;
        let columns = prepared.num_params()? as usize;
        let inserter = prepared
            .into_text_inserter(batch_size.max(1), vec![INITIAL_PARAMETER_LENGTH; columns])?;
        Ok(Box::new(OdbcInsert { inserter, columns }))
    }
}

impl Drop for OdbcConnection {
    fn drop(&mut self) {
        if self.manual_commit.get() {
            if let Err(e) = self.conn.rollback() {
                warn!("Rollback on close of {} failed: {}", self.label, e);
            }
        }
    }
}

/// Block cursor draining one row-set at a time.
struct OdbcRowCursor<C: Cursor> {
    block: BlockCursor<C, TextRowSet>,
    column_names: Vec<String>,
    max_text_length: usize,
    pending: VecDeque<RawRow>,
    exhausted: bool,
}

impl<C: Cursor> RowCursor for OdbcRowCursor<C> {
    fn next_row(&mut self) -> Result<Option<RawRow>> {
        while self.pending.is_empty() && !self.exhausted {
            let fetched = self
                .block
                .fetch_with_truncation_check(true)
                .map_err(|e| fetch_error(&self.column_names, self.max_text_length, e))?;
            match fetched {
                Some(batch) => {
                    for row_idx in 0..batch.num_rows() {
                        let row: RawRow = (0..self.column_names.len())
                            .map(|col_idx| batch.at(col_idx, row_idx).map(<[u8]>::to_vec))
                            .collect();
                        self.pending.push_back(row);
                    }
                }
                None => self.exhausted = true,
            }
        }
        Ok(self.pending.pop_front())
    }
}

/// A truncated cell names its column and the configured limit.
fn fetch_error(
    column_names: &[String],
    max_text_length: usize,
    error: odbc_api::Error,
) -> FlowError {
    match error {
        odbc_api::Error::TooLargeValueForBuffer {
            indicator,
            buffer_index,
        } => {
            let column = column_names
                .get(buffer_index)
                .map(String::as_str)
                .unwrap_or("?");
            let size = match indicator {
                Some(bytes) => format!("{} bytes", bytes),
                None => "unknown length".to_string(),
            };
            FlowError::Config(format!(
                "value of column '{}' ({}) is longer than maxTextLength ({} bytes)",
                column, size, max_text_length
            ))
        }
        other => FlowError::Odbc(other),
    }
}

/// Prepared insert with one text parameter array per column.
///
/// Values are bound in their canonical text form; the driver converts them
/// to the parameter's SQL type.
struct OdbcInsert<'c> {
    inserter: ColumnarBulkInserter<StatementImpl<'c>, TextColumn<u8>>,
    columns: usize,
}

impl InsertStatement for OdbcInsert<'_> {
    fn execute_batch(&mut self, rows: &[Vec<SqlValue>]) -> Result<u64> {
        if let Some(row) = rows.iter().find(|row| row.len() != self.columns) {
            return Err(FlowError::Config(format!(
                "insert row has {} values, statement expects {}",
                row.len(),
                self.columns
            )));
        }

        for chunk in rows.chunks(self.inserter.capacity().max(1)) {
            self.inserter.set_num_rows(chunk.len());
            for col_idx in 0..self.columns {
                let mut column = self.inserter.column_mut(col_idx);
                for (row_idx, row) in chunk.iter().enumerate() {
                    let text = row[col_idx].to_text();
                    if let Some(text) = &text {
                        column.ensure_max_element_length(text.len(), row_idx)?;
                    }
                    column.set_cell(row_idx, text.as_deref().map(str::as_bytes));
                }
            }
            self.inserter.execute()?;
            debug!("Executed parameter array of {} rows", chunk.len());
        }
        self.inserter.clear();
        Ok(rows.len() as u64)
    }
}
