//! Core traits for database-agnostic copying.
//!
//! This module defines the seams between the copy engine and a concrete
//! client API:
//!
//! - [`Connector`]: Opens a [`Connection`] from an [`Endpoint`]
//! - [`Connection`]: Statement execution, metadata and transaction control
//! - [`RowCursor`]: Forward-only, read-only streaming of source rows
//! - [`InsertStatement`]: A prepared parameterized insert on the destination,
//!   executed with array parameter binding
//!
//! All calls are blocking. A connection is used from a single thread.

use serde::Serialize;

use crate::connection::Endpoint;
use crate::error::Result;

use super::schema::GeneratedColumn;
use super::value::SqlValue;

/// One source row as raw cell text. `None` is SQL NULL.
pub type RawRow = Vec<Option<Vec<u8>>>;

/// Product information reported by an open connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseInfo {
    /// Database product name.
    pub product: String,

    /// Product version, when the driver reports one.
    pub version: Option<String>,
}

impl DatabaseInfo {
    /// Banner shown at the start of a copy.
    pub fn banner(&self) -> String {
        match &self.version {
            Some(version) => format!("{} {}", self.product, version),
            None => self.product.clone(),
        }
    }
}

/// Row-set sizing for a streaming cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Rows fetched per round trip.
    pub fetch_size: usize,

    /// Upper bound, in bytes, for one text cell in the row-set buffer. Longer
    /// values fail the fetch.
    pub max_text_length: usize,
}

/// Open a connection to a database.
pub trait Connector {
    /// Connect to the endpoint. Connections start in auto-commit mode.
    fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>>;
}

/// An open database connection.
pub trait Connection {
    /// Product name and version of the connected database.
    fn info(&self) -> Result<DatabaseInfo>;

    /// Execute a statement, discarding any result set.
    fn execute(&self, sql: &str) -> Result<()>;

    /// Execute a query and return the metadata of its result columns.
    fn describe(&self, sql: &str) -> Result<Vec<GeneratedColumn>>;

    /// Switch between auto-commit and manual-commit mode.
    fn set_auto_commit(&self, enabled: bool) -> Result<()>;

    /// Commit the current transaction.
    fn commit(&self) -> Result<()>;

    /// Roll back the current transaction.
    fn rollback(&self) -> Result<()>;

    /// Open a forward-only, read-only cursor.
    ///
    /// A cell longer than `options.max_text_length` is an error, never a
    /// truncated value.
    fn open_cursor<'c>(
        &'c self,
        sql: &str,
        options: FetchOptions,
    ) -> Result<Box<dyn RowCursor + 'c>>;

    /// Prepare a parameterized statement that sends up to `batch_size` rows
    /// per round trip.
    fn prepare<'c>(
        &'c self,
        sql: &str,
        batch_size: usize,
    ) -> Result<Box<dyn InsertStatement + 'c>>;
}

/// Streaming access to the rows of a query.
pub trait RowCursor {
    /// Next row, or `None` once the result set is exhausted.
    fn next_row(&mut self) -> Result<Option<RawRow>>;
}

/// A prepared statement executed over arrays of bound rows.
pub trait InsertStatement {
    /// Execute the statement for every row, as one bound parameter array per
    /// `batch_size` rows. Returns the number of rows executed.
    ///
    /// Does not commit.
    fn execute_batch(&mut self, rows: &[Vec<SqlValue>]) -> Result<u64>;
}
