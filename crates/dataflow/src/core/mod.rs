//! Core abstractions for database-agnostic copying.
//!
//! - [`schema`]: Result-set column metadata and DDL column rendering
//! - [`value`]: Converted values bound to insert parameters
//! - [`traits`]: Connection, cursor and prepared-statement seams
//!
//! The ODBC backend in [`crate::connection::odbc`] implements the traits;
//! tests use an in-memory implementation.

pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{GeneratedColumn, Nullability};
pub use traits::{
    Connection, Connector, DatabaseInfo, FetchOptions, InsertStatement, RawRow, RowCursor,
};
pub use value::{SqlNullType, SqlValue};
