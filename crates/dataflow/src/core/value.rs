//! SQL value types bound to destination insert parameters.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Column family a NULL value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlNullType {
    Bool,
    I16,
    I32,
    I64,
    F32,
    F64,
    String,
    Bytes,
    Numeric,
    DateTime,
    Date,
    Time,
}

/// A single converted column value, ready to bind.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL, tagged with its column family.
    Null(SqlNullType),

    /// Boolean value.
    Bool(bool),

    /// 16-bit signed integer (smallint, tinyint).
    I16(i16),

    /// 32-bit signed integer (int).
    I32(i32),

    /// 64-bit signed integer (bigint, rowid).
    I64(i64),

    /// 32-bit floating point (real).
    F32(f32),

    /// 64-bit floating point (double, float).
    F64(f64),

    /// Character data (char family, clob, xml, arrays in text form).
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// Exact numeric, kept as the source rendered it so no precision is lost.
    Numeric(String),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),
}

impl SqlValue {
    /// Text sent to the destination driver for this value.
    ///
    /// Binary values travel as upper-case hex digits, which ODBC converts
    /// back to bytes for binary parameters. `None` is SQL NULL.
    pub fn to_text(&self) -> Option<String> {
        match self {
            SqlValue::Null(_) => None,
            SqlValue::Bytes(v) => Some(hex::encode_upper(v)),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null(_) => f.write_str("NULL"),
            SqlValue::Bool(v) => f.write_str(if *v { "1" } else { "0" }),
            SqlValue::I16(v) => write!(f, "{}", v),
            SqlValue::I32(v) => write!(f, "{}", v),
            SqlValue::I64(v) => write!(f, "{}", v),
            SqlValue::F32(v) => write!(f, "{}", v),
            SqlValue::F64(v) => write!(f, "{}", v),
            SqlValue::Text(v) => f.write_str(v),
            SqlValue::Bytes(v) => write!(f, "0x{}", hex::encode_upper(v)),
            SqlValue::Numeric(v) => f.write_str(v),
            SqlValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.f")),
            SqlValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            SqlValue::Time(v) => write!(f, "{}", v.format("%H:%M:%S%.f")),
        }
    }
}
