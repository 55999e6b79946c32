//! Column binders: convert raw source cell text into insert parameter values.
//!
//! Dispatch is a table keyed by [`GenericType`]. Unknown types fall back to
//! binary-large-object binding of the raw bytes.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::core::{SqlNullType, SqlValue};
use crate::typemap::GenericType;

/// Converts one non-NULL cell.
pub type Binder = fn(&[u8]) -> Result<SqlValue, String>;

/// Binder and NULL type for one source column.
#[derive(Clone, Copy)]
pub struct ColumnBinder {
    bind: Binder,
    null_type: SqlNullType,
}

impl ColumnBinder {
    pub fn for_type(ty: GenericType) -> Self {
        let (bind, null_type) = binder_for(ty);
        Self { bind, null_type }
    }

    /// Convert a cell. `None` is SQL NULL.
    pub fn bind(&self, cell: Option<&[u8]>) -> Result<SqlValue, String> {
        match cell {
            None => Ok(SqlValue::Null(self.null_type)),
            Some(bytes) => (self.bind)(bytes),
        }
    }
}

/// Dispatch table.
pub fn binder_for(ty: GenericType) -> (Binder, SqlNullType) {
    match ty {
        GenericType::BigInt | GenericType::RowId => (bind_i64, SqlNullType::I64),
        GenericType::Integer => (bind_i32, SqlNullType::I32),
        GenericType::SmallInt | GenericType::TinyInt => (bind_i16, SqlNullType::I16),
        GenericType::Decimal | GenericType::Numeric => (bind_numeric, SqlNullType::Numeric),
        GenericType::Double | GenericType::Float => (bind_f64, SqlNullType::F64),
        GenericType::Real => (bind_f32, SqlNullType::F32),
        GenericType::Array
        | GenericType::Char
        | GenericType::VarChar
        | GenericType::LongVarChar
        | GenericType::NChar
        | GenericType::NVarChar
        | GenericType::Clob
        | GenericType::SqlXml => (bind_text, SqlNullType::String),
        GenericType::Binary
        | GenericType::VarBinary
        | GenericType::LongVarBinary
        | GenericType::Blob => (bind_hex, SqlNullType::Bytes),
        GenericType::Date => (bind_date, SqlNullType::Date),
        GenericType::Time => (bind_time, SqlNullType::Time),
        GenericType::Timestamp => (bind_timestamp, SqlNullType::DateTime),
        GenericType::Bit | GenericType::Boolean => (bind_bool, SqlNullType::Bool),
        GenericType::Other(_) => (bind_raw, SqlNullType::Bytes),
    }
}

fn as_str(bytes: &[u8]) -> Result<&str, String> {
    std::str::from_utf8(bytes).map_err(|e| format!("invalid UTF-8: {}", e))
}

fn parse<T: std::str::FromStr>(bytes: &[u8], what: &str) -> Result<T, String> {
    let s = as_str(bytes)?.trim();
    s.parse::<T>()
        .map_err(|_| format!("cannot convert '{}' to {}", s, what))
}

/// Values past `i64` (unsigned BIGINT) are passed on as exact numeric text.
fn bind_i64(bytes: &[u8]) -> Result<SqlValue, String> {
    parse(bytes, "BIGINT").map(SqlValue::I64).or_else(|e| {
        let s = as_str(bytes)?.trim();
        match s.parse::<u64>() {
            Ok(_) => Ok(SqlValue::Numeric(s.to_string())),
            Err(_) => Err(e),
        }
    })
}

fn bind_i32(bytes: &[u8]) -> Result<SqlValue, String> {
    parse(bytes, "INT").map(SqlValue::I32)
}

fn bind_i16(bytes: &[u8]) -> Result<SqlValue, String> {
    parse(bytes, "SMALLINT").map(SqlValue::I16)
}

fn bind_f64(bytes: &[u8]) -> Result<SqlValue, String> {
    parse(bytes, "DOUBLE").map(SqlValue::F64)
}

fn bind_f32(bytes: &[u8]) -> Result<SqlValue, String> {
    parse(bytes, "REAL").map(SqlValue::F32)
}

/// Exact numerics keep the source text once it is checked to be a number.
/// NUMERIC(38) and wider scales do not fit a fixed-width type.
fn bind_numeric(bytes: &[u8]) -> Result<SqlValue, String> {
    let s = as_str(bytes)?.trim();
    if is_numeric_literal(s) {
        Ok(SqlValue::Numeric(s.to_string()))
    } else {
        Err(format!("cannot convert '{}' to DECIMAL", s))
    }
}

/// `[+-]digits[.digits][(e|E)[+-]digits]`, with at least one mantissa digit.
fn is_numeric_literal(s: &str) -> bool {
    let s = s.strip_prefix(|c| c == '+' || c == '-').unwrap_or(s);
    let (mantissa, exponent) = match s.find(|c| c == 'e' || c == 'E') {
        Some(at) => (&s[..at], Some(&s[at + 1..])),
        None => (s, None),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    let mantissa_ok = !(int_part.is_empty() && frac_part.is_empty())
        && all_digits(int_part)
        && all_digits(frac_part);
    let exponent_ok = exponent.map_or(true, |exp| {
        let digits = exp.strip_prefix(|c| c == '+' || c == '-').unwrap_or(exp);
        !digits.is_empty() && all_digits(digits)
    });
    mantissa_ok && exponent_ok
}

fn bind_text(bytes: &[u8]) -> Result<SqlValue, String> {
    Ok(SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()))
}

/// ODBC renders binary columns as hex text, with or without a `0x` prefix.
fn bind_hex(bytes: &[u8]) -> Result<SqlValue, String> {
    let s = as_str(bytes)?;
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    hex::decode(digits)
        .map(SqlValue::Bytes)
        .map_err(|e| format!("invalid binary value: {}", e))
}

fn bind_raw(bytes: &[u8]) -> Result<SqlValue, String> {
    Ok(SqlValue::Bytes(bytes.to_vec()))
}

fn bind_date(bytes: &[u8]) -> Result<SqlValue, String> {
    let s = as_str(bytes)?.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(SqlValue::Date)
        .map_err(|_| format!("cannot convert '{}' to DATE", s))
}

fn bind_time(bytes: &[u8]) -> Result<SqlValue, String> {
    let s = as_str(bytes)?.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map(SqlValue::Time)
        .map_err(|_| format!("cannot convert '{}' to TIME", s))
}

fn bind_timestamp(bytes: &[u8]) -> Result<SqlValue, String> {
    let s = as_str(bytes)?.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::default()))
        })
        .map(SqlValue::DateTime)
        .map_err(|_| format!("cannot convert '{}' to TIMESTAMP", s))
}

fn bind_bool(bytes: &[u8]) -> Result<SqlValue, String> {
    match as_str(bytes)?.trim() {
        "1" | "true" | "True" | "TRUE" | "t" => Ok(SqlValue::Bool(true)),
        "0" | "false" | "False" | "FALSE" | "f" => Ok(SqlValue::Bool(false)),
        other => Err(format!("cannot convert '{}' to BIT", other)),
    }
}
