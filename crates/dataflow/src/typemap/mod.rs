//! Type mapping from generic source column types to destination DDL keywords.

use serde::Serialize;

/// Generic column type reported by the client API for a result-set column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GenericType {
    Array,
    BigInt,
    Binary,
    Bit,
    Blob,
    Clob,
    Boolean,
    Char,
    Date,
    Decimal,
    Double,
    Float,
    Integer,
    NChar,
    Numeric,
    NVarChar,
    RowId,
    SmallInt,
    SqlXml,
    Time,
    Timestamp,
    TinyInt,
    VarBinary,
    VarChar,
    LongVarBinary,
    Real,
    LongVarChar,
    /// Code the mapper does not recognize.
    Other(i16),
}

impl GenericType {
    /// Map a standardized ODBC SQL type code.
    pub fn from_sql_code(code: i16) -> Self {
        match code {
            1 => GenericType::Char,
            2 => GenericType::Numeric,
            3 => GenericType::Decimal,
            4 => GenericType::Integer,
            5 => GenericType::SmallInt,
            6 => GenericType::Float,
            7 => GenericType::Real,
            8 => GenericType::Double,
            // DATETIME (ODBC 2) and TIMESTAMP
            9 | 11 | 93 => GenericType::Timestamp,
            12 => GenericType::VarChar,
            91 => GenericType::Date,
            // TIME and SQL Server TIME2
            92 | -154 => GenericType::Time,
            -1 | -10 => GenericType::LongVarChar,
            -2 => GenericType::Binary,
            -3 => GenericType::VarBinary,
            -4 => GenericType::LongVarBinary,
            -5 => GenericType::BigInt,
            -6 => GenericType::TinyInt,
            -7 => GenericType::Bit,
            -8 => GenericType::NChar,
            -9 => GenericType::NVarChar,
            // GUID travels as its 36 character text form
            -11 => GenericType::Char,
            -152 => GenericType::SqlXml,
            other => GenericType::Other(other),
        }
    }
}

/// Destination type keyword for a generic column type.
pub fn type_name(ty: GenericType) -> &'static str {
    match ty {
        GenericType::Array => "ARRAY",
        GenericType::BigInt => "BIGINT",
        GenericType::Binary => "BINARY",
        GenericType::Bit => "BIT",
        GenericType::Blob => "BLOB",
        GenericType::Clob => "CLOB",
        GenericType::Boolean => "BIT",
        GenericType::Char => "CHAR",
        GenericType::Date => "DATE",
        GenericType::Decimal => "DECIMAL",
        GenericType::Double => "DOUBLE",
        GenericType::Float => "FLOAT",
        GenericType::Integer => "INT",
        GenericType::NChar => "NCHAR",
        GenericType::Numeric => "NUMERIC",
        GenericType::NVarChar => "NVARCHAR",
        GenericType::RowId => "BIGINT",
        GenericType::SmallInt => "SMALLINT",
        GenericType::SqlXml => "BLOB",
        GenericType::Time => "TIME",
        GenericType::Timestamp => "TIMESTAMP",
        GenericType::TinyInt => "TINYINT",
        GenericType::VarBinary => "VARBINARY",
        GenericType::VarChar => "VARCHAR",
        GenericType::LongVarBinary => "VARBINARY(MAX)",
        GenericType::Real => "REAL",
        GenericType::LongVarChar => "CLOB",
        GenericType::Other(_) => "BLOB",
    }
}

/// Whether the keyword takes a length/precision clause in DDL.
pub fn is_sizable(type_name: &str) -> bool {
    matches!(
        type_name,
        "VARCHAR" | "NUMERIC" | "DECIMAL" | "CHAR" | "NCHAR" | "NVARCHAR"
    )
}

/// Whether the keyword takes a scale in addition to precision.
pub fn is_numeric(type_name: &str) -> bool {
    matches!(type_name, "NUMERIC" | "DECIMAL")
}
