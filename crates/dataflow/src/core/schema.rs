//! Result-set column metadata used to synthesize destination tables.

use serde::Serialize;

use crate::typemap::{self, GenericType};

/// Nullability as reported by the client API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Nullability {
    /// Driver did not say.
    Unknown,
    Nullable,
    NoNulls,
}

/// Metadata of one result-set column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedColumn {
    /// Column label as reported by the source.
    pub name: String,

    /// Generic type of the column.
    pub generic_type: GenericType,

    /// Precision, or length for character types.
    pub precision: usize,

    /// Scale (decimal digits).
    pub scale: i16,

    /// Nullability.
    pub nullability: Nullability,
}

impl GeneratedColumn {
    /// Destination type keyword for this column.
    pub fn type_name(&self) -> &'static str {
        typemap::type_name(self.generic_type)
    }

    /// Render this column as a `CREATE TABLE` column definition.
    ///
    /// The size clause follows the keyword's sizable/numeric class. The
    /// null constraint is `NOT NULL` only for non-nullable columns and is
    /// otherwise empty, which leaves a trailing space.
    pub fn definition(&self) -> String {
        let ty = self.type_name();
        let not_null = match self.nullability {
            Nullability::NoNulls => "NOT NULL",
            Nullability::Nullable | Nullability::Unknown => "",
        };

        if typemap::is_sizable(ty) {
            if typemap::is_numeric(ty) {
                format!(
                    "{} {} ({},{}) {}",
                    self.name, ty, self.precision, self.scale, not_null
                )
            } else {
                format!("{} {} ({}) {}", self.name, ty, self.precision, not_null)
            }
        } else {
            format!("{} {} {}", self.name, ty, not_null)
        }
    }
}
