//! SQL data type definitions.

use core::fmt;

use serde::{Deserialize, Serialize};

/// SQL data types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Untyped expression.
    #[default]
    Null,

    // Integer types
    /// Small integer (2 bytes).
    Smallint,
    /// Integer (4 bytes).
    Integer,
    /// Big integer (8 bytes).
    Bigint,

    // Floating point
    /// Real (4-byte float).
    Real,
    /// Double precision (8-byte float).
    Double,
    /// Decimal with precision and scale.
    Decimal {
        /// Total number of digits.
        precision: Option<u16>,
        /// Number of digits after decimal point.
        scale: Option<u16>,
    },

    // String types
    /// Fixed-length character string.
    Char(Option<u32>),
    /// Variable-length character string.
    Varchar(Option<u32>),
    /// Text (variable length, no limit).
    Text,

    // Binary types
    /// Binary large object.
    Blob,

    // Date/time types
    /// Date.
    Date,
    /// Time.
    Time,
    /// Timestamp.
    Timestamp,

    // Boolean
    /// Boolean.
    Boolean,

    /// Database-specific type rendered verbatim.
    Custom(String),
}

impl DataType {
    /// Returns the SQL representation of the data type.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Smallint => String::from("SMALLINT"),
            Self::Integer => String::from("INTEGER"),
            Self::Bigint => String::from("BIGINT"),
            Self::Real => String::from("REAL"),
            Self::Double => String::from("DOUBLE"),
            Self::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => format!("DECIMAL({p}, {s})"),
                (Some(p), None) => format!("DECIMAL({p})"),
                _ => String::from("DECIMAL"),
            },
            Self::Char(len) => match len {
                Some(n) => format!("CHAR({n})"),
                None => String::from("CHAR"),
            },
            Self::Varchar(len) => match len {
                Some(n) => format!("VARCHAR({n})"),
                None => String::from("VARCHAR"),
            },
            Self::Text => String::from("TEXT"),
            Self::Blob => String::from("BLOB"),
            Self::Date => String::from("DATE"),
            Self::Time => String::from("TIME"),
            Self::Timestamp => String::from("TIMESTAMP"),
            Self::Boolean => String::from("BOOLEAN"),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Returns the comparison family of the type.
    #[must_use]
    pub const fn affinity(&self) -> TypeAffinity {
        match self {
            Self::Smallint
            | Self::Integer
            | Self::Bigint
            | Self::Real
            | Self::Double
            | Self::Decimal { .. } => TypeAffinity::Numeric,
            Self::Char(_) | Self::Varchar(_) | Self::Text => TypeAffinity::String,
            Self::Boolean => TypeAffinity::Boolean,
            Self::Date | Self::Time | Self::Timestamp => TypeAffinity::Temporal,
            Self::Null | Self::Blob | Self::Custom(_) => TypeAffinity::Other,
        }
    }

    /// Returns true for the untyped marker.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Families of types sharing comparison behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeAffinity {
    /// Integer, floating point and decimal types.
    Numeric,
    /// Character types.
    String,
    /// Boolean.
    Boolean,
    /// Dates and times.
    Temporal,
    /// Everything else.
    Other,
}

/// Rust types with a natural SQL type.
///
/// Used by `#[derive(Table)]` to type generated columns.
pub trait SqlType {
    /// The SQL type of the Rust type.
    fn data_type() -> DataType;

    /// Whether the Rust type admits NULL.
    const NULLABLE: bool = false;
}

macro_rules! impl_sql_type {
    ($($ty:ty => $data_type:expr),+ $(,)?) => {
        $(
            impl SqlType for $ty {
                fn data_type() -> DataType {
                    $data_type
                }
            }
        )+
    };
}

impl_sql_type!(
    i16 => DataType::Smallint,
    i32 => DataType::Integer,
    i64 => DataType::Bigint,
    u8 => DataType::Smallint,
    u16 => DataType::Integer,
    u32 => DataType::Bigint,
    f32 => DataType::Real,
    f64 => DataType::Double,
    bool => DataType::Boolean,
    String => DataType::Varchar(None),
    Vec<u8> => DataType::Blob,
);

impl<T: SqlType> SqlType for Option<T> {
    fn data_type() -> DataType {
        T::data_type()
    }

    const NULLABLE: bool = true;
}
