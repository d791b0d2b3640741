use serde::{Deserialize, Serialize};

/// The declared type of a schema field.
///
/// Mirrors the column types the compiler can cast literals into. Datetime
/// types come in second and microsecond precision; `Array` wraps its
/// element type for Postgres array columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Text,
    Integer,
    Float,
    Decimal,
    Bool,
    Date,
    UtcDateTime,
    UtcDateTimeUsec,
    NaiveDateTime,
    NaiveDateTimeUsec,
    Array(Box<FieldType>),
}

impl FieldType {
    /// Whether this is one of the four datetime types (not `Date`).
    pub fn is_datetime(&self) -> bool {
        matches!(
            self,
            FieldType::UtcDateTime
                | FieldType::UtcDateTimeUsec
                | FieldType::NaiveDateTime
                | FieldType::NaiveDateTimeUsec
        )
    }

    /// Whether values of this type live in UTC.
    pub fn is_utc(&self) -> bool {
        matches!(self, FieldType::UtcDateTime | FieldType::UtcDateTimeUsec)
    }

    /// Whether this type holds free text usable for LIKE matching.
    pub fn is_textual(&self) -> bool {
        matches!(self, FieldType::String | FieldType::Text)
    }

    /// The element type for arrays, `None` otherwise.
    pub fn element(&self) -> Option<&FieldType> {
        match self {
            FieldType::Array(inner) => Some(inner),
            _ => None,
        }
    }

    /// The SQL type name used when casting array literals.
    pub fn sql_name(&self) -> &'static str {
        match self {
            FieldType::String | FieldType::Text => "text",
            FieldType::Integer => "bigint",
            FieldType::Float => "double precision",
            FieldType::Decimal => "numeric",
            FieldType::Bool => "boolean",
            FieldType::Date => "date",
            FieldType::UtcDateTime | FieldType::UtcDateTimeUsec => "timestamptz",
            FieldType::NaiveDateTime | FieldType::NaiveDateTimeUsec => "timestamp",
            FieldType::Array(_) => "array",
        }
    }
}
