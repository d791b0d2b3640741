//! String-to-typed-value casting against declared field types.
//!
//! All literals arrive from the parser as strings; this module turns them
//! into [`Value`]s according to the schema. Date-only strings against
//! datetime columns get special handling: [`parse_date_only`] detects
//! them and [`day_bounds`] computes the half-open day range the predicate
//! compiler expands ordered comparisons into.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;

use crate::types::FieldType;
use crate::value::Value;

/// A literal that could not be cast to its field's declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct CastError {
    pub ty: FieldType,
    pub raw: String,
}

impl CastError {
    fn new(ty: &FieldType, raw: &str) -> Self {
        Self {
            ty: ty.clone(),
            raw: raw.to_string(),
        }
    }
}

impl fmt::Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot cast {:?} as {}", self.raw, self.ty.sql_name())
    }
}

impl std::error::Error for CastError {}

/// Cast a string literal to the given field type.
///
/// For array columns the literal casts against the element type; the
/// predicate compiler decides how the array itself is matched.
pub fn cast(ty: &FieldType, raw: &str) -> Result<Value, CastError> {
    match ty {
        FieldType::String | FieldType::Text => Ok(Value::String(raw.to_string())),
        FieldType::Integer => raw
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| CastError::new(ty, raw)),
        FieldType::Float => raw
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| CastError::new(ty, raw)),
        FieldType::Decimal => Decimal::from_str(raw)
            .map(Value::Decimal)
            .map_err(|_| CastError::new(ty, raw)),
        FieldType::Bool => match raw {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(CastError::new(ty, raw)),
        },
        FieldType::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|_| CastError::new(ty, raw)),
        FieldType::UtcDateTime | FieldType::UtcDateTimeUsec => parse_utc(raw)
            .map(Value::DateTime)
            .ok_or_else(|| CastError::new(ty, raw)),
        FieldType::NaiveDateTime | FieldType::NaiveDateTimeUsec => {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
                .map(Value::NaiveDateTime)
                .map_err(|_| CastError::new(ty, raw))
        }
        FieldType::Array(inner) => cast(inner, raw),
    }
}

fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // A naive ISO datetime is taken as UTC.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

/// Detect a pure date literal (`YYYY-MM-DD`, nothing more).
pub fn parse_date_only(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// The half-open day range `[start, next)` for a date against a datetime
/// column: midnight of the date and midnight of the following day, typed
/// to match the column.
pub fn day_bounds(ty: &FieldType, date: NaiveDate) -> (Value, Value) {
    let start = NaiveDateTime::new(date, NaiveTime::MIN);
    let next = start + Duration::days(1);
    if ty.is_utc() {
        (
            Value::DateTime(start.and_utc()),
            Value::DateTime(next.and_utc()),
        )
    } else {
        (Value::NaiveDateTime(start), Value::NaiveDateTime(next))
    }
}
