//! Lowering of individual comparison predicates to SQL fragments.
//!
//! Everything here is a pure function from a column reference, an
//! operator, and coerced values to a [`Fragment`]. NULL-awareness for set
//! membership and the date-only range expansion live here; path and type
//! resolution happen in the builder before these are called.

use sift_parser::CmpOp;
use sift_schema::{FieldType, Value};

use crate::fragment::{ColumnRef, Fragment};

/// Escape a literal for use inside a LIKE/ILIKE pattern.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn sql_op(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "=",
        CmpOp::Neq => "!=",
        CmpOp::Gt => ">",
        CmpOp::Gte => ">=",
        CmpOp::Lt => "<",
        CmpOp::Lte => "<=",
        // Set and pattern operators never reach the binary form.
        _ => unreachable!("no binary SQL operator for {op:?}"),
    }
}

/// `col op ?` with one bound parameter.
pub fn scalar(col: &ColumnRef, op: CmpOp, value: Value) -> Fragment {
    Fragment::new(format!("{} {} ?", col.sql(), sql_op(op)), vec![value])
}

pub fn is_null(col: &ColumnRef) -> Fragment {
    Fragment::new(format!("{} IS NULL", col.sql()), vec![])
}

pub fn is_not_null(col: &ColumnRef) -> Fragment {
    Fragment::new(format!("{} IS NOT NULL", col.sql()), vec![])
}

/// Case-insensitive prefix or suffix match. The wildcard placement came
/// from the query (`Bea*` or `*son`); the base string is escaped so `%`,
/// `_`, and `\` match literally.
pub fn like(col: &ColumnRef, op: CmpOp, base: &str) -> Fragment {
    let pattern = match op {
        CmpOp::StartsWith => format!("{}%", escape_like(base)),
        CmpOp::EndsWith => format!("%{}", escape_like(base)),
        _ => unreachable!("like() only handles StartsWith/EndsWith"),
    };
    Fragment::new(
        format!("{} ILIKE ?", col.sql()),
        vec![Value::String(pattern)],
    )
}

/// Case-insensitive substring match used by the ILIKE search strategy.
pub fn ilike_contains(col: &ColumnRef, term: &str) -> Fragment {
    Fragment::new(
        format!("{} ILIKE ?", col.sql()),
        vec![Value::String(format!("%{}%", escape_like(term)))],
    )
}

/// NULL-aware set membership.
///
/// A `NULL` in the list cannot match through `IN`, so it becomes an
/// explicit `IS NULL` disjunct (or the `IS NOT NULL` conjunct for the
/// negated form). `values` holds the non-null members.
pub fn in_list(col: &ColumnRef, values: Vec<Value>, has_null: bool, negated: bool) -> Fragment {
    let placeholders = vec!["?"; values.len()].join(", ");

    match (negated, has_null, values.is_empty()) {
        (false, false, _) => Fragment::new(
            format!("{} IN ({placeholders})", col.sql()),
            values,
        ),
        (false, true, true) => is_null(col),
        (false, true, false) => Fragment::compound(
            format!("{} IN ({placeholders}) OR {} IS NULL", col.sql(), col.sql()),
            values,
        ),
        (true, false, _) => Fragment::new(
            format!("{} NOT IN ({placeholders})", col.sql()),
            values,
        ),
        (true, true, true) => is_not_null(col),
        (true, true, false) => Fragment::compound(
            format!(
                "{} NOT IN ({placeholders}) AND {} IS NOT NULL",
                col.sql(),
                col.sql()
            ),
            values,
        ),
    }
}

/// The date-only expansion for ordered comparisons against a datetime
/// column: a pure date on the right-hand side means the whole day.
///
/// `start` is midnight of the date, `next` midnight of the following day.
pub fn date_only(col: &ColumnRef, op: CmpOp, start: Value, next: Value) -> Fragment {
    match op {
        CmpOp::Eq => Fragment::compound(
            format!("{} >= ? AND {} < ?", col.sql(), col.sql()),
            vec![start, next],
        ),
        CmpOp::Gte => Fragment::new(format!("{} >= ?", col.sql()), vec![start]),
        CmpOp::Gt => Fragment::new(format!("{} >= ?", col.sql()), vec![next]),
        CmpOp::Lte => Fragment::new(format!("{} < ?", col.sql()), vec![next]),
        CmpOp::Lt => Fragment::new(format!("{} < ?", col.sql()), vec![start]),
        _ => unreachable!("date_only only handles Eq and ordered operators"),
    }
}

/// Array containment: `col @> ARRAY[?, ?]::elem[]`.
pub fn contains_all_array(col: &ColumnRef, element: &FieldType, values: Vec<Value>) -> Fragment {
    let placeholders = vec!["?"; values.len()].join(", ");
    Fragment::new(
        format!(
            "{} @> ARRAY[{placeholders}]::{}[]",
            col.sql(),
            element.sql_name()
        ),
        values,
    )
}

/// The HAVING side of an association contains-all plan:
/// `count(DISTINCT col) = N`.
pub fn count_distinct_eq(col: &ColumnRef, n: i64) -> Fragment {
    Fragment::new(
        format!("count(DISTINCT {}) = ?", col.sql()),
        vec![Value::Integer(n)],
    )
}
