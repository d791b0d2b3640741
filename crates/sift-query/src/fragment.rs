//! Parameterized SQL fragments.
//!
//! A [`Fragment`] pairs a SQL snippet with its bound parameters. Inside
//! fragments every parameter is a `?`; [`number_placeholders`] rewrites
//! them to `$1..$N` once, left to right, when the full statement is
//! assembled. That single pass keeps parameter numbering deterministic no
//! matter how fragments were composed.

use sift_schema::Value;

/// A SQL snippet with `?` placeholders and the values bound to them, in
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub sql: String,
    pub params: Vec<Value>,
    /// Whether the snippet contains a top-level connector and needs
    /// parentheses when embedded in another connective.
    compound: bool,
}

impl Fragment {
    /// An atomic predicate fragment.
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
            compound: false,
        }
    }

    /// A fragment that must be parenthesized when embedded.
    pub fn compound(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
            compound: true,
        }
    }

    /// The snippet wrapped in parentheses if it needs them.
    fn embeddable(&self) -> String {
        if self.compound {
            format!("({})", self.sql)
        } else {
            self.sql.clone()
        }
    }

    /// Negate the fragment: `NOT (inner)`.
    pub fn negate(self) -> Fragment {
        Fragment {
            sql: format!("NOT ({})", self.sql),
            params: self.params,
            compound: false,
        }
    }

    /// Join fragments with `AND`. Returns `None` for an empty input and
    /// the fragment itself for a singleton.
    pub fn and_join(fragments: Vec<Fragment>) -> Option<Fragment> {
        Self::join(fragments, " AND ")
    }

    /// Join fragments with `OR`.
    pub fn or_join(fragments: Vec<Fragment>) -> Option<Fragment> {
        Self::join(fragments, " OR ")
    }

    fn join(mut fragments: Vec<Fragment>, sep: &str) -> Option<Fragment> {
        match fragments.len() {
            0 => None,
            1 => Some(fragments.remove(0)),
            _ => {
                let sql = fragments
                    .iter()
                    .map(Fragment::embeddable)
                    .collect::<Vec<_>>()
                    .join(sep);
                let params = fragments.into_iter().flat_map(|f| f.params).collect();
                Some(Fragment {
                    sql,
                    params,
                    compound: true,
                })
            }
        }
    }
}

/// Rewrite every `?` placeholder to `$N`, numbering from `start`.
/// Returns the rewritten SQL and the next unused index.
pub fn number_placeholders(sql: &str, start: usize) -> (String, usize) {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut next = start;
    for c in sql.chars() {
        if c == '?' {
            out.push('$');
            out.push_str(&next.to_string());
            next += 1;
        } else {
            out.push(c);
        }
    }
    (out, next)
}

/// Double-quote a SQL identifier, escaping embedded quotes by doubling.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quote a SQL string literal, escaping embedded quotes by
/// doubling. Used for text search configuration names, never for user
/// values (those are always bound parameters).
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// A table-qualified column reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// The quoted `"table"."column"` form.
    pub fn sql(&self) -> String {
        format!("{}.{}", quote_ident(&self.table), quote_ident(&self.column))
    }
}
