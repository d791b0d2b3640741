//! Full-text term compilation: sanitizers and the three search
//! strategies.

use sift_schema::Value;

use crate::fragment::{quote_literal, ColumnRef, Fragment};
use crate::meta::Dir;
use crate::options::{SearchStrategy, TsQueryMode};
use crate::predicate::ilike_contains;

const MAX_TERM_BYTES: usize = 100;
const MAX_RAW_TOKENS: usize = 10;
const MAX_KEPT_TOKENS: usize = 5;
const MIN_TOKEN_LEN: usize = 2;

/// The basic sanitizer used with `plainto_tsquery` (and ILIKE): trim,
/// collapse whitespace runs to single spaces, truncate to 100 bytes.
pub fn sanitize_basic(term: &str) -> String {
    let collapsed = term.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_bytes(&collapsed, MAX_TERM_BYTES)
}

/// The strict sanitizer used with raw `to_tsquery`: trim, truncate,
/// tokenize, strip each token to alphanumerics, drop short tokens, keep
/// at most five, and emit a prefix-matching AND query (`tok:* & tok:*`).
pub fn sanitize_strict(term: &str) -> String {
    let trimmed = truncate_bytes(term.trim(), MAX_TERM_BYTES);
    trimmed
        .split_whitespace()
        .take(MAX_RAW_TOKENS)
        .map(|token| {
            token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|token| token.len() >= MIN_TOKEN_LEN)
        .take(MAX_KEPT_TOKENS)
        .map(|token| format!("{token}:*"))
        .collect::<Vec<_>>()
        .join(" & ")
}

/// Truncate to at most `max` bytes without splitting a character.
fn truncate_bytes(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// The compiled contribution of one full-text term.
#[derive(Debug)]
pub struct FullTextPlan {
    pub predicate: Option<Fragment>,
    /// `(alias, rank expression)` exported for the `Column` strategy.
    pub select_add: Option<(String, Fragment)>,
    pub recommended_order: Option<(String, Dir)>,
}

impl FullTextPlan {
    fn empty() -> Self {
        Self {
            predicate: None,
            select_add: None,
            recommended_order: None,
        }
    }
}

fn tsquery_fn(mode: TsQueryMode) -> &'static str {
    match mode {
        TsQueryMode::Plainto => "plainto_tsquery",
        TsQueryMode::Raw => "to_tsquery",
    }
}

/// Compile one already-sanitized term under the given strategy.
///
/// `columns` are the resolved search field columns (empty for the
/// `Column` strategy, which targets its own tsvector column on the root
/// table). An empty term or no applicable columns produce no predicate.
pub fn plan(
    term: &str,
    columns: &[ColumnRef],
    strategy: &SearchStrategy,
    mode: TsQueryMode,
    root_table: &str,
) -> FullTextPlan {
    if term.is_empty() {
        return FullTextPlan::empty();
    }

    match strategy {
        SearchStrategy::ILike => {
            let branches: Vec<Fragment> =
                columns.iter().map(|col| ilike_contains(col, term)).collect();
            FullTextPlan {
                predicate: Fragment::or_join(branches),
                select_add: None,
                recommended_order: None,
            }
        }
        SearchStrategy::TsQuery { config } => {
            let cfg = quote_literal(config);
            let func = tsquery_fn(mode);
            let branches: Vec<Fragment> = columns
                .iter()
                .map(|col| {
                    Fragment::new(
                        format!(
                            "to_tsvector({cfg}, coalesce({}, '')) @@ {func}({cfg}, ?)",
                            col.sql()
                        ),
                        vec![Value::String(term.to_string())],
                    )
                })
                .collect();
            FullTextPlan {
                predicate: Fragment::or_join(branches),
                select_add: None,
                recommended_order: None,
            }
        }
        SearchStrategy::Column { config, column } => {
            let cfg = quote_literal(config);
            let func = tsquery_fn(mode);
            let col = ColumnRef::new(root_table, column.clone());
            let predicate = Fragment::new(
                format!("{} @@ {func}({cfg}, ?)", col.sql()),
                vec![Value::String(term.to_string())],
            );
            let rank = Fragment::new(
                format!("ts_rank_cd({}, {func}({cfg}, ?), 4)", col.sql()),
                vec![Value::String(term.to_string())],
            );
            FullTextPlan {
                predicate: Some(predicate),
                select_add: Some(("search_rank".to_string(), rank)),
                recommended_order: Some(("search_rank".to_string(), Dir::Desc)),
            }
        }
    }
}
