//! Planning metadata returned alongside the compiled query.

use std::fmt;

use serde::Serialize;

/// Sort direction for [`Meta::recommended_order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dir {
    Asc,
    Desc,
}

/// Auxiliary facts about a compile the host may act on.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Meta {
    /// Whether any full-text predicate made it into the query.
    pub uses_full_text: bool,
    /// Aliases of expressions the compiler added to the select list
    /// (e.g. `search_rank` for the column search strategy).
    pub added_select_fields: Vec<String>,
    /// Ordering the compiler recommends (rank-descending for column
    /// search); advisory, never applied by the compiler itself.
    pub recommended_order: Option<Vec<(String, Dir)>>,
    /// Predicates dropped under `Warn` policies, and other degradations.
    pub warnings: Vec<Warning>,
}

/// A non-fatal compile degradation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A predicate was dropped because its path is outside the
    /// allow-list or the schema.
    UnknownField { path: String },
    /// A predicate was dropped because its association step is not
    /// declared.
    UnknownAssoc { name: String },
    /// A predicate was dropped because its literal does not cast to the
    /// field's type.
    InvalidCast { field: String, value: String },
    /// `ALL` on a scalar column was lowered to plain `IN`.
    DegradedContainsAll { field: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnknownField { path } => {
                write!(f, "dropped predicate on unknown field '{path}'")
            }
            Warning::UnknownAssoc { name } => {
                write!(f, "dropped predicate on unknown association '{name}'")
            }
            Warning::InvalidCast { field, value } => {
                write!(f, "dropped predicate: '{value}' is not valid for '{field}'")
            }
            Warning::DegradedContainsAll { field } => {
                write!(f, "ALL on scalar field '{field}' degraded to IN")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_display() {
        let warning = Warning::UnknownField {
            path: "secret".into(),
        };
        assert_eq!(
            warning.to_string(),
            "dropped predicate on unknown field 'secret'"
        );

        let warning = Warning::InvalidCast {
            field: "priority".into(),
            value: "high".into(),
        };
        assert_eq!(
            warning.to_string(),
            "dropped predicate: 'high' is not valid for 'priority'"
        );
    }
}
