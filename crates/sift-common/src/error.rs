use std::fmt;

use serde::Serialize;

use crate::span::Span;

/// The pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Lex,
    Parse,
    Build,
}

/// A compile error from any stage of the pipeline.
///
/// Lex and parse errors always carry a span pointing at the offending
/// bytes. Build errors refer to resolved fields rather than source bytes
/// and usually carry the span of the predicate they came from when one is
/// available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Error {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub span: Option<Span>,
}

impl Error {
    /// Create a lexer error at the given span.
    pub fn lex(kind: ErrorKind, span: Span) -> Self {
        Self {
            stage: Stage::Lex,
            kind,
            span: Some(span),
        }
    }

    /// Create a parser error at the given span.
    pub fn parse(kind: ErrorKind, span: Span) -> Self {
        Self {
            stage: Stage::Parse,
            kind,
            span: Some(span),
        }
    }

    /// Create a builder error with no source location.
    pub fn build(kind: ErrorKind) -> Self {
        Self {
            stage: Stage::Build,
            kind,
            span: None,
        }
    }

    /// Create a builder error anchored to a source span.
    pub fn build_at(kind: ErrorKind, span: Span) -> Self {
        Self {
            stage: Stage::Build,
            kind,
            span: Some(span),
        }
    }

    /// Byte offset reported in the human-readable message.
    pub fn position(&self) -> Option<u32> {
        self.span.map(|s| s.start)
    }
}

/// The specific kind of compile error.
///
/// Variants carry whatever the human-readable message needs: the offending
/// operator or value text, or the resolved field path for build errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ErrorKind {
    // ── Lex ────────────────────────────────────────────────────────────
    /// A quoted string was not closed before end of input.
    UnterminatedString,
    /// An operator the grammar does not know, such as a bare `=`.
    InvalidComparator(String),
    /// An operator split by whitespace, such as `< =`.
    BrokenOperator(String),
    /// A byte no lexeme can start with.
    UnexpectedChar(char),
    /// A field path with a trailing dot or a dot not followed by a name.
    InvalidField(String),
    /// Whitespace between a field and its operator, or between an
    /// operator and its value.
    InvalidPredicateSpacing,

    // ── Parse ──────────────────────────────────────────────────────────
    /// A token that cannot start a term.
    UnrecognizedToken(String),
    /// A token that is valid elsewhere but not here.
    UnexpectedToken(String),
    /// `AND`/`OR` at end of input.
    UnexpectedEofAfterOperator(String),
    /// A comparator with no right-hand side.
    MissingRhs(String),
    /// An unclosed group; the span points at the opening parenthesis.
    MissingRightParen,
    /// `()` with nothing inside.
    EmptyGroup,
    /// `)` directly after a connector.
    OperatorBeforeRightParen(String),
    /// A set operator not followed by a parenthesized list.
    ExpectedListAfterSetOperator(String),
    /// `IN ()` and friends.
    EmptyList,
    /// A comma directly before the closing paren of a list.
    TrailingCommaInList,
    /// Two list items with no comma between them.
    MissingCommaInList,
    /// A parenthesized list on the right of `:`.
    ListNotAllowedForColonOp,
    /// `*` somewhere other than the first or last byte of a value.
    InvalidWildcardPosition(String),
    /// `*` in the value of a relational comparison.
    WildcardNotAllowedForRelop,
    /// `*` in an unquoted list item.
    WildcardNotAllowedInList,
    /// `NOT` with nothing to negate.
    NotWithoutTerm,
    /// A comma outside any list.
    StrayComma,

    // ── Build ──────────────────────────────────────────────────────────
    /// A root schema id the schema view does not know.
    UnknownSchema(String),
    /// A field path outside the allow-list or the schema.
    UnknownField(String),
    /// An association step the schema does not declare.
    UnknownAssoc(String),
    /// A literal that cannot be cast to the field's type.
    InvalidValue { field: String, value: String },
    /// `NULL` used with `<`, `<=`, `>`, or `>=`.
    InvalidNullComparison(String),
    /// More association hops than `max_joins` allows.
    TooManyJoins,
    /// An `IN` list that became empty at lowering time, under the
    /// `empty_in: Error` policy.
    EmptyInList(String),
    /// `ALL` predicates spanning more than one association.
    MultiAssocContainsAll,
    /// A predicate shape that cannot be negated soundly.
    UnsupportedNegation(String),
    /// A full-text strategy that is not usable as configured.
    SearchMisconfigured(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pos = self.position().unwrap_or(0);
        match &self.kind {
            ErrorKind::UnterminatedString => {
                write!(f, "Unterminated string at position {pos}")
            }
            ErrorKind::InvalidComparator(op) => {
                write!(f, "Invalid operator '{op}' at position {pos}")
            }
            ErrorKind::BrokenOperator(op) => {
                write!(
                    f,
                    "Broken operator '{op}' at position {pos}. Remove the space inside the operator."
                )
            }
            ErrorKind::UnexpectedChar(c) => {
                write!(f, "Unexpected character '{c}' at position {pos}")
            }
            ErrorKind::InvalidField(field) => {
                write!(f, "Invalid field '{field}' at position {pos}")
            }
            ErrorKind::InvalidPredicateSpacing => {
                write!(
                    f,
                    "Unexpected whitespace at position {pos}. Operators must not be separated from their field or value."
                )
            }
            ErrorKind::UnrecognizedToken(lexeme) => {
                write!(f, "Unrecognized token '{lexeme}' at position {pos}")
            }
            ErrorKind::UnexpectedToken(desc) => {
                write!(f, "Unexpected {desc} at position {pos}")
            }
            ErrorKind::UnexpectedEofAfterOperator(op) => {
                write!(
                    f,
                    "Expected expression after '{op}' at position {pos}. Operators must be followed by a value or field."
                )
            }
            ErrorKind::MissingRhs(op) => {
                write!(
                    f,
                    "Expected value after '{op}' at position {pos}. Comparisons must have a right-hand side."
                )
            }
            ErrorKind::MissingRightParen => {
                write!(
                    f,
                    "Missing closing parenthesis ')' for opening parenthesis at position {pos}"
                )
            }
            ErrorKind::EmptyGroup => {
                write!(
                    f,
                    "Empty group at position {pos}. Parentheses must contain an expression."
                )
            }
            ErrorKind::OperatorBeforeRightParen(op) => {
                write!(f, "Unexpected ')' after '{op}' at position {pos}")
            }
            ErrorKind::ExpectedListAfterSetOperator(op) => {
                write!(
                    f,
                    "Expected a parenthesized list after '{op}' at position {pos}"
                )
            }
            ErrorKind::EmptyList => {
                write!(
                    f,
                    "Empty list at position {pos}. Lists must contain at least one value."
                )
            }
            ErrorKind::TrailingCommaInList => {
                write!(
                    f,
                    "Trailing comma at position {pos}. Remove the comma after the last list item."
                )
            }
            ErrorKind::MissingCommaInList => {
                write!(f, "Missing comma between list items at position {pos}")
            }
            ErrorKind::ListNotAllowedForColonOp => {
                write!(
                    f,
                    "Lists are not allowed after ':' at position {pos}. Use IN instead."
                )
            }
            ErrorKind::InvalidWildcardPosition(value) => {
                write!(
                    f,
                    "Invalid wildcard position in '{value}' at position {pos}. '*' may only lead or trail a value."
                )
            }
            ErrorKind::WildcardNotAllowedForRelop => {
                write!(
                    f,
                    "Wildcards are not allowed with relational operators at position {pos}"
                )
            }
            ErrorKind::WildcardNotAllowedInList => {
                write!(f, "Wildcards are not allowed inside lists at position {pos}")
            }
            ErrorKind::NotWithoutTerm => {
                write!(f, "Expected expression after 'NOT' at position {pos}")
            }
            ErrorKind::StrayComma => {
                write!(
                    f,
                    "Unexpected ',' at position {pos}. Commas are only valid inside lists."
                )
            }
            ErrorKind::UnknownSchema(schema) => {
                write!(f, "Unknown schema '{schema}'")
            }
            ErrorKind::UnknownField(field) => {
                write!(f, "Unknown field '{field}'")
            }
            ErrorKind::UnknownAssoc(assoc) => {
                write!(f, "Unknown association '{assoc}'")
            }
            ErrorKind::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
            ErrorKind::InvalidNullComparison(field) => {
                write!(
                    f,
                    "NULL cannot be compared with an ordering operator on field '{field}'"
                )
            }
            ErrorKind::TooManyJoins => {
                write!(f, "Query requires more joins than allowed")
            }
            ErrorKind::EmptyInList(field) => {
                write!(f, "Empty IN list for field '{field}'")
            }
            ErrorKind::MultiAssocContainsAll => {
                write!(f, "ALL is supported on a single association per query")
            }
            ErrorKind::UnsupportedNegation(what) => {
                write!(f, "NOT is not supported over {what}")
            }
            ErrorKind::SearchMisconfigured(reason) => {
                write!(f, "Full-text search misconfigured: {reason}")
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unterminated_string_message() {
        let err = Error::lex(ErrorKind::UnterminatedString, Span::new(7, 21));
        assert_eq!(err.to_string(), "Unterminated string at position 7");
    }

    #[test]
    fn invalid_operator_message() {
        let err = Error::lex(ErrorKind::InvalidComparator("=".into()), Span::new(6, 7));
        assert_eq!(err.to_string(), "Invalid operator '=' at position 6");
    }

    #[test]
    fn missing_right_paren_points_at_opening() {
        let err = Error::parse(ErrorKind::MissingRightParen, Span::new(0, 1));
        assert_eq!(
            err.to_string(),
            "Missing closing parenthesis ')' for opening parenthesis at position 0"
        );
    }

    #[test]
    fn eof_after_operator_message() {
        let err = Error::parse(
            ErrorKind::UnexpectedEofAfterOperator("AND".into()),
            Span::new(12, 15),
        );
        assert_eq!(
            err.to_string(),
            "Expected expression after 'AND' at position 12. Operators must be followed by a value or field."
        );
    }

    #[test]
    fn list_shape_messages() {
        let empty = Error::parse(ErrorKind::EmptyList, Span::new(10, 11));
        assert_eq!(
            empty.to_string(),
            "Empty list at position 10. Lists must contain at least one value."
        );

        let trailing = Error::parse(ErrorKind::TrailingCommaInList, Span::new(22, 23));
        assert_eq!(
            trailing.to_string(),
            "Trailing comma at position 22. Remove the comma after the last list item."
        );
    }

    #[test]
    fn build_errors_have_no_position() {
        let err = Error::build(ErrorKind::UnknownField("organization.name".into()));
        assert_eq!(err.position(), None);
        assert_eq!(err.to_string(), "Unknown field 'organization.name'");
    }
}
