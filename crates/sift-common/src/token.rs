use serde::Serialize;

use crate::span::Span;

/// A token produced by the sift lexer.
///
/// `literal` carries the decoded value where one exists: the unescaped
/// contents of a quoted string, the snake-case-normalized form of a field
/// identifier, or the canonical connector word for `AND`/`OR` (including
/// the ones the lexer inserts for bare whitespace). Tokens whose meaning
/// is fully captured by their kind (operators, parens, commas) carry no
/// literal. `quoted` distinguishes `'live'` from `live`; the distinction
/// matters for wildcard and `NULL` handling downstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub literal: Option<String>,
    pub quoted: bool,
}

impl Token {
    /// Create a token with no decoded literal.
    pub fn new(kind: TokenKind, start: u32, end: u32) -> Self {
        Self {
            kind,
            span: Span::new(start, end),
            literal: None,
            quoted: false,
        }
    }

    /// Create a token carrying a decoded literal.
    pub fn with_literal(kind: TokenKind, start: u32, end: u32, literal: impl Into<String>) -> Self {
        Self {
            kind,
            span: Span::new(start, end),
            literal: Some(literal.into()),
            quoted: false,
        }
    }

    /// Mark the token as originating from a quoted string.
    pub fn quoted(mut self) -> Self {
        self.quoted = true;
        self
    }

    /// The exact source substring this token covers.
    pub fn lexeme<'src>(&self, source: &'src str) -> &'src str {
        &source[self.span.start as usize..self.span.end as usize]
    }

    /// The decoded literal, or the empty string when the token has none.
    pub fn literal_str(&self) -> &str {
        self.literal.as_deref().unwrap_or("")
    }

    /// Whether this token ends a term: a value or a closing paren.
    ///
    /// Only after such a token may a connector (or an implicit `AND`)
    /// legally follow.
    pub fn ends_term(&self) -> bool {
        matches!(self.kind, TokenKind::StringValue | TokenKind::RParen)
    }
}

/// Every kind of token in the sift filter grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    /// A value: a bare word, or a quoted string (see [`Token::quoted`]).
    StringValue,
    /// A dotted field path in predicate position, e.g. `author.name`.
    FieldIdent,

    // ── Comparators (glued to the field identifier) ────────────────────
    /// `:`
    Eq,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,

    // ── Set operators ──────────────────────────────────────────────────
    /// `IN`
    In,
    /// `NOT IN`
    NotIn,
    /// `ALL`
    All,

    // ── Connectors and negation ────────────────────────────────────────
    /// `AND`, or the implicit conjunction inserted for bare whitespace.
    And,
    /// `OR`
    Or,
    /// `NOT` or a leading `-`.
    Not,

    // ── Punctuation ────────────────────────────────────────────────────
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,

    /// End of input. Always the last token of a stream.
    Eof,
}

impl TokenKind {
    /// Human-readable name used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::StringValue => "value",
            TokenKind::FieldIdent => "field",
            TokenKind::Eq => "':'",
            TokenKind::Lt => "'<'",
            TokenKind::Lte => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::Gte => "'>='",
            TokenKind::In => "'IN'",
            TokenKind::NotIn => "'NOT IN'",
            TokenKind::All => "'ALL'",
            TokenKind::And => "'AND'",
            TokenKind::Or => "'OR'",
            TokenKind::Not => "'NOT'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Comma => "','",
            TokenKind::Eof => "end of input",
        }
    }

    /// Whether this kind is a comparison operator.
    pub fn is_comparator(&self) -> bool {
        matches!(
            self,
            TokenKind::Eq | TokenKind::Lt | TokenKind::Lte | TokenKind::Gt | TokenKind::Gte
        )
    }

    /// Whether this kind is a set operator.
    pub fn is_set_op(&self) -> bool {
        matches!(self, TokenKind::In | TokenKind::NotIn | TokenKind::All)
    }

    /// Whether this kind is a boolean connector.
    pub fn is_connector(&self) -> bool {
        matches!(self, TokenKind::And | TokenKind::Or)
    }
}
