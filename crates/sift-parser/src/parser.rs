//! Precedence-climbing parser for filter expressions.
//!
//! Consumes the token stream produced by `sift-lexer` and builds the typed
//! [`Node`] tree. `AND` binds tighter than `OR`; both are left-associative
//! and flattened on construction. `NOT` is a prefix that binds to the
//! immediately following term.

use sift_common::error::{Error, ErrorKind};
use sift_common::token::{Token, TokenKind};

use crate::ast::{Cmp, CmpOp, CmpValue, Node, RawValue};

/// Returns (left_bp, right_bp) for the boolean connectors.
///
/// Left < right means left-associative. `AND` out-binds `OR`, so
/// `a OR b AND c` parses as `a OR (b AND c)`.
fn infix_binding_power(op: TokenKind) -> Option<(u8, u8)> {
    match op {
        TokenKind::Or => Some((10, 11)),
        TokenKind::And => Some((20, 21)),
        _ => None,
    }
}

pub(crate) struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'src str,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(tokens: Vec<Token>, source: &'src str) -> Self {
        Self {
            tokens,
            pos: 0,
            source,
        }
    }

    /// Parse a complete expression. An empty stream yields `And([])`.
    pub(crate) fn parse_root(mut self) -> Result<Node, Error> {
        if self.at(TokenKind::Eof) {
            return Ok(Node::And(Vec::new()));
        }

        let node = self.expr_bp(0)?;

        match self.current().kind {
            TokenKind::Eof => Ok(node),
            TokenKind::Comma => Err(self.error_here(ErrorKind::StrayComma)),
            kind => Err(self.error_here(ErrorKind::UnexpectedToken(kind.describe().into()))),
        }
    }

    // ── Lookahead ──────────────────────────────────────────────────────

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error_here(&self, kind: ErrorKind) -> Error {
        Error::parse(kind, self.current().span)
    }

    // ── Expressions ────────────────────────────────────────────────────

    /// The precedence-climbing loop: parse a prefix term, then keep
    /// consuming connectors whose binding power reaches `min_bp`.
    fn expr_bp(&mut self, min_bp: u8) -> Result<Node, Error> {
        let mut lhs = self.prefix()?;

        loop {
            let op_kind = self.current().kind;
            let Some((l_bp, _r_bp)) = infix_binding_power(op_kind) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }

            let op_token = self.advance();
            let op_word = if op_kind == TokenKind::And { "AND" } else { "OR" };

            match self.current().kind {
                TokenKind::Eof => {
                    return Err(Error::parse(
                        ErrorKind::UnexpectedEofAfterOperator(op_word.into()),
                        op_token.span,
                    ));
                }
                TokenKind::RParen => {
                    return Err(self
                        .error_here(ErrorKind::OperatorBeforeRightParen(op_word.into())));
                }
                _ => {}
            }

            let rhs = self.expr_bp(infix_binding_power(op_kind).unwrap().1)?;
            lhs = match op_kind {
                TokenKind::And => Node::and(lhs, rhs),
                _ => Node::or(lhs, rhs),
            };
        }

        Ok(lhs)
    }

    /// Parse one prefix term: a group, a negation, a predicate, or a
    /// full-text value.
    fn prefix(&mut self) -> Result<Node, Error> {
        match self.current().kind {
            TokenKind::LParen => {
                let open_span = self.current().span;
                self.advance();

                if self.at(TokenKind::RParen) {
                    return Err(Error::parse(ErrorKind::EmptyGroup, open_span));
                }

                let inner = self.expr_bp(0)?;

                if !self.at(TokenKind::RParen) {
                    return Err(Error::parse(ErrorKind::MissingRightParen, open_span));
                }
                self.advance();
                Ok(inner)
            }
            TokenKind::Not => {
                let not_span = self.current().span;
                self.advance();
                if self.at(TokenKind::Eof) {
                    return Err(Error::parse(ErrorKind::NotWithoutTerm, not_span));
                }
                let inner = self.prefix()?;
                Ok(Node::Not(Box::new(inner)))
            }
            TokenKind::FieldIdent => self.predicate(),
            TokenKind::StringValue => {
                let token = self.advance();
                Ok(Node::FullText {
                    term: token.literal.unwrap_or_default(),
                })
            }
            TokenKind::Comma => Err(self.error_here(ErrorKind::StrayComma)),
            kind => {
                let lexeme = self.current().lexeme(self.source).to_string();
                if lexeme.is_empty() {
                    Err(self.error_here(ErrorKind::UnexpectedToken(kind.describe().into())))
                } else {
                    Err(self.error_here(ErrorKind::UnrecognizedToken(lexeme)))
                }
            }
        }
    }

    // ── Predicates ─────────────────────────────────────────────────────

    /// Parse a predicate after a field identifier: a comparator with a
    /// single value, or a set operator with a parenthesized list.
    fn predicate(&mut self) -> Result<Node, Error> {
        let field_token = self.advance();
        let path: Vec<String> = field_token
            .literal_str()
            .split('.')
            .map(str::to_string)
            .collect();

        let op_kind = self.current().kind;
        if op_kind.is_comparator() {
            let op_token = self.advance();
            let value_token = self.expect_rhs(&op_token)?;

            return if op_kind == TokenKind::Eq {
                let (op, value) = classify_eq_value(&value_token)?;
                Ok(Node::Cmp(Cmp { path, op, value }))
            } else {
                let op = match op_kind {
                    TokenKind::Lt => CmpOp::Lt,
                    TokenKind::Lte => CmpOp::Lte,
                    TokenKind::Gt => CmpOp::Gt,
                    _ => CmpOp::Gte,
                };
                if !value_token.quoted && value_token.literal_str().contains('*') {
                    return Err(Error::parse(
                        ErrorKind::WildcardNotAllowedForRelop,
                        value_token.span,
                    ));
                }
                let value = raw_value(&value_token);
                Ok(Node::Cmp(Cmp {
                    path,
                    op,
                    value: CmpValue::Single(value),
                }))
            };
        }

        if op_kind.is_set_op() {
            let op_token = self.advance();
            let op_word = match op_kind {
                TokenKind::In => "IN",
                TokenKind::NotIn => "NOT IN",
                _ => "ALL",
            };

            if !self.at(TokenKind::LParen) {
                return Err(Error::parse(
                    ErrorKind::ExpectedListAfterSetOperator(op_word.into()),
                    op_token.span,
                ));
            }

            let items = self.list()?;
            let op = match op_kind {
                TokenKind::In => CmpOp::In,
                TokenKind::NotIn => CmpOp::Nin,
                _ => CmpOp::ContainsAll,
            };
            return Ok(Node::Cmp(Cmp {
                path,
                op,
                value: CmpValue::List(items),
            }));
        }

        // The lexer only emits a field identifier when an operator
        // follows, so this is unreachable for its token streams.
        Err(self.error_here(ErrorKind::UnexpectedToken(op_kind.describe().into())))
    }

    /// The value directly after a comparator.
    fn expect_rhs(&mut self, op_token: &Token) -> Result<Token, Error> {
        match self.current().kind {
            TokenKind::StringValue => Ok(self.advance()),
            TokenKind::Eof => Err(Error::parse(
                ErrorKind::MissingRhs(op_token.lexeme(self.source).to_string()),
                op_token.span,
            )),
            TokenKind::LParen => Err(Error::parse(
                ErrorKind::ListNotAllowedForColonOp,
                self.current().span,
            )),
            kind => Err(self.error_here(ErrorKind::UnexpectedToken(kind.describe().into()))),
        }
    }

    /// Parse `( item (, item)* )` for a set operator.
    fn list(&mut self) -> Result<Vec<RawValue>, Error> {
        let open_span = self.current().span;
        self.advance();

        if self.at(TokenKind::RParen) {
            return Err(Error::parse(ErrorKind::EmptyList, open_span));
        }

        let mut items = Vec::new();
        loop {
            match self.current().kind {
                TokenKind::StringValue => {
                    let token = self.advance();
                    if !token.quoted && token.literal_str().contains('*') {
                        return Err(Error::parse(
                            ErrorKind::WildcardNotAllowedInList,
                            token.span,
                        ));
                    }
                    items.push(raw_value(&token));
                }
                TokenKind::Eof => {
                    return Err(Error::parse(ErrorKind::MissingRightParen, open_span));
                }
                kind => {
                    return Err(self.error_here(ErrorKind::UnexpectedToken(
                        kind.describe().into(),
                    )));
                }
            }

            match self.current().kind {
                TokenKind::Comma => {
                    let comma_span = self.current().span;
                    self.advance();
                    if self.at(TokenKind::RParen) {
                        return Err(Error::parse(
                            ErrorKind::TrailingCommaInList,
                            comma_span,
                        ));
                    }
                }
                TokenKind::RParen => {
                    self.advance();
                    return Ok(items);
                }
                // Adjacent values lex as an implicit conjunction; inside a
                // list that means the comma was forgotten.
                TokenKind::And | TokenKind::StringValue => {
                    return Err(self.error_here(ErrorKind::MissingCommaInList));
                }
                TokenKind::Eof => {
                    return Err(Error::parse(ErrorKind::MissingRightParen, open_span));
                }
                kind => {
                    return Err(self.error_here(ErrorKind::UnexpectedToken(
                        kind.describe().into(),
                    )));
                }
            }
        }
    }
}

/// Interpret a token as a list/relational value: unquoted `NULL` is SQL
/// null, everything else is its decoded string.
fn raw_value(token: &Token) -> RawValue {
    if !token.quoted && token.literal_str() == "NULL" {
        RawValue::Null
    } else {
        RawValue::Str(token.literal_str().to_string())
    }
}

/// Value classification for `:`. Quoted values are always plain equality;
/// a single leading or trailing `*` on an unquoted value selects suffix or
/// prefix matching; `*` anywhere else is rejected.
fn classify_eq_value(token: &Token) -> Result<(CmpOp, CmpValue), Error> {
    let literal = token.literal_str();

    if token.quoted {
        return Ok((
            CmpOp::Eq,
            CmpValue::Single(RawValue::Str(literal.to_string())),
        ));
    }
    if literal == "NULL" {
        return Ok((CmpOp::Eq, CmpValue::Single(RawValue::Null)));
    }

    let stars = literal.matches('*').count();
    if stars == 0 {
        return Ok((
            CmpOp::Eq,
            CmpValue::Single(RawValue::Str(literal.to_string())),
        ));
    }
    if stars == 1 && literal.len() > 1 {
        if let Some(base) = literal.strip_prefix('*') {
            return Ok((
                CmpOp::EndsWith,
                CmpValue::Single(RawValue::Str(base.to_string())),
            ));
        }
        if let Some(base) = literal.strip_suffix('*') {
            return Ok((
                CmpOp::StartsWith,
                CmpValue::Single(RawValue::Str(base.to_string())),
            ));
        }
    }

    Err(Error::parse(
        ErrorKind::InvalidWildcardPosition(literal.to_string()),
        token.span,
    ))
}
