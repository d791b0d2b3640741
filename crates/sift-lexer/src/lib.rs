//! Tokenizer for sift filter expressions.
//!
//! Converts a filter expression such as `status:live AND org.name:Bea*`
//! into a stream of spanned tokens. The lexer owns every byte-level rule
//! of the grammar: quoted strings with backslash escapes, dotted field
//! paths glued to their comparison operator, uppercase keyword detection
//! (`AND`, `OR`, `NOT`, `IN`, `NOT IN`, `ALL`), negation markers, and the
//! implicit `AND` inserted when bare whitespace separates two terms.
//!
//! Every token carries a byte span into the source; the stream always ends
//! with exactly one `Eof` token. Errors abort lexing and point at the
//! offending bytes.

mod cursor;
mod normalize;

pub use normalize::normalize_path;

use cursor::Cursor;
use sift_common::error::{Error, ErrorKind};
use sift_common::span::Span;
use sift_common::token::{Token, TokenKind};

/// The sift lexer. Converts a filter expression into a `Vec<Token>`.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    tokens: Vec<Token>,
}

impl<'src> Lexer<'src> {
    /// Tokenize an entire filter expression.
    ///
    /// The returned vector includes the final `Eof` token. The first
    /// byte-level violation aborts with an [`Error`] carrying its span.
    pub fn tokenize(source: &'src str) -> Result<Vec<Token>, Error> {
        Lexer {
            cursor: Cursor::new(source),
            tokens: Vec::new(),
        }
        .run()
    }

    fn run(mut self) -> Result<Vec<Token>, Error> {
        loop {
            let ws = self.skip_whitespace();
            let start = self.cursor.pos();

            let Some(c) = self.cursor.peek() else {
                self.tokens.push(Token::new(TokenKind::Eof, start, start));
                return Ok(self.tokens);
            };

            // The value of a comparison must be glued to its operator.
            if self.after_comparator() {
                if let Some(gap) = ws {
                    return Err(Error::lex(ErrorKind::InvalidPredicateSpacing, gap));
                }
                self.lex_value(start)?;
                continue;
            }

            match c {
                '(' => {
                    self.term_boundary(ws);
                    self.cursor.advance();
                    self.tokens
                        .push(Token::new(TokenKind::LParen, start, start + 1));
                }
                ')' => {
                    self.cursor.advance();
                    self.tokens
                        .push(Token::new(TokenKind::RParen, start, start + 1));
                }
                ',' => {
                    self.cursor.advance();
                    self.tokens
                        .push(Token::new(TokenKind::Comma, start, start + 1));
                }
                '\'' | '"' => {
                    self.term_boundary(ws);
                    self.lex_quoted(start)?;
                }
                '-' => {
                    // A dash at term start negates the following term.
                    self.term_boundary(ws);
                    self.cursor.advance();
                    self.tokens
                        .push(Token::new(TokenKind::Not, start, start + 1));
                }
                ':' | '<' | '>' | '=' => {
                    return Err(self.stray_operator_error(c, ws, start));
                }
                c if is_name_start(c) => {
                    self.lex_word(ws, start)?;
                }
                _ => {
                    // Bare value: digits, `*`, and any other visible
                    // non-special byte.
                    self.term_boundary(ws);
                    self.lex_bare(start);
                }
            }
        }
    }

    // ── Whitespace and implicit AND ────────────────────────────────────

    /// Consume a whitespace run, returning its span when non-empty.
    fn skip_whitespace(&mut self) -> Option<Span> {
        let start = self.cursor.pos();
        self.cursor.eat_while(is_whitespace);
        let end = self.cursor.pos();
        (end > start).then(|| Span::new(start, end))
    }

    /// Called before pushing a term-starting token. When the previous
    /// token ended a term and whitespace separated the two, the bare
    /// juxtaposition means conjunction: an `AND` token is synthesized over
    /// the whitespace bytes.
    fn term_boundary(&mut self, ws: Option<Span>) {
        if let Some(span) = ws {
            if self.tokens.last().is_some_and(Token::ends_term) {
                self.tokens.push(Token {
                    kind: TokenKind::And,
                    span,
                    literal: Some("and".into()),
                    quoted: false,
                });
            }
        }
    }

    fn after_comparator(&self) -> bool {
        self.tokens.last().is_some_and(|t| t.kind.is_comparator())
    }

    // ── Values ─────────────────────────────────────────────────────────

    /// Lex the token directly after a comparator. Bare runs are taken
    /// whole (no keyword or identifier interpretation applies on the
    /// value side of an operator).
    fn lex_value(&mut self, start: u32) -> Result<(), Error> {
        match self.cursor.peek() {
            Some('\'' | '"') => self.lex_quoted(start),
            Some('(') => {
                self.cursor.advance();
                self.tokens
                    .push(Token::new(TokenKind::LParen, start, start + 1));
                Ok(())
            }
            Some(')') => {
                self.cursor.advance();
                self.tokens
                    .push(Token::new(TokenKind::RParen, start, start + 1));
                Ok(())
            }
            Some(',') => {
                self.cursor.advance();
                self.tokens
                    .push(Token::new(TokenKind::Comma, start, start + 1));
                Ok(())
            }
            Some(_) => {
                self.lex_bare(start);
                Ok(())
            }
            None => unreachable!("caller checks for end of input"),
        }
    }

    /// Lex a bare value: a run of visible non-special bytes.
    fn lex_bare(&mut self, start: u32) {
        self.cursor.eat_while(|c| !is_special(c));
        let end = self.cursor.pos();
        let text = self.cursor.slice(start, end);
        self.tokens
            .push(Token::with_literal(TokenKind::StringValue, start, end, text));
    }

    /// Lex a quoted string. Either quote character opens a string; a
    /// backslash escapes any next byte literally; the decoded literal
    /// excludes quotes and escape bytes.
    fn lex_quoted(&mut self, start: u32) -> Result<(), Error> {
        let quote = self.cursor.advance().unwrap();
        let mut decoded = String::new();

        loop {
            match self.cursor.advance() {
                None => {
                    return Err(Error::lex(
                        ErrorKind::UnterminatedString,
                        Span::new(start, self.cursor.pos()),
                    ));
                }
                Some('\\') => match self.cursor.advance() {
                    Some(escaped) => decoded.push(escaped),
                    None => {
                        return Err(Error::lex(
                            ErrorKind::UnterminatedString,
                            Span::new(start, self.cursor.pos()),
                        ));
                    }
                },
                Some(c) if c == quote => break,
                Some(c) => decoded.push(c),
            }
        }

        self.tokens.push(
            Token::with_literal(TokenKind::StringValue, start, self.cursor.pos(), decoded)
                .quoted(),
        );
        Ok(())
    }

    // ── Words: field paths, keywords, bare terms ───────────────────────

    /// Lex a run starting with a name-start byte. Depending on what
    /// follows, the run becomes a field identifier (glued operator or a
    /// set keyword ahead), a connector, a negation marker, or a plain
    /// bare value.
    fn lex_word(&mut self, ws: Option<Span>, start: u32) -> Result<(), Error> {
        // Consume the dotted path. A dot may only be crossed when a name
        // start follows it.
        loop {
            self.cursor.eat_while(is_name_continue);
            if self.cursor.peek() == Some('.') {
                match self.cursor.peek_next() {
                    Some(n) if is_name_start(n) => {
                        self.cursor.advance();
                        continue;
                    }
                    _ => {
                        self.cursor.advance();
                        let end = self.cursor.pos();
                        let field = self.cursor.slice(start, end).to_string();
                        return Err(Error::lex(
                            ErrorKind::InvalidField(field),
                            Span::new(start, end),
                        ));
                    }
                }
            }
            break;
        }
        let end = self.cursor.pos();

        // A byte that can extend a bare value but not an identifier
        // (e.g. `*` in `Bea*`) downgrades the whole run to a bare value.
        if self.cursor.peek().is_some_and(|c| !is_special(c)) {
            self.term_boundary(ws);
            self.cursor.eat_while(|c| !is_special(c));
            let vend = self.cursor.pos();
            let text = self.cursor.slice(start, vend);
            self.tokens.push(Token::with_literal(
                TokenKind::StringValue,
                start,
                vend,
                text,
            ));
            return Ok(());
        }

        // Comparison operator glued to the path makes it a field.
        if matches!(self.cursor.peek(), Some(':' | '<' | '>' | '=')) {
            return self.lex_field_operator(ws, start, end);
        }

        let lexeme = self.cursor.slice(start, end);

        // Connectors are case-sensitive whole words, and only count as
        // connectors directly after a completed term.
        if matches!(lexeme, "AND" | "OR") && self.tokens.last().is_some_and(Token::ends_term) {
            let (kind, literal) = if lexeme == "AND" {
                (TokenKind::And, "and")
            } else {
                (TokenKind::Or, "or")
            };
            self.tokens
                .push(Token::with_literal(kind, start, end, literal));
            return Ok(());
        }

        if lexeme == "NOT" {
            self.term_boundary(ws);
            self.tokens.push(Token::new(TokenKind::Not, start, end));
            return Ok(());
        }

        // A set keyword ahead makes this word a field identifier.
        if let Some((kind, kw_span)) = self.try_set_keyword() {
            self.term_boundary(ws);
            self.tokens.push(Token::with_literal(
                TokenKind::FieldIdent,
                start,
                end,
                normalize_path(lexeme),
            ));
            self.tokens
                .push(Token::new(kind, kw_span.start, kw_span.end));
            return Ok(());
        }

        // Plain bare term.
        self.term_boundary(ws);
        self.tokens.push(Token::with_literal(
            TokenKind::StringValue,
            start,
            end,
            lexeme,
        ));
        Ok(())
    }

    /// Emit the field identifier and the comparison operator glued to it.
    fn lex_field_operator(
        &mut self,
        ws: Option<Span>,
        start: u32,
        end: u32,
    ) -> Result<(), Error> {
        let op_start = self.cursor.pos();
        if self.cursor.peek() == Some('=') {
            return Err(Error::lex(
                ErrorKind::InvalidComparator("=".into()),
                Span::new(op_start, op_start + 1),
            ));
        }

        self.term_boundary(ws);
        let path = self.cursor.slice(start, end);
        self.tokens.push(Token::with_literal(
            TokenKind::FieldIdent,
            start,
            end,
            normalize_path(path),
        ));

        let op = self.cursor.advance().unwrap();
        match op {
            ':' => {
                self.tokens
                    .push(Token::new(TokenKind::Eq, op_start, op_start + 1));
            }
            '<' | '>' => {
                if self.cursor.peek() == Some('=') {
                    self.cursor.advance();
                    let kind = if op == '<' {
                        TokenKind::Lte
                    } else {
                        TokenKind::Gte
                    };
                    self.tokens.push(Token::new(kind, op_start, op_start + 2));
                } else {
                    // `< =` is a single operator broken by whitespace, not
                    // a comparison against the value `=`.
                    let mut probe = self.cursor.clone();
                    if probe.peek().is_some_and(is_whitespace) {
                        probe.eat_while(is_whitespace);
                        if probe.peek() == Some('=') {
                            return Err(Error::lex(
                                ErrorKind::BrokenOperator(format!("{op} =")),
                                Span::new(op_start, probe.pos() + 1),
                            ));
                        }
                    }
                    let kind = if op == '<' { TokenKind::Lt } else { TokenKind::Gt };
                    self.tokens.push(Token::new(kind, op_start, op_start + 1));
                }
            }
            _ => unreachable!("caller only dispatches ':', '<', '>'"),
        }
        Ok(())
    }

    /// Speculatively look for `IN`, `NOT IN`, or `ALL` as whole words
    /// after the current position. On a match the cursor is committed past
    /// the keyword and its span is returned.
    fn try_set_keyword(&mut self) -> Option<(TokenKind, Span)> {
        if !self.cursor.peek().is_some_and(is_whitespace) {
            return None;
        }
        let mut probe = self.cursor.clone();
        probe.eat_while(is_whitespace);

        let (first, first_span) = read_word(&mut probe)?;
        match first {
            "IN" => {
                self.cursor = probe;
                Some((TokenKind::In, first_span))
            }
            "ALL" => {
                self.cursor = probe;
                Some((TokenKind::All, first_span))
            }
            "NOT" => {
                if !probe.peek().is_some_and(is_whitespace) {
                    return None;
                }
                probe.eat_while(is_whitespace);
                let (second, second_span) = read_word(&mut probe)?;
                if second == "IN" {
                    self.cursor = probe;
                    Some((TokenKind::NotIn, Span::new(first_span.start, second_span.end)))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Classify a stray comparison byte found outside predicate position.
    fn stray_operator_error(&self, c: char, ws: Option<Span>, start: u32) -> Error {
        if c == '=' {
            return Error::lex(
                ErrorKind::InvalidComparator("=".into()),
                Span::new(start, start + 1),
            );
        }
        if let Some(gap) = ws {
            if self
                .tokens
                .last()
                .is_some_and(|t| t.kind == TokenKind::StringValue)
            {
                // `status : live` -- the whitespace split a predicate.
                return Error::lex(ErrorKind::InvalidPredicateSpacing, gap);
            }
        }
        Error::lex(ErrorKind::UnexpectedChar(c), Span::new(start, start + 1))
    }
}

/// Read one name-continue word from the probe, returning its text and span.
/// The word only counts when it ends at a special byte or end of input.
fn read_word<'src>(probe: &mut Cursor<'src>) -> Option<(&'src str, Span)> {
    let start = probe.pos();
    probe.eat_while(is_name_continue);
    let end = probe.pos();
    if end == start {
        return None;
    }
    if probe.peek().is_some_and(|c| !is_special(c)) {
        // The keyword candidate touches more value bytes (`index`,
        // `ALLOWED*`), so it is part of a bare term.
        return None;
    }
    Some((probe.slice(start, end), Span::new(start, end)))
}

// ── Character classes ──────────────────────────────────────────────────

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_continue(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-'
}

fn is_special(c: char) -> bool {
    is_whitespace(c) || matches!(c, '(' | ')' | ':' | '<' | '>' | '=' | ',' | '\'' | '"')
}
