//! Integration tests over the full token stream.

use insta::assert_snapshot;
use sift_lexer::Lexer;

/// A compact, line-per-token dump used for snapshot assertions.
fn dump(source: &str) -> String {
    Lexer::tokenize(source)
        .unwrap()
        .iter()
        .map(|token| {
            let mut line = format!(
                "{:?} {}..{}",
                token.kind, token.span.start, token.span.end
            );
            if let Some(literal) = &token.literal {
                line.push_str(&format!(" {literal:?}"));
            }
            if token.quoted {
                line.push_str(" quoted");
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn predicate_with_connector_and_wildcard() {
    assert_snapshot!(dump("status:live AND org.name:Bea*"), @r#"
    FieldIdent 0..6 "status"
    Eq 6..7
    StringValue 7..11 "live"
    And 12..15 "and"
    FieldIdent 16..24 "org.name"
    Eq 24..25
    StringValue 25..29 "Bea*"
    Eof 29..29
    "#);
}

#[test]
fn implicit_and_covers_the_whitespace() {
    assert_snapshot!(dump("Bea* draft"), @r#"
    StringValue 0..4 "Bea*"
    And 4..5 "and"
    StringValue 5..10 "draft"
    Eof 10..10
    "#);
}

#[test]
fn set_operator_with_list() {
    assert_snapshot!(dump("tags ALL (rust, sql)"), @r#"
    FieldIdent 0..4 "tags"
    All 5..8
    LParen 9..10
    StringValue 10..14 "rust"
    Comma 14..15
    StringValue 16..19 "sql"
    RParen 19..20
    Eof 20..20
    "#);
}

#[test]
fn quoted_value_with_escape() {
    assert_snapshot!(dump(r"status:'it\'s'"), @r#"
    FieldIdent 0..6 "status"
    Eq 6..7
    StringValue 7..14 "it's" quoted
    Eof 14..14
    "#);
}

#[test]
fn not_in_keyword_spans_both_words() {
    assert_snapshot!(dump("status NOT IN (live)"), @r#"
    FieldIdent 0..6 "status"
    NotIn 7..13
    LParen 14..15
    StringValue 15..19 "live"
    RParen 19..20
    Eof 20..20
    "#);
}

// ── Stream invariants ───────────────────────────────────────────────────

const SAMPLES: &[&str] = &[
    "",
    "status:live",
    "a b c d",
    "status:live AND (org.name:Bea* OR tags ALL (a, b))",
    "NOT x:1 -y priority>=10",
    "organization_id IN (NULL, 7, 8)",
    "'quoted term' another",
    "createdAt<2020-01-01 active:true",
];

#[test]
fn streams_end_with_exactly_one_eof() {
    for source in SAMPLES {
        let tokens = Lexer::tokenize(source).unwrap();
        let eofs = tokens
            .iter()
            .filter(|t| t.kind == sift_common::token::TokenKind::Eof)
            .count();
        assert_eq!(eofs, 1, "source: {source:?}");
        assert_eq!(
            tokens.last().unwrap().kind,
            sift_common::token::TokenKind::Eof
        );
    }
}

#[test]
fn spans_are_in_bounds_monotone_and_disjoint() {
    for source in SAMPLES {
        let tokens = Lexer::tokenize(source).unwrap();
        let mut prev_end = 0;
        for token in &tokens {
            assert!(
                token.span.start >= prev_end,
                "overlapping span in {source:?}: {token:?}"
            );
            assert!(token.span.end as usize <= source.len(), "source: {source:?}");
            prev_end = token.span.end;
        }
    }
}

#[test]
fn no_two_adjacent_connectors() {
    use sift_common::token::TokenKind;
    for source in SAMPLES {
        let tokens = Lexer::tokenize(source).unwrap();
        for pair in tokens.windows(2) {
            assert!(
                !(pair[0].kind.is_connector() && pair[1].kind.is_connector()),
                "adjacent connectors in {source:?}"
            );
        }
        // Inserted ANDs sit between a term end and a term start.
        for (i, token) in tokens.iter().enumerate() {
            if token.kind == TokenKind::And && source.len() > token.span.start as usize {
                let lexeme = &source[token.span.start as usize..token.span.end as usize];
                if lexeme.trim().is_empty() {
                    assert!(tokens[i - 1].ends_term(), "implicit AND in {source:?}");
                    assert!(
                        !matches!(
                            tokens[i + 1].kind,
                            TokenKind::And
                                | TokenKind::Or
                                | TokenKind::RParen
                                | TokenKind::Comma
                                | TokenKind::Eof
                        ),
                        "implicit AND before non-term in {source:?}"
                    );
                }
            }
        }
    }
}
