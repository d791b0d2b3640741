//! Parser for sift filter expressions.
//!
//! [`parse`] runs the lexer and the precedence-climbing grammar in one
//! step, producing the typed [`ast::Node`] tree that the query builder
//! lowers to SQL.

pub mod ast;
mod parser;

pub use ast::{Cmp, CmpOp, CmpValue, Node, RawValue};

use sift_common::error::Error;
use sift_lexer::Lexer;

/// Parse a filter expression into its AST.
///
/// An empty expression parses to `Node::And([])`; lex and parse errors
/// abort with a spanned [`Error`].
pub fn parse(source: &str) -> Result<Node, Error> {
    let tokens = Lexer::tokenize(source)?;
    parser::Parser::new(tokens, source).parse_root()
}
