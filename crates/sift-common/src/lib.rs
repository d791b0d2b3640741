//! Shared types for the sift query compiler.
//!
//! Every stage of the pipeline (lexer, parser, query builder) speaks in
//! terms of the types defined here: byte-offset [`span::Span`]s into the
//! filter expression, the [`token::Token`] vocabulary, and the unified
//! [`error::Error`] value that carries the failing stage and location.

pub mod error;
pub mod span;
pub mod token;
