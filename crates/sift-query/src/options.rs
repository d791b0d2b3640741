//! Compile options: handling policies, join limits, and the full-text
//! search configuration.

use std::fmt;

/// Preset for the three handling knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Drop offending predicates and record a warning.
    Lenient,
    /// Surface the first offense as an error.
    Strict,
}

/// What to do with a predicate the schema or allow-list rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Drop the predicate silently.
    Ignore,
    /// Drop the predicate and append to `meta.warnings`.
    Warn,
    /// Fail the compile.
    Error,
}

/// What to do when a query needs more joins than `max_joins`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOverflow {
    /// Drop the predicates that would need the extra join.
    Ignore,
    /// Fail the compile.
    Error,
}

/// Policy for a set predicate whose list is empty at lowering time.
/// (The parser rejects literal `IN ()`; this applies to programmatically
/// built trees.)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyIn {
    /// Drop the predicate.
    Drop,
    /// Compile to a constant-false predicate.
    ConstFalse,
    /// Fail the compile.
    Error,
}

/// Which tsquery constructor (and default sanitizer) to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsQueryMode {
    /// `plainto_tsquery` with the basic sanitizer.
    Plainto,
    /// `to_tsquery` with the strict sanitizer.
    Raw,
}

/// How full-text terms are matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Case-insensitive substring match over each search field.
    ILike,
    /// `to_tsvector` over each search field with the given text search
    /// configuration.
    TsQuery { config: String },
    /// Match against a precomputed tsvector column; exports a rank
    /// expression and a recommended ordering.
    Column { config: String, column: String },
}

/// Plug-in point for custom full-text term sanitization. Implemented for
/// any `Fn(&str) -> String`, so both closures and function references
/// work.
pub trait Sanitize {
    fn sanitize(&self, term: &str) -> String;
}

impl<F: Fn(&str) -> String> Sanitize for F {
    fn sanitize(&self, term: &str) -> String {
        self(term)
    }
}

/// One entry of the caller's allow-list: a plain path, or an alias
/// mapping a user-visible name to a canonical field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowEntry {
    Path(String),
    Alias { alias: String, field: String },
}

impl AllowEntry {
    /// Shorthand for a plain path entry.
    pub fn path(p: impl Into<String>) -> Self {
        AllowEntry::Path(p.into())
    }

    /// Shorthand for an alias entry.
    pub fn alias(alias: impl Into<String>, field: impl Into<String>) -> Self {
        AllowEntry::Alias {
            alias: alias.into(),
            field: field.into(),
        }
    }
}

/// All the knobs of a compile.
///
/// Construct with [`Options::new`] (lenient defaults) and chain the
/// builder methods. `allowed_fields: None` admits every schema field;
/// an explicit list (even an empty one) restricts to exactly its entries.
pub struct Options {
    /// Root schema id for field resolution.
    pub schema: String,
    pub unknown_field: Policy,
    pub unknown_assoc: Policy,
    pub invalid_cast: Policy,
    pub max_joins: u32,
    pub join_overflow: JoinOverflow,
    pub empty_in: EmptyIn,
    pub tsquery_mode: TsQueryMode,
    pub search_fields: Vec<String>,
    pub search_strategy: SearchStrategy,
    pub allowed_fields: Option<Vec<AllowEntry>>,
    pub full_text_sanitizer: Option<Box<dyn Sanitize>>,
}

impl Options {
    /// Lenient options for the given root schema.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            unknown_field: Policy::Warn,
            unknown_assoc: Policy::Warn,
            invalid_cast: Policy::Warn,
            max_joins: 1,
            join_overflow: JoinOverflow::Error,
            empty_in: EmptyIn::Drop,
            tsquery_mode: TsQueryMode::Plainto,
            search_fields: Vec::new(),
            search_strategy: SearchStrategy::ILike,
            allowed_fields: None,
            full_text_sanitizer: None,
        }
    }

    /// Apply a mode preset to the three handling knobs.
    pub fn mode(mut self, mode: Mode) -> Self {
        let policy = match mode {
            Mode::Lenient => Policy::Warn,
            Mode::Strict => Policy::Error,
        };
        self.unknown_field = policy;
        self.unknown_assoc = policy;
        self.invalid_cast = policy;
        self
    }

    pub fn unknown_field(mut self, policy: Policy) -> Self {
        self.unknown_field = policy;
        self
    }

    pub fn unknown_assoc(mut self, policy: Policy) -> Self {
        self.unknown_assoc = policy;
        self
    }

    pub fn invalid_cast(mut self, policy: Policy) -> Self {
        self.invalid_cast = policy;
        self
    }

    pub fn max_joins(mut self, max: u32) -> Self {
        self.max_joins = max;
        self
    }

    pub fn join_overflow(mut self, overflow: JoinOverflow) -> Self {
        self.join_overflow = overflow;
        self
    }

    pub fn empty_in(mut self, empty_in: EmptyIn) -> Self {
        self.empty_in = empty_in;
        self
    }

    pub fn tsquery_mode(mut self, mode: TsQueryMode) -> Self {
        self.tsquery_mode = mode;
        self
    }

    pub fn search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn search_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.search_strategy = strategy;
        self
    }

    pub fn allowed_fields<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = AllowEntry>,
    {
        self.allowed_fields = Some(entries.into_iter().collect());
        self
    }

    pub fn full_text_sanitizer(mut self, sanitizer: impl Sanitize + 'static) -> Self {
        self.full_text_sanitizer = Some(Box::new(sanitizer));
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("schema", &self.schema)
            .field("unknown_field", &self.unknown_field)
            .field("unknown_assoc", &self.unknown_assoc)
            .field("invalid_cast", &self.invalid_cast)
            .field("max_joins", &self.max_joins)
            .field("join_overflow", &self.join_overflow)
            .field("empty_in", &self.empty_in)
            .field("tsquery_mode", &self.tsquery_mode)
            .field("search_fields", &self.search_fields)
            .field("search_strategy", &self.search_strategy)
            .field("allowed_fields", &self.allowed_fields)
            .field(
                "full_text_sanitizer",
                &self.full_text_sanitizer.as_ref().map(|_| "<sanitizer>"),
            )
            .finish()
    }
}
