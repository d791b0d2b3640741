//! The sift CLI.
//!
//! Provides the `siftc` command with the following subcommands:
//!
//! - `siftc compile <expr>` - Compile a filter expression to SQL against a
//!   JSON schema description
//! - `siftc parse <expr>` - Print the parsed AST as JSON
//!
//! Errors from the lexer and parser are rendered as ariadne reports with
//! the offending span underlined in the expression.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use sift_common::error::Error;
use sift_query::{AllowEntry, Mode, Options, SearchStrategy, TsQueryMode};
use sift_schema::SchemaSet;

#[derive(Parser)]
#[command(name = "siftc", version, about = "The sift query compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a filter expression to SQL
    Compile {
        /// The filter expression, e.g. "status:live AND org.name:Bea*"
        expression: String,

        /// Path to the JSON schema description
        #[arg(long)]
        schema: PathBuf,

        /// Root schema id to resolve fields against
        #[arg(long)]
        root: String,

        /// Allowed field, or alias mapping "alias=field". Repeatable;
        /// omitting the flag allows every schema field.
        #[arg(long = "allow")]
        allow: Vec<String>,

        /// Field to full-text search. Repeatable.
        #[arg(long = "search-field")]
        search_fields: Vec<String>,

        /// Full-text strategy
        #[arg(long, value_enum, default_value_t = Strategy::Ilike)]
        strategy: Strategy,

        /// Text search configuration for tsquery/column strategies
        #[arg(long = "ts-config", default_value = "english")]
        ts_config: String,

        /// Precomputed tsvector column for the column strategy
        #[arg(long = "ts-column")]
        ts_column: Option<String>,

        /// Use raw to_tsquery with the strict sanitizer
        #[arg(long)]
        raw: bool,

        /// Handling preset for unknown fields and bad casts
        #[arg(long, value_enum, default_value_t = ModeArg::Lenient)]
        mode: ModeArg,

        /// Emit machine-readable JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Parse a filter expression and print the AST as JSON
    Parse {
        /// The filter expression
        expression: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    Ilike,
    Tsquery,
    Column,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Lenient,
    Strict,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile {
            expression,
            schema,
            root,
            allow,
            search_fields,
            strategy,
            ts_config,
            ts_column,
            raw,
            mode,
            json,
        } => compile(
            &expression,
            &schema,
            &root,
            &allow,
            search_fields,
            strategy,
            ts_config,
            ts_column,
            raw,
            mode,
            json,
        ),
        Commands::Parse { expression } => parse(&expression),
    };

    if let Err(message) = result {
        if !message.is_empty() {
            eprintln!("error: {message}");
        }
        process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn compile(
    expression: &str,
    schema_path: &PathBuf,
    root: &str,
    allow: &[String],
    search_fields: Vec<String>,
    strategy: Strategy,
    ts_config: String,
    ts_column: Option<String>,
    raw: bool,
    mode: ModeArg,
    json: bool,
) -> Result<(), String> {
    let schema_text = std::fs::read_to_string(schema_path)
        .map_err(|e| format!("failed to read '{}': {e}", schema_path.display()))?;
    let schemas: SchemaSet = serde_json::from_str(&schema_text)
        .map_err(|e| format!("invalid schema description: {e}"))?;

    let mut options = Options::new(root)
        .mode(match mode {
            ModeArg::Lenient => Mode::Lenient,
            ModeArg::Strict => Mode::Strict,
        })
        .search_fields(search_fields)
        .search_strategy(match strategy {
            Strategy::Ilike => SearchStrategy::ILike,
            Strategy::Tsquery => SearchStrategy::TsQuery { config: ts_config },
            Strategy::Column => SearchStrategy::Column {
                config: ts_config,
                column: ts_column.unwrap_or_default(),
            },
        });
    if raw {
        options = options.tsquery_mode(TsQueryMode::Raw);
    }
    if !allow.is_empty() {
        options = options.allowed_fields(allow.iter().map(|spec| {
            match spec.split_once('=') {
                Some((alias, field)) => AllowEntry::alias(alias, field),
                None => AllowEntry::path(spec.clone()),
            }
        }));
    }

    match sift_query::to_sql(expression, &schemas, &options) {
        Ok((sql, params, meta)) => {
            if json {
                let out = serde_json::json!({
                    "sql": sql,
                    "params": params,
                    "meta": meta,
                });
                println!("{}", serde_json::to_string_pretty(&out).unwrap());
            } else {
                println!("{sql}");
                for (i, param) in params.iter().enumerate() {
                    println!("  ${} = {param}", i + 1);
                }
                for warning in &meta.warnings {
                    eprintln!("warning: {warning}");
                }
                if let Some(order) = &meta.recommended_order {
                    let rendered: Vec<String> = order
                        .iter()
                        .map(|(field, dir)| format!("{field} {dir:?}"))
                        .collect();
                    eprintln!("hint: order by {}", rendered.join(", "));
                }
            }
            Ok(())
        }
        Err(error) => {
            report_error(expression, &error);
            Err(String::new())
        }
    }
}

fn parse(expression: &str) -> Result<(), String> {
    match sift_parser::parse(expression) {
        Ok(ast) => {
            println!("{}", serde_json::to_string_pretty(&ast).unwrap());
            Ok(())
        }
        Err(error) => {
            report_error(expression, &error);
            Err(String::new())
        }
    }
}

/// Render a compile error. Spanned errors get an ariadne report pointing
/// into the expression; build errors print plainly.
fn report_error(expression: &str, error: &Error) {
    use ariadne::{Label, Report, ReportKind, Source};

    match error.span {
        Some(span) => {
            let start = span.start as usize;
            let end = (span.end as usize).max(start + 1);
            let _ = Report::<std::ops::Range<usize>>::build(ReportKind::Error, start..end)
                .with_message(format!("{:?} error", error.stage))
                .with_label(Label::new(start..end).with_message(error.to_string()))
                .finish()
                .eprint(Source::from(expression));
        }
        None => {
            eprintln!("error: {error}");
        }
    }
}
