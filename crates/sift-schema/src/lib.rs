//! Schema metadata for the sift query builder.
//!
//! The builder never touches a live database; everything it knows about
//! the queried tables comes through the [`schema::SchemaView`] trait:
//! which fields exist, their types, the primary key, and the declared
//! associations. [`schema::SchemaSet`] is the bundled in-memory
//! implementation, deserializable from JSON for the CLI; hosts with their
//! own introspection implement the trait directly.

pub mod cast;
pub mod schema;
pub mod types;
pub mod value;

pub use cast::{cast, day_bounds, parse_date_only, CastError};
pub use schema::{Assoc, SchemaSet, SchemaView, TableSchema};
pub use types::FieldType;
pub use value::Value;
