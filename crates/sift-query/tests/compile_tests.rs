//! End-to-end compile tests against a representative events schema.

use sift_common::error::ErrorKind;
use sift_query::{
    compile, to_sql, AllowEntry, JoinOverflow, Mode, Options, Policy, SearchStrategy, Warning,
};
use sift_schema::{Assoc, FieldType, SchemaSet, TableSchema};

fn schema() -> SchemaSet {
    SchemaSet::new()
        .define(
            "events",
            TableSchema::new("events")
                .field("status", FieldType::Text)
                .field("priority", FieldType::Integer)
                .field("active", FieldType::Bool)
                .field("time_start", FieldType::UtcDateTime)
                .field("organization_id", FieldType::Integer)
                .field("title", FieldType::Text)
                .field("content", FieldType::Text)
                .field("labels", FieldType::Array(Box::new(FieldType::Text)))
                .assoc(
                    "organization",
                    Assoc::BelongsTo {
                        schema: "organizations".into(),
                        owner_key: "organization_id".into(),
                        related_key: "id".into(),
                    },
                )
                .assoc(
                    "tags",
                    Assoc::ManyToMany {
                        schema: "tags".into(),
                        join_table: "event_tags".into(),
                        join_owner_key: "event_id".into(),
                        join_related_key: "tag_id".into(),
                        related_key: "id".into(),
                    },
                ),
        )
        .define(
            "organizations",
            TableSchema::new("organizations").field("name", FieldType::Text),
        )
        .define("tags", TableSchema::new("tags").field("name", FieldType::Text))
}

fn options() -> Options {
    Options::new("events")
}

fn params_as_strings(params: &[sift_schema::Value]) -> Vec<String> {
    params.iter().map(|p| p.to_string()).collect()
}

#[test]
fn simple_field() {
    let (sql, params, meta) = to_sql("status:live", &schema(), &options()).unwrap();
    assert_eq!(
        sql,
        "SELECT \"events\".* FROM \"events\" WHERE \"events\".\"status\" = $1"
    );
    assert_eq!(params_as_strings(&params), vec!["live"]);
    assert!(!meta.uses_full_text);
    assert!(meta.warnings.is_empty());
}

#[test]
fn boolean_precedence() {
    let (sql, params, _) = to_sql(
        "status:live OR status:draft AND priority:10",
        &schema(),
        &options(),
    )
    .unwrap();
    assert_eq!(
        sql,
        "SELECT \"events\".* FROM \"events\" WHERE \"events\".\"status\" = $1 OR \
         (\"events\".\"status\" = $2 AND \"events\".\"priority\" = $3)"
    );
    assert_eq!(params_as_strings(&params), vec!["live", "draft", "10"]);
}

#[test]
fn association_filter_through_alias() {
    let opts = options().allowed_fields([
        AllowEntry::path("status"),
        AllowEntry::alias("org.name", "organization.name"),
    ]);
    let (sql, params, _) = to_sql("status:live AND org.name:Bea*", &schema(), &opts).unwrap();
    assert_eq!(
        sql,
        "SELECT \"events\".* FROM \"events\" \
         LEFT JOIN \"organizations\" ON \"events\".\"organization_id\" = \"organizations\".\"id\" \
         WHERE \"events\".\"status\" = $1 AND \"organizations\".\"name\" ILIKE $2"
    );
    assert_eq!(params_as_strings(&params), vec!["live", "Bea%"]);
}

#[test]
fn alias_compiles_like_the_canonical_path() {
    let aliased = options().allowed_fields([AllowEntry::alias("org.name", "organization.name")]);
    let canonical = options().allowed_fields([AllowEntry::path("organization.name")]);

    let a = to_sql("org.name:Beatrix", &schema(), &aliased).unwrap();
    let b = to_sql("organization.name:Beatrix", &schema(), &canonical).unwrap();
    assert_eq!(a.0, b.0);
    assert_eq!(params_as_strings(&a.1), params_as_strings(&b.1));
}

#[test]
fn set_with_null() {
    let (sql, params, _) = to_sql("organization_id IN (NULL, 7, 8)", &schema(), &options()).unwrap();
    assert_eq!(
        sql,
        "SELECT \"events\".* FROM \"events\" WHERE \
         \"events\".\"organization_id\" IN ($1, $2) OR \"events\".\"organization_id\" IS NULL"
    );
    assert_eq!(params_as_strings(&params), vec!["7", "8"]);
}

#[test]
fn not_in_with_null() {
    let (sql, _, _) = to_sql("organization_id NOT IN (NULL, 7)", &schema(), &options()).unwrap();
    assert!(sql.contains(
        "\"events\".\"organization_id\" NOT IN ($1) AND \"events\".\"organization_id\" IS NOT NULL"
    ));
}

#[test]
fn date_only_on_datetime() {
    let (sql, params, _) = to_sql("time_start:2025-08-07", &schema(), &options()).unwrap();
    assert_eq!(
        sql,
        "SELECT \"events\".* FROM \"events\" WHERE \
         \"events\".\"time_start\" >= $1 AND \"events\".\"time_start\" < $2"
    );
    assert_eq!(
        params_as_strings(&params),
        vec!["2025-08-07T00:00:00Z", "2025-08-08T00:00:00Z"]
    );
}

#[test]
fn date_only_ordered_bounds() {
    let (_, params, _) = to_sql("time_start>2025-08-07", &schema(), &options()).unwrap();
    assert_eq!(params_as_strings(&params), vec!["2025-08-08T00:00:00Z"]);

    let (_, params, _) = to_sql("time_start<=2025-08-07", &schema(), &options()).unwrap();
    assert_eq!(params_as_strings(&params), vec!["2025-08-08T00:00:00Z"]);

    let (sql, params, _) = to_sql("time_start<2025-08-07", &schema(), &options()).unwrap();
    assert!(sql.ends_with("\"events\".\"time_start\" < $1"));
    assert_eq!(params_as_strings(&params), vec!["2025-08-07T00:00:00Z"]);
}

#[test]
fn full_datetime_is_plain_equality() {
    // Colons are operator bytes, so a full timestamp must be quoted.
    let (sql, params, _) =
        to_sql("time_start:'2025-08-07T10:00:00Z'", &schema(), &options()).unwrap();
    assert!(sql.ends_with("\"events\".\"time_start\" = $1"));
    assert_eq!(params_as_strings(&params), vec!["2025-08-07T10:00:00Z"]);
}

#[test]
fn full_text_plus_field() {
    let opts = options().search_fields(["title", "content"]);
    let (sql, params, meta) =
        to_sql("jazz status:published", &schema(), &opts).unwrap();
    assert_eq!(
        sql,
        "SELECT \"events\".* FROM \"events\" WHERE \
         (\"events\".\"title\" ILIKE $1 OR \"events\".\"content\" ILIKE $2) \
         AND \"events\".\"status\" = $3"
    );
    assert_eq!(
        params_as_strings(&params),
        vec!["%jazz%", "%jazz%", "published"]
    );
    assert!(meta.uses_full_text);
}

#[test]
fn contains_all_over_many_to_many_groups_and_counts() {
    let (sql, params, _) = to_sql("tags.name ALL (rust, sql)", &schema(), &options()).unwrap();
    assert_eq!(
        sql,
        "SELECT \"events\".* FROM \"events\" \
         LEFT JOIN \"event_tags\" ON \"event_tags\".\"event_id\" = \"events\".\"id\" \
         LEFT JOIN \"tags\" ON \"tags\".\"id\" = \"event_tags\".\"tag_id\" \
         WHERE \"tags\".\"name\" IN ($1, $2) \
         GROUP BY \"events\".\"id\" \
         HAVING count(DISTINCT \"tags\".\"name\") = $3"
    );
    assert_eq!(params_as_strings(&params), vec!["rust", "sql", "2"]);
    // The aggregation plan replaces DISTINCT.
    assert!(!sql.contains("SELECT DISTINCT"));
}

#[test]
fn many_to_many_predicate_forces_distinct() {
    let (sql, _, _) = to_sql("tags.name:rust", &schema(), &options()).unwrap();
    assert!(sql.starts_with("SELECT DISTINCT \"events\".*"));
    assert!(sql.contains("LEFT JOIN \"event_tags\""));
}

#[test]
fn contains_all_on_array_column() {
    let (sql, params, _) = to_sql("labels ALL (urgent, public)", &schema(), &options()).unwrap();
    assert!(sql.contains("\"events\".\"labels\" @> ARRAY[$1, $2]::text[]"));
    assert_eq!(params_as_strings(&params), vec!["urgent", "public"]);
}

#[test]
fn contains_all_on_scalar_degrades_to_in() {
    let (sql, _, meta) = to_sql("status ALL (live, draft)", &schema(), &options()).unwrap();
    assert!(sql.contains("\"events\".\"status\" IN ($1, $2)"));
    assert_eq!(
        meta.warnings,
        vec![Warning::DegradedContainsAll {
            field: "status".into()
        }]
    );
}

#[test]
fn negation() {
    let (sql, _, _) = to_sql("NOT status:live", &schema(), &options()).unwrap();
    assert!(sql.ends_with("\"events\".\"status\" != $1"));

    let (sql, _, _) = to_sql("NOT status:NULL", &schema(), &options()).unwrap();
    assert!(sql.ends_with("\"events\".\"status\" IS NOT NULL"));

    let (sql, _, _) = to_sql("NOT priority>5", &schema(), &options()).unwrap();
    assert!(sql.ends_with("NOT (\"events\".\"priority\" > $1)"));
}

#[test]
fn negated_full_text_contributes_nothing() {
    let opts = options().search_fields(["title"]);
    let compiled = compile("-jazz", &schema(), &opts).unwrap();
    assert!(!compiled.has_predicates());

    // If negation was the only contribution, the whole compile is empty.
    let (sql, params, _) = to_sql("-jazz", &schema(), &opts).unwrap();
    assert_eq!(sql, "SELECT \"events\".* FROM \"events\"");
    assert!(params.is_empty());
}

#[test]
fn quoted_wildcard_is_literal_equality() {
    let (sql, params, _) = to_sql("status:'*foo'", &schema(), &options()).unwrap();
    assert!(sql.ends_with("\"events\".\"status\" = $1"));
    assert_eq!(params_as_strings(&params), vec!["*foo"]);
}

#[test]
fn empty_source_compiles_to_no_predicates() {
    let compiled = compile("", &schema(), &options()).unwrap();
    assert!(!compiled.has_predicates());

    let (sql, params, _) = to_sql("", &schema(), &options()).unwrap();
    assert_eq!(sql, "SELECT \"events\".* FROM \"events\"");
    assert!(params.is_empty());
}

#[test]
fn unknown_field_policies() {
    // Warn (the default): dropped with a warning.
    let (sql, _, meta) = to_sql("secret:x AND status:live", &schema(), &options()).unwrap();
    assert!(sql.contains("\"events\".\"status\" = $1"));
    assert!(!sql.contains("secret"));
    assert_eq!(
        meta.warnings,
        vec![Warning::UnknownField {
            path: "secret".into()
        }]
    );

    // Ignore: dropped silently.
    let opts = options().unknown_field(Policy::Ignore);
    let (_, _, meta) = to_sql("secret:x AND status:live", &schema(), &opts).unwrap();
    assert!(meta.warnings.is_empty());

    // Error: fails the compile.
    let opts = options().mode(Mode::Strict);
    let err = to_sql("secret:x", &schema(), &opts).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownField("secret".into()));
}

#[test]
fn unknown_assoc_policy() {
    let opts = options().mode(Mode::Strict);
    let err = to_sql("venue.name:x", &schema(), &opts).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownAssoc("venue".into()));

    let (_, _, meta) = to_sql("venue.name:x", &schema(), &options()).unwrap();
    assert_eq!(
        meta.warnings,
        vec![Warning::UnknownAssoc {
            name: "venue".into()
        }]
    );
}

#[test]
fn paths_deeper_than_one_hop_are_unknown() {
    let opts = options().mode(Mode::Strict);
    let err = to_sql("organization.parent.name:x", &schema(), &opts).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::UnknownField("organization.parent.name".into())
    );
}

#[test]
fn invalid_cast_policies() {
    let (sql, _, meta) = to_sql("priority:high AND status:live", &schema(), &options()).unwrap();
    assert!(!sql.contains("priority"));
    assert_eq!(
        meta.warnings,
        vec![Warning::InvalidCast {
            field: "priority".into(),
            value: "high".into()
        }]
    );

    let opts = options().mode(Mode::Strict);
    let err = to_sql("priority:high", &schema(), &opts).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::InvalidValue {
            field: "priority".into(),
            value: "high".into()
        }
    );
}

#[test]
fn null_with_ordering_operator() {
    let opts = options().mode(Mode::Strict);
    let err = to_sql("priority>NULL", &schema(), &opts).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidNullComparison("priority".into()));
}

#[test]
fn a_dropped_cast_in_a_list_drops_the_predicate() {
    let (sql, _, meta) =
        to_sql("priority IN (1, high, 3) AND status:live", &schema(), &options()).unwrap();
    assert!(!sql.contains("priority"));
    assert!(sql.contains("\"events\".\"status\""));
    assert_eq!(meta.warnings.len(), 1);
}

#[test]
fn join_limits() {
    let opts = options().max_joins(0);
    let err = to_sql("organization.name:x", &schema(), &opts).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TooManyJoins);

    let opts = options().max_joins(0).join_overflow(JoinOverflow::Ignore);
    let (sql, _, _) = to_sql("organization.name:x AND status:live", &schema(), &opts).unwrap();
    assert!(!sql.contains("LEFT JOIN"));
    assert!(sql.contains("\"events\".\"status\""));
}

#[test]
fn second_association_overflows() {
    let err = to_sql(
        "organization.name:x AND tags.name:rust",
        &schema(),
        &options(),
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TooManyJoins);
}

#[test]
fn contains_all_on_second_association_is_unsupported() {
    let err = to_sql(
        "organization.name:x AND tags.name ALL (a, b)",
        &schema(),
        &options(),
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::MultiAssocContainsAll);
}

#[test]
fn column_strategy_exports_rank_and_order() {
    let opts = options().search_strategy(SearchStrategy::Column {
        config: "english".into(),
        column: "search_vector".into(),
    });
    let (sql, params, meta) = to_sql("jazz", &schema(), &opts).unwrap();
    assert_eq!(
        sql,
        "SELECT \"events\".*, \
         ts_rank_cd(\"events\".\"search_vector\", plainto_tsquery('english', $1), 4) AS \"search_rank\" \
         FROM \"events\" WHERE \"events\".\"search_vector\" @@ plainto_tsquery('english', $2)"
    );
    assert_eq!(params_as_strings(&params), vec!["jazz", "jazz"]);
    assert_eq!(meta.added_select_fields, vec!["search_rank"]);
    assert!(meta.recommended_order.is_some());
    assert!(meta.uses_full_text);
}

#[test]
fn column_strategy_without_column_is_an_error() {
    let opts = options().search_strategy(SearchStrategy::Column {
        config: "english".into(),
        column: String::new(),
    });
    let err = to_sql("jazz", &schema(), &opts).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::SearchMisconfigured(_)));
}

#[test]
fn full_text_without_applicable_fields_is_no_predicate() {
    // No search fields configured at all.
    let (sql, _, meta) = to_sql("jazz", &schema(), &options()).unwrap();
    assert_eq!(sql, "SELECT \"events\".* FROM \"events\"");
    assert!(!meta.uses_full_text);
}

#[test]
fn custom_sanitizer_applies_before_compilation() {
    let opts = options()
        .search_fields(["title"])
        .full_text_sanitizer(|term: &str| term.trim().to_lowercase());
    let (_, params, _) = to_sql("  RUST  ", &schema(), &opts).unwrap();
    assert_eq!(params_as_strings(&params), vec!["%rust%"]);
}

#[test]
fn compiling_twice_is_deterministic() {
    let opts = options().search_fields(["title", "content"]);
    let a = to_sql("jazz status:live tags.name:rust", &schema(), &opts).unwrap();
    let b = to_sql("jazz status:live tags.name:rust", &schema(), &opts).unwrap();
    assert_eq!(a.0, b.0);
    assert_eq!(params_as_strings(&a.1), params_as_strings(&b.1));
}

#[test]
fn lex_and_parse_errors_surface_with_positions() {
    let err = to_sql("status:'unterminated", &schema(), &options()).unwrap_err();
    assert!(err.to_string().starts_with("Unterminated string at position 7"));

    let err = to_sql("status=live", &schema(), &options()).unwrap_err();
    assert_eq!(err.to_string(), "Invalid operator '=' at position 6");

    let err = to_sql("(status:live OR name:test", &schema(), &options()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Missing closing parenthesis ')' for opening parenthesis at position 0"
    );

    let err = to_sql("status:live AND", &schema(), &options()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Expected expression after 'AND' at position 12. Operators must be followed by a value or field."
    );

    let err = to_sql("status IN ()", &schema(), &options()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Empty list at position 10. Lists must contain at least one value."
    );

    let err = to_sql("status IN (live, draft,)", &schema(), &options()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Trailing comma at position 22. Remove the comma after the last list item."
    );
}
