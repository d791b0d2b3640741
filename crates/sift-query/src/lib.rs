//! The sift query builder: lowers a parsed filter AST into a
//! parameterized SQL query against a schema.
//!
//! [`compile`] is the core entry point: it resolves field paths through
//! the allow-list and schema view, coerces literals to their declared
//! types, plans at most one association join, and produces a
//! [`Compiled`] value holding the WHERE fragment, join plan, grouping,
//! and metadata. [`to_sql`] assembles the whole SELECT statement with
//! `$N` placeholders for hosts that want SQL text directly.
//!
//! A compile is pure: it performs no I/O, touches no shared state, and
//! returns identical output for identical inputs, so it can run
//! concurrently from any number of threads over a shared schema view.

pub mod allow;
pub mod fragment;
pub mod fulltext;
pub mod join;
pub mod meta;
pub mod options;
pub mod predicate;

pub use fragment::{number_placeholders, quote_ident, ColumnRef, Fragment};
pub use join::JoinPlan;
pub use meta::{Dir, Meta, Warning};
pub use options::{
    AllowEntry, EmptyIn, JoinOverflow, Mode, Options, Policy, Sanitize, SearchStrategy,
    TsQueryMode,
};

use allow::AllowList;
use sift_common::error::{Error, ErrorKind};
use sift_parser::{Cmp, CmpOp, CmpValue, Node, RawValue};
use sift_schema::{cast, day_bounds, parse_date_only, Assoc, FieldType, SchemaView, Value};

/// The result of a successful compile.
///
/// All fragments use `?` placeholders; [`to_sql`] renumbers them to
/// `$1..$N` when the statement is assembled. A compile where every
/// predicate was dropped (or the input was empty) has no WHERE or HAVING
/// fragment; [`Compiled::has_predicates`] distinguishes that case so the
/// host can leave its base query untouched.
#[derive(Debug)]
pub struct Compiled {
    pub where_clause: Option<Fragment>,
    pub joins: Vec<JoinPlan>,
    /// Quoted column references to group by (the root primary key, when
    /// a contains-all aggregation is active).
    pub group_by: Vec<String>,
    pub having: Option<Fragment>,
    pub distinct: bool,
    /// `(alias, expression)` pairs added to the select list.
    pub select_add: Vec<(String, Fragment)>,
    pub meta: Meta,
}

impl Compiled {
    /// Whether any predicate survived compilation.
    pub fn has_predicates(&self) -> bool {
        self.where_clause.is_some() || self.having.is_some()
    }
}

/// Compile a filter expression against a schema.
pub fn compile(
    source: &str,
    view: &dyn SchemaView,
    options: &Options,
) -> Result<Compiled, Error> {
    let ast = sift_parser::parse(source)?;
    compile_ast(&ast, view, options)
}

/// Compile an already-parsed tree. Useful for hosts that build or rewrite
/// ASTs programmatically.
pub fn compile_ast(
    node: &Node,
    view: &dyn SchemaView,
    options: &Options,
) -> Result<Compiled, Error> {
    let root_table = view
        .table(&options.schema)
        .ok_or_else(|| Error::build(ErrorKind::UnknownSchema(options.schema.clone())))?;

    let mut builder = Builder {
        view,
        opts: options,
        allow: AllowList::from_entries(options.allowed_fields.as_deref()),
        root_table,
        join: None,
        having: Vec::new(),
        aggregated: false,
        warnings: Vec::new(),
        uses_full_text: false,
        select_add: Vec::new(),
        added_select_fields: Vec::new(),
        recommended_order: None,
        search_columns: None,
    };

    let where_clause = builder.lower(node)?;
    let having = Fragment::and_join(std::mem::take(&mut builder.having));

    let mut joins: Vec<JoinPlan> = builder.join.take().into_iter().collect();
    let mut group_by = Vec::new();
    let mut distinct = false;

    if where_clause.is_some() || having.is_some() {
        if builder.aggregated {
            let pk = builder
                .view
                .primary_key(&options.schema)
                .ok_or_else(|| Error::build(ErrorKind::UnknownSchema(options.schema.clone())))?;
            group_by.push(ColumnRef::new(builder.root_table.clone(), pk).sql());
        } else {
            distinct = joins.iter().any(|j| j.to_many);
        }
    } else {
        // Every predicate was dropped; a join with nothing referencing it
        // would only duplicate rows.
        joins.clear();
    }

    Ok(Compiled {
        where_clause,
        joins,
        group_by,
        having,
        distinct,
        select_add: builder.select_add,
        meta: Meta {
            uses_full_text: builder.uses_full_text,
            added_select_fields: builder.added_select_fields,
            recommended_order: builder.recommended_order,
            warnings: builder.warnings,
        },
    })
}

/// Compile and serialize to a full SELECT statement with `$N`
/// placeholders. Returns the SQL text, the bound parameters in order, and
/// the compile metadata.
pub fn to_sql(
    source: &str,
    view: &dyn SchemaView,
    options: &Options,
) -> Result<(String, Vec<Value>, Meta), Error> {
    let compiled = compile(source, view, options)?;
    let root_table = view
        .table(&options.schema)
        .ok_or_else(|| Error::build(ErrorKind::UnknownSchema(options.schema.clone())))?;
    Ok(assemble(compiled, &root_table))
}

fn assemble(compiled: Compiled, root_table: &str) -> (String, Vec<Value>, Meta) {
    let root = quote_ident(root_table);
    let mut sql = String::from("SELECT ");
    let mut params: Vec<Value> = Vec::new();
    let mut next = 1;

    if compiled.distinct {
        sql.push_str("DISTINCT ");
    }
    sql.push_str(&root);
    sql.push_str(".*");

    for (alias, expr) in &compiled.select_add {
        let (numbered, n) = number_placeholders(&expr.sql, next);
        next = n;
        sql.push_str(", ");
        sql.push_str(&numbered);
        sql.push_str(" AS ");
        sql.push_str(&quote_ident(alias));
        params.extend(expr.params.iter().cloned());
    }

    sql.push_str(" FROM ");
    sql.push_str(&root);

    for join in &compiled.joins {
        for clause in &join.clauses {
            sql.push(' ');
            sql.push_str(clause);
        }
    }

    if let Some(where_clause) = &compiled.where_clause {
        let (numbered, n) = number_placeholders(&where_clause.sql, next);
        next = n;
        sql.push_str(" WHERE ");
        sql.push_str(&numbered);
        params.extend(where_clause.params.iter().cloned());
    }

    if !compiled.group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&compiled.group_by.join(", "));
    }

    if let Some(having) = &compiled.having {
        let (numbered, _) = number_placeholders(&having.sql, next);
        sql.push_str(" HAVING ");
        sql.push_str(&numbered);
        params.extend(having.params.iter().cloned());
    }

    (sql, params, compiled.meta)
}

/// A resolved predicate target: the qualified column, its declared type,
/// and whether it was reached through a to-many association.
struct Target {
    col: ColumnRef,
    ty: FieldType,
    to_many_assoc: bool,
}

struct Builder<'a> {
    view: &'a dyn SchemaView,
    opts: &'a Options,
    allow: AllowList,
    root_table: String,
    join: Option<JoinPlan>,
    having: Vec<Fragment>,
    aggregated: bool,
    warnings: Vec<Warning>,
    uses_full_text: bool,
    select_add: Vec<(String, Fragment)>,
    added_select_fields: Vec<String>,
    recommended_order: Option<Vec<(String, Dir)>>,
    search_columns: Option<Vec<ColumnRef>>,
}

impl<'a> Builder<'a> {
    fn lower(&mut self, node: &Node) -> Result<Option<Fragment>, Error> {
        match node {
            Node::And(children) => {
                let mut fragments = Vec::new();
                for child in children {
                    if let Some(fragment) = self.lower(child)? {
                        fragments.push(fragment);
                    }
                }
                Ok(Fragment::and_join(fragments))
            }
            Node::Or(children) => {
                let mut fragments = Vec::new();
                for child in children {
                    if let Some(fragment) = self.lower(child)? {
                        fragments.push(fragment);
                    }
                }
                Ok(Fragment::or_join(fragments))
            }
            Node::Not(inner) => match inner.as_ref() {
                // Negated bare search terms have no WHERE-clause effect.
                Node::FullText { .. } => Ok(None),
                Node::Cmp(cmp) => self.lower_cmp(cmp, true),
                other => Ok(self.lower(other)?.map(Fragment::negate)),
            },
            Node::Cmp(cmp) => self.lower_cmp(cmp, false),
            Node::FullText { term } => self.lower_full_text(term),
        }
    }

    // ── Predicate lowering ─────────────────────────────────────────────

    fn lower_cmp(&mut self, cmp: &Cmp, negated: bool) -> Result<Option<Fragment>, Error> {
        let written = cmp.path.join(".");
        let Some(resolved) = self.allow.resolve(&cmp.path) else {
            return self.drop_predicate(
                self.opts.unknown_field,
                Warning::UnknownField {
                    path: written.clone(),
                },
                ErrorKind::UnknownField(written),
            );
        };
        let field = resolved.join(".");

        let for_contains_all = cmp.op == CmpOp::ContainsAll;
        let Some(target) = self.resolve_field(&resolved, for_contains_all)? else {
            return Ok(None);
        };

        match cmp.op {
            CmpOp::Eq | CmpOp::Neq => {
                let negated = negated ^ (cmp.op == CmpOp::Neq);
                let CmpValue::Single(raw) = &cmp.value else {
                    return Ok(None);
                };
                match raw {
                    RawValue::Null => Ok(Some(if negated {
                        predicate::is_not_null(&target.col)
                    } else {
                        predicate::is_null(&target.col)
                    })),
                    RawValue::Str(s) => {
                        if target.ty.is_datetime() {
                            if let Some(date) = parse_date_only(s) {
                                let (start, next) = day_bounds(&target.ty, date);
                                let fragment =
                                    predicate::date_only(&target.col, CmpOp::Eq, start, next);
                                return Ok(Some(negate_if(fragment, negated)));
                            }
                        }
                        let Some(value) = self.cast_with_policy(&target, s, &field)? else {
                            return Ok(None);
                        };
                        let op = if negated { CmpOp::Neq } else { CmpOp::Eq };
                        Ok(Some(predicate::scalar(&target.col, op, value)))
                    }
                }
            }

            CmpOp::Gt | CmpOp::Gte | CmpOp::Lt | CmpOp::Lte => {
                let CmpValue::Single(raw) = &cmp.value else {
                    return Ok(None);
                };
                match raw {
                    RawValue::Null => self.drop_predicate(
                        self.opts.invalid_cast,
                        Warning::InvalidCast {
                            field: field.clone(),
                            value: "NULL".into(),
                        },
                        ErrorKind::InvalidNullComparison(field),
                    ),
                    RawValue::Str(s) => {
                        if target.ty.is_datetime() {
                            if let Some(date) = parse_date_only(s) {
                                let (start, next) = day_bounds(&target.ty, date);
                                let fragment =
                                    predicate::date_only(&target.col, cmp.op, start, next);
                                return Ok(Some(negate_if(fragment, negated)));
                            }
                        }
                        let Some(value) = self.cast_with_policy(&target, s, &field)? else {
                            return Ok(None);
                        };
                        let fragment = predicate::scalar(&target.col, cmp.op, value);
                        Ok(Some(negate_if(fragment, negated)))
                    }
                }
            }

            CmpOp::StartsWith | CmpOp::EndsWith => {
                let CmpValue::Single(RawValue::Str(base)) = &cmp.value else {
                    return Ok(None);
                };
                let fragment = predicate::like(&target.col, cmp.op, base);
                Ok(Some(negate_if(fragment, negated)))
            }

            CmpOp::In | CmpOp::Nin => {
                let Some((values, has_null)) = self.cast_list(cmp, &target, &field)? else {
                    return Ok(None);
                };
                if values.is_empty() && !has_null {
                    return self.empty_in(&field, negated ^ (cmp.op == CmpOp::Nin));
                }
                let negated = negated ^ (cmp.op == CmpOp::Nin);
                Ok(Some(predicate::in_list(
                    &target.col,
                    values,
                    has_null,
                    negated,
                )))
            }

            CmpOp::ContainsAll => self.lower_contains_all(cmp, &target, &field, negated),
        }
    }

    fn lower_contains_all(
        &mut self,
        cmp: &Cmp,
        target: &Target,
        field: &str,
        negated: bool,
    ) -> Result<Option<Fragment>, Error> {
        if negated && target.to_many_assoc {
            return Err(Error::build(ErrorKind::UnsupportedNegation(
                "ALL over an association".into(),
            )));
        }

        let Some((values, _has_null)) = self.cast_list(cmp, target, field)? else {
            return Ok(None);
        };
        if values.is_empty() {
            return self.empty_in(field, negated);
        }

        if let FieldType::Array(element) = &target.ty {
            let fragment = predicate::contains_all_array(&target.col, element, values);
            return Ok(Some(negate_if(fragment, negated)));
        }

        if target.to_many_assoc {
            // Aggregation plan: restrict to matching rows, group by the
            // root key, and require every requested value to be present.
            let mut distinct = Vec::new();
            for value in &values {
                if !distinct.contains(value) {
                    distinct.push(value.clone());
                }
            }
            self.having.push(predicate::count_distinct_eq(
                &target.col,
                distinct.len() as i64,
            ));
            self.aggregated = true;
            return Ok(Some(predicate::in_list(&target.col, values, false, false)));
        }

        // Scalar column: a single value can never contain several, so the
        // predicate weakens to membership.
        self.warnings.push(Warning::DegradedContainsAll {
            field: field.to_string(),
        });
        Ok(Some(negate_if(
            predicate::in_list(&target.col, values, false, false),
            negated,
        )))
    }

    /// Cast every list element, dropping NULLs out into a flag. A cast
    /// failure applies the `invalid_cast` policy to the whole predicate.
    fn cast_list(
        &mut self,
        cmp: &Cmp,
        target: &Target,
        field: &str,
    ) -> Result<Option<(Vec<Value>, bool)>, Error> {
        let CmpValue::List(items) = &cmp.value else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(items.len());
        let mut has_null = false;
        for item in items {
            match item {
                RawValue::Null => has_null = true,
                RawValue::Str(s) => match self.cast_with_policy(target, s, field)? {
                    Some(value) => values.push(value),
                    None => return Ok(None),
                },
            }
        }
        Ok(Some((values, has_null)))
    }

    fn cast_with_policy(
        &mut self,
        target: &Target,
        raw: &str,
        field: &str,
    ) -> Result<Option<Value>, Error> {
        match cast(&target.ty, raw) {
            Ok(value) => Ok(Some(value)),
            Err(_) => self.drop_predicate(
                self.opts.invalid_cast,
                Warning::InvalidCast {
                    field: field.to_string(),
                    value: raw.to_string(),
                },
                ErrorKind::InvalidValue {
                    field: field.to_string(),
                    value: raw.to_string(),
                },
            ),
        }
    }

    fn empty_in(&mut self, field: &str, negated: bool) -> Result<Option<Fragment>, Error> {
        match self.opts.empty_in {
            EmptyIn::Drop => Ok(None),
            EmptyIn::ConstFalse => Ok(Some(Fragment::new(
                if negated { "1 = 1" } else { "1 = 0" },
                vec![],
            ))),
            EmptyIn::Error => Err(Error::build(ErrorKind::EmptyInList(field.to_string()))),
        }
    }

    // ── Field resolution ───────────────────────────────────────────────

    fn resolve_field(
        &mut self,
        path: &[String],
        for_contains_all: bool,
    ) -> Result<Option<Target>, Error> {
        let joined = path.join(".");
        match path {
            [field] => match self.view.field_type(&self.opts.schema, field) {
                Some(ty) => Ok(Some(Target {
                    col: ColumnRef::new(self.root_table.clone(), field.clone()),
                    ty,
                    to_many_assoc: false,
                })),
                None => self.drop_predicate(
                    self.opts.unknown_field,
                    Warning::UnknownField {
                        path: joined.clone(),
                    },
                    ErrorKind::UnknownField(joined),
                ),
            },
            [assoc_name, field] => {
                let Some(assoc) = self.view.association(&self.opts.schema, assoc_name) else {
                    return self.drop_predicate(
                        self.opts.unknown_assoc,
                        Warning::UnknownAssoc {
                            name: assoc_name.clone(),
                        },
                        ErrorKind::UnknownAssoc(assoc_name.clone()),
                    );
                };
                let Some(ty) = self.view.field_type(assoc.schema(), field) else {
                    return self.drop_predicate(
                        self.opts.unknown_field,
                        Warning::UnknownField {
                            path: joined.clone(),
                        },
                        ErrorKind::UnknownField(joined),
                    );
                };
                if !self.ensure_join(assoc_name, &assoc, for_contains_all)? {
                    return Ok(None);
                }
                let table = self
                    .view
                    .table(assoc.schema())
                    .ok_or_else(|| Error::build(ErrorKind::UnknownSchema(assoc.schema().into())))?;
                Ok(Some(Target {
                    col: ColumnRef::new(table, field.clone()),
                    ty,
                    to_many_assoc: assoc.is_to_many(),
                }))
            }
            // Only one association hop is supported.
            _ => self.drop_predicate(
                self.opts.unknown_field,
                Warning::UnknownField {
                    path: joined.clone(),
                },
                ErrorKind::UnknownField(joined),
            ),
        }
    }

    /// Plan the association join, or re-use the one already planned.
    /// Returns `Ok(false)` when the join was denied and the predicate
    /// should be dropped.
    fn ensure_join(
        &mut self,
        name: &str,
        assoc: &Assoc,
        for_contains_all: bool,
    ) -> Result<bool, Error> {
        if let Some(planned) = &self.join {
            if planned.assoc == name {
                return Ok(true);
            }
            return self.join_overflow(for_contains_all);
        }
        if self.opts.max_joins == 0 {
            return self.join_overflow(for_contains_all);
        }
        match join::plan(name, assoc, self.view, &self.opts.schema) {
            Some(plan) => {
                self.join = Some(plan);
                Ok(true)
            }
            None => Err(Error::build(ErrorKind::UnknownSchema(
                assoc.schema().to_string(),
            ))),
        }
    }

    fn join_overflow(&self, for_contains_all: bool) -> Result<bool, Error> {
        if for_contains_all {
            return Err(Error::build(ErrorKind::MultiAssocContainsAll));
        }
        match self.opts.join_overflow {
            JoinOverflow::Error => Err(Error::build(ErrorKind::TooManyJoins)),
            JoinOverflow::Ignore => Ok(false),
        }
    }

    fn drop_predicate<T>(
        &mut self,
        policy: Policy,
        warning: Warning,
        error: ErrorKind,
    ) -> Result<Option<T>, Error> {
        match policy {
            Policy::Ignore => Ok(None),
            Policy::Warn => {
                self.warnings.push(warning);
                Ok(None)
            }
            Policy::Error => Err(Error::build(error)),
        }
    }

    // ── Full-text ──────────────────────────────────────────────────────

    fn lower_full_text(&mut self, term: &str) -> Result<Option<Fragment>, Error> {
        let sanitized = match &self.opts.full_text_sanitizer {
            Some(sanitizer) => sanitizer.sanitize(term),
            None => match self.opts.tsquery_mode {
                TsQueryMode::Plainto => fulltext::sanitize_basic(term),
                TsQueryMode::Raw => fulltext::sanitize_strict(term),
            },
        };
        if sanitized.is_empty() {
            return Ok(None);
        }

        if let SearchStrategy::Column { column, .. } = &self.opts.search_strategy {
            if column.is_empty() {
                return Err(Error::build(ErrorKind::SearchMisconfigured(
                    "the column strategy requires a tsvector column name".into(),
                )));
            }
        }

        let columns = match self.opts.search_strategy {
            SearchStrategy::Column { .. } => Vec::new(),
            _ => self.search_columns()?,
        };

        let plan = fulltext::plan(
            &sanitized,
            &columns,
            &self.opts.search_strategy,
            self.opts.tsquery_mode,
            &self.root_table,
        );

        if let Some((alias, rank)) = plan.select_add {
            if !self.select_add.iter().any(|(existing, _)| *existing == alias) {
                self.added_select_fields.push(alias.clone());
                self.select_add.push((alias, rank));
            }
        }
        if let Some((alias, dir)) = plan.recommended_order {
            let order = self.recommended_order.get_or_insert_with(Vec::new);
            if !order.iter().any(|(existing, _)| *existing == alias) {
                order.push((alias, dir));
            }
        }
        if plan.predicate.is_some() {
            self.uses_full_text = true;
        }
        Ok(plan.predicate)
    }

    /// Resolve the configured search fields to columns, once per compile.
    /// Fields the schema cannot satisfy are skipped; dotted fields plan
    /// the association join like any predicate.
    fn search_columns(&mut self) -> Result<Vec<ColumnRef>, Error> {
        if let Some(columns) = &self.search_columns {
            return Ok(columns.clone());
        }

        let mut columns = Vec::new();
        let fields = self.opts.search_fields.clone();
        for field in &fields {
            let parts: Vec<&str> = field.split('.').collect();
            match parts.as_slice() {
                [name] => {
                    if let Some(ty) = self.view.field_type(&self.opts.schema, name) {
                        if ty.is_textual() {
                            columns.push(ColumnRef::new(self.root_table.clone(), *name));
                        }
                    }
                }
                [assoc_name, name] => {
                    let Some(assoc) = self.view.association(&self.opts.schema, assoc_name)
                    else {
                        continue;
                    };
                    let Some(ty) = self.view.field_type(assoc.schema(), name) else {
                        continue;
                    };
                    if !ty.is_textual() {
                        continue;
                    }
                    if self.ensure_join(assoc_name, &assoc, false)? {
                        if let Some(table) = self.view.table(assoc.schema()) {
                            columns.push(ColumnRef::new(table, *name));
                        }
                    }
                }
                _ => {}
            }
        }

        self.search_columns = Some(columns.clone());
        Ok(columns)
    }
}

fn negate_if(fragment: Fragment, negated: bool) -> Fragment {
    if negated {
        fragment.negate()
    } else {
        fragment
    }
}
