//! Join planning for the single supported association hop.

use sift_schema::{Assoc, SchemaView};

use crate::fragment::quote_ident;

/// The planned join for one association, as ready-to-append SQL clauses.
/// Many-to-many associations need two clauses (join table first).
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPlan {
    /// Association name as declared on the root schema.
    pub assoc: String,
    pub clauses: Vec<String>,
    /// Whether rows can multiply through this join (drives DISTINCT or
    /// the grouping plan).
    pub to_many: bool,
}

/// Build the join clauses for an association. Returns `None` when the
/// view lacks table metadata for either side.
pub fn plan(
    name: &str,
    assoc: &Assoc,
    view: &dyn SchemaView,
    root_schema: &str,
) -> Option<JoinPlan> {
    let root = quote_ident(&view.table(root_schema)?);
    let target = quote_ident(&view.table(assoc.schema())?);

    let clauses = match assoc {
        Assoc::BelongsTo {
            owner_key,
            related_key,
            ..
        } => vec![format!(
            "LEFT JOIN {target} ON {root}.{} = {target}.{}",
            quote_ident(owner_key),
            quote_ident(related_key)
        )],
        Assoc::HasOne {
            owner_key,
            related_key,
            ..
        }
        | Assoc::HasMany {
            owner_key,
            related_key,
            ..
        } => vec![format!(
            "LEFT JOIN {target} ON {target}.{} = {root}.{}",
            quote_ident(related_key),
            quote_ident(owner_key)
        )],
        Assoc::ManyToMany {
            join_table,
            join_owner_key,
            join_related_key,
            related_key,
            ..
        } => {
            let root_pk = quote_ident(&view.primary_key(root_schema)?);
            let junction = quote_ident(join_table);
            vec![
                format!(
                    "LEFT JOIN {junction} ON {junction}.{} = {root}.{root_pk}",
                    quote_ident(join_owner_key)
                ),
                format!(
                    "LEFT JOIN {target} ON {target}.{} = {junction}.{}",
                    quote_ident(related_key),
                    quote_ident(join_related_key)
                ),
            ]
        }
    };

    Some(JoinPlan {
        assoc: name.to_string(),
        clauses,
        to_many: assoc.is_to_many(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_schema::{FieldType, SchemaSet, TableSchema};

    fn catalog() -> SchemaSet {
        SchemaSet::new()
            .define(
                "events",
                TableSchema::new("events").field("status", FieldType::Text),
            )
            .define(
                "organizations",
                TableSchema::new("organizations").field("name", FieldType::Text),
            )
            .define("tags", TableSchema::new("tags").field("name", FieldType::Text))
    }

    #[test]
    fn belongs_to_join() {
        let assoc = Assoc::BelongsTo {
            schema: "organizations".into(),
            owner_key: "organization_id".into(),
            related_key: "id".into(),
        };
        let plan = plan("organization", &assoc, &catalog(), "events").unwrap();
        assert_eq!(
            plan.clauses,
            vec![
                "LEFT JOIN \"organizations\" ON \"events\".\"organization_id\" = \"organizations\".\"id\""
            ]
        );
        assert!(!plan.to_many);
    }

    #[test]
    fn has_many_join() {
        let assoc = Assoc::HasMany {
            schema: "organizations".into(),
            owner_key: "id".into(),
            related_key: "event_id".into(),
        };
        let plan = plan("organization", &assoc, &catalog(), "events").unwrap();
        assert_eq!(
            plan.clauses,
            vec!["LEFT JOIN \"organizations\" ON \"organizations\".\"event_id\" = \"events\".\"id\""]
        );
        assert!(plan.to_many);
    }

    #[test]
    fn many_to_many_needs_two_clauses() {
        let assoc = Assoc::ManyToMany {
            schema: "tags".into(),
            join_table: "event_tags".into(),
            join_owner_key: "event_id".into(),
            join_related_key: "tag_id".into(),
            related_key: "id".into(),
        };
        let plan = plan("tags", &assoc, &catalog(), "events").unwrap();
        assert_eq!(
            plan.clauses,
            vec![
                "LEFT JOIN \"event_tags\" ON \"event_tags\".\"event_id\" = \"events\".\"id\"",
                "LEFT JOIN \"tags\" ON \"tags\".\"id\" = \"event_tags\".\"tag_id\"",
            ]
        );
        assert!(plan.to_many);
    }
}
