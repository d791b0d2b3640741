//! Typed AST for filter expressions.
//!
//! The parser produces a small closed sum: boolean connectives, negation,
//! field comparisons, and full-text terms. Boolean nodes are kept flat --
//! an `And` never directly contains another `And`, and likewise for `Or` --
//! so equivalent expressions produce structurally identical trees.

use serde::Serialize;

/// A node of the filter AST.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    /// Conjunction of two or more children (zero children for an empty
    /// expression).
    And(Vec<Node>),
    /// Disjunction of two or more children.
    Or(Vec<Node>),
    /// Negation of a single term.
    Not(Box<Node>),
    /// A field comparison.
    Cmp(Cmp),
    /// A bare or quoted full-text term.
    FullText { term: String },
}

/// A comparison predicate: `field_path op value`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cmp {
    /// Dot-separated, snake-case-normalized path. Never empty.
    pub path: Vec<String>,
    pub op: CmpOp,
    pub value: CmpValue,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CmpOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    ContainsAll,
    StartsWith,
    EndsWith,
}

/// The right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CmpValue {
    Single(RawValue),
    /// Always non-empty; the parser rejects `IN ()`.
    List(Vec<RawValue>),
}

/// A literal as parsed, before schema-typed coercion. Unquoted `NULL` is
/// SQL null; everything else is a string at this stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RawValue {
    Null,
    Str(String),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Null => None,
            RawValue::Str(s) => Some(s),
        }
    }
}

impl Node {
    /// Whether the tree contains no predicates at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, Node::And(children) | Node::Or(children) if children.is_empty())
    }

    /// Join two nodes with AND, splicing children of existing `And` nodes
    /// so the tree stays flat.
    pub fn and(lhs: Node, rhs: Node) -> Node {
        match (lhs, rhs) {
            (Node::And(mut left), Node::And(right)) => {
                left.extend(right);
                Node::And(left)
            }
            (Node::And(mut left), rhs) => {
                left.push(rhs);
                Node::And(left)
            }
            (lhs, Node::And(right)) => {
                let mut children = Vec::with_capacity(right.len() + 1);
                children.push(lhs);
                children.extend(right);
                Node::And(children)
            }
            (lhs, rhs) => Node::And(vec![lhs, rhs]),
        }
    }

    /// Join two nodes with OR, splicing like [`Node::and`].
    pub fn or(lhs: Node, rhs: Node) -> Node {
        match (lhs, rhs) {
            (Node::Or(mut left), Node::Or(right)) => {
                left.extend(right);
                Node::Or(left)
            }
            (Node::Or(mut left), rhs) => {
                left.push(rhs);
                Node::Or(left)
            }
            (lhs, Node::Or(right)) => {
                let mut children = Vec::with_capacity(right.len() + 1);
                children.push(lhs);
                children.extend(right);
                Node::Or(children)
            }
            (lhs, rhs) => Node::Or(vec![lhs, rhs]),
        }
    }

    /// Re-emit the canonical filter expression for this tree.
    ///
    /// Parsing the result yields the same tree back (modulo connector
    /// flattening, which the parser re-applies).
    pub fn to_query_string(&self) -> String {
        let mut out = String::new();
        self.print(&mut out);
        out
    }

    fn print(&self, out: &mut String) {
        match self {
            Node::And(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" AND ");
                    }
                    // OR binds looser than AND, so OR children need parens.
                    if matches!(child, Node::Or(_)) {
                        out.push('(');
                        child.print(out);
                        out.push(')');
                    } else {
                        child.print(out);
                    }
                }
            }
            Node::Or(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" OR ");
                    }
                    child.print(out);
                }
            }
            Node::Not(inner) => {
                out.push_str("NOT ");
                if matches!(inner.as_ref(), Node::And(_) | Node::Or(_)) {
                    out.push('(');
                    inner.print(out);
                    out.push(')');
                } else {
                    inner.print(out);
                }
            }
            Node::Cmp(cmp) => cmp.print(out),
            Node::FullText { term } => print_value_str(term, out),
        }
    }
}

impl Cmp {
    fn print(&self, out: &mut String) {
        if self.op == CmpOp::Neq {
            // Reverse form; the parser itself produces Not(Eq).
            out.push_str("NOT ");
        }
        out.push_str(&self.path.join("."));
        match (&self.op, &self.value) {
            (CmpOp::Eq | CmpOp::Neq, CmpValue::Single(v)) => {
                out.push(':');
                print_value(v, out);
            }
            (CmpOp::StartsWith, CmpValue::Single(v)) => {
                out.push(':');
                out.push_str(v.as_str().unwrap_or_default());
                out.push('*');
            }
            (CmpOp::EndsWith, CmpValue::Single(v)) => {
                out.push_str(":*");
                out.push_str(v.as_str().unwrap_or_default());
            }
            (CmpOp::Gt, CmpValue::Single(v)) => {
                out.push('>');
                print_value(v, out);
            }
            (CmpOp::Gte, CmpValue::Single(v)) => {
                out.push_str(">=");
                print_value(v, out);
            }
            (CmpOp::Lt, CmpValue::Single(v)) => {
                out.push('<');
                print_value(v, out);
            }
            (CmpOp::Lte, CmpValue::Single(v)) => {
                out.push_str("<=");
                print_value(v, out);
            }
            (CmpOp::In, CmpValue::List(items)) => print_list(" IN ", items, out),
            (CmpOp::Nin, CmpValue::List(items)) => print_list(" NOT IN ", items, out),
            (CmpOp::ContainsAll, CmpValue::List(items)) => print_list(" ALL ", items, out),
            // Shape mismatches cannot be produced by the parser; print the
            // value as-is so the output stays debuggable.
            (_, CmpValue::Single(v)) => {
                out.push(':');
                print_value(v, out);
            }
            (_, CmpValue::List(items)) => print_list(" IN ", items, out),
        }
    }
}

fn print_list(keyword: &str, items: &[RawValue], out: &mut String) {
    out.push_str(keyword);
    out.push('(');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        print_value(item, out);
    }
    out.push(')');
}

fn print_value(value: &RawValue, out: &mut String) {
    match value {
        RawValue::Null => out.push_str("NULL"),
        RawValue::Str(s) => print_value_str(s, out),
    }
}

fn print_value_str(s: &str, out: &mut String) {
    if needs_quoting(s) {
        out.push('\'');
        for c in s.chars() {
            if c == '\'' || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('\'');
    } else {
        out.push_str(s);
    }
}

/// Whether a value must be quoted to survive a round trip through the
/// lexer unchanged.
fn needs_quoting(s: &str) -> bool {
    s.is_empty()
        || s == "NULL"
        || s == "AND"
        || s == "OR"
        || s == "NOT"
        || s.starts_with('-')
        || s.contains('*')
        || s.chars().any(|c| {
            matches!(
                c,
                ' ' | '\t' | '\r' | '\n' | '(' | ')' | ':' | '<' | '>' | '=' | ',' | '\'' | '"'
            )
        })
}
