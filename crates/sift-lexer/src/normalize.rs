//! Snake-case normalization for field identifiers.
//!
//! User-facing filter syntax accepts `createdAt`, `created-at`, and
//! `created_at` interchangeably; the compiler resolves all of them against
//! snake_case schema field names. Normalization is applied per dot-separated
//! segment so association paths like `organization.displayName` keep their
//! structure.

/// Normalize a dotted field path, segment by segment.
pub fn normalize_path(raw: &str) -> String {
    raw.split('.')
        .map(snake_segment)
        .collect::<Vec<_>>()
        .join(".")
}

/// Convert one path segment to snake_case.
///
/// An underscore is inserted only at a lowercase-or-digit to uppercase
/// transition, so acronym runs stay joined (`NOTAPI` becomes `notapi`, not
/// `not_api`). Dashes and spaces map to underscores, consecutive
/// underscores collapse, and everything is lowercased. The function is
/// idempotent.
fn snake_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 4);
    let mut prev_lower_or_digit = false;
    let mut prev_underscore = false;

    for c in segment.chars() {
        if c == '-' || c == ' ' || c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
            prev_lower_or_digit = false;
            continue;
        }

        if c.is_ascii_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(c.to_ascii_lowercase());
            prev_lower_or_digit = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
        prev_underscore = false;
    }

    out
}
