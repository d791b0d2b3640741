//! The field allow-list: which user-visible paths a compile admits, and
//! the alias substitutions applied before schema resolution.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::options::AllowEntry;

/// An immutable allow-list built from the caller's `allowed_fields`.
///
/// The allow-list is a trust declaration, not a schema: entries that
/// don't resolve against the schema later are simply fields the user is
/// permitted to mention. With `allow_all` every parseable path is
/// admitted and only the schema decides.
#[derive(Debug, Clone)]
pub struct AllowList {
    allow_all: bool,
    allowed: FxHashSet<String>,
    aliases: FxHashMap<String, String>,
}

impl AllowList {
    /// Build from the options entry list. `None` admits everything.
    pub fn from_entries(entries: Option<&[AllowEntry]>) -> Self {
        let Some(entries) = entries else {
            return Self {
                allow_all: true,
                allowed: FxHashSet::default(),
                aliases: FxHashMap::default(),
            };
        };

        let mut allowed = FxHashSet::default();
        let mut aliases = FxHashMap::default();
        for entry in entries {
            match entry {
                AllowEntry::Path(path) => {
                    allowed.insert(path.clone());
                }
                AllowEntry::Alias { alias, field } => {
                    aliases.insert(alias.clone(), field.clone());
                }
            }
        }

        Self {
            allow_all: false,
            allowed,
            aliases,
        }
    }

    /// Resolve a parsed field path to its canonical form.
    ///
    /// Aliases substitute the whole path; plain entries admit it
    /// unchanged. Returns `None` when the path is outside the list (the
    /// caller applies the `unknown_field` policy).
    pub fn resolve(&self, path: &[String]) -> Option<Vec<String>> {
        if self.allow_all {
            return Some(path.to_vec());
        }

        let joined = path.join(".");
        if let Some(target) = self.aliases.get(&joined) {
            return Some(target.split('.').map(str::to_string).collect());
        }
        if self.allowed.contains(&joined) {
            return Some(path.to_vec());
        }
        if path.len() == 1 && self.allowed.contains(&path[0]) {
            return Some(path.to_vec());
        }
        None
    }
}
