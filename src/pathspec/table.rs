use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::core::{PathSpec, PathSpecGroup};

/// Ordered collection of `(PathSpec, value)` entries answering best-match
/// lookups.
///
/// Exact patterns live in a hash map, prefix patterns in a list kept
/// sorted longest-first, suffix patterns in declaration order, and the
/// root and default patterns in single slots. A lookup consults them in
/// that order, which realizes the total specificity order of
/// [`PathSpec::specificity`].
///
/// The table is built once per rebuild and never mutated afterwards;
/// lookups take `&self` and are safe to run concurrently.
#[derive(Debug)]
pub struct PathMap<T> {
    exact: HashMap<String, (Arc<PathSpec>, T)>,
    prefixes: Vec<(Arc<PathSpec>, T)>,
    suffixes: Vec<(Arc<PathSpec>, T)>,
    root: Option<(Arc<PathSpec>, T)>,
    default: Option<(Arc<PathSpec>, T)>,
    len: usize,
}

impl<T> Default for PathMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PathMap<T> {
    pub fn new() -> Self {
        PathMap {
            exact: HashMap::new(),
            prefixes: Vec::new(),
            suffixes: Vec::new(),
            root: None,
            default: None,
            len: 0,
        }
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert an entry. A duplicate declaration replaces the previous
    /// entry; conflict resolution happens before the table is built.
    pub fn insert(&mut self, spec: Arc<PathSpec>, value: T) {
        self.len += 1;
        match spec.group() {
            PathSpecGroup::Exact => {
                if self
                    .exact
                    .insert(spec.declaration().to_string(), (spec, value))
                    .is_some()
                {
                    self.len -= 1;
                }
            }
            PathSpecGroup::Prefix => {
                if let Some(slot) = self
                    .prefixes
                    .iter_mut()
                    .find(|(s, _)| s.declaration() == spec.declaration())
                {
                    *slot = (spec, value);
                    self.len -= 1;
                } else {
                    self.prefixes.push((spec, value));
                    // longest prefix first; stable so equal lengths keep
                    // insertion order (lengths are unique after conflict
                    // resolution anyway)
                    self.prefixes
                        .sort_by(|(a, _), (b, _)| b.declaration().len().cmp(&a.declaration().len()));
                }
            }
            PathSpecGroup::Suffix => {
                if let Some(slot) = self
                    .suffixes
                    .iter_mut()
                    .find(|(s, _)| s.declaration() == spec.declaration())
                {
                    *slot = (spec, value);
                    self.len -= 1;
                } else {
                    self.suffixes.push((spec, value));
                }
            }
            PathSpecGroup::Root => {
                if self.root.replace((spec, value)).is_some() {
                    self.len -= 1;
                }
            }
            PathSpecGroup::Default => {
                if self.default.replace((spec, value)).is_some() {
                    self.len -= 1;
                }
            }
        }
    }

    /// Return the single best entry for `path`, or `None` when nothing
    /// matches (possible only when no default pattern is present).
    pub fn best_match(&self, path: &str) -> Option<(&Arc<PathSpec>, &T)> {
        if let Some((spec, value)) = self.exact.get(path) {
            debug!(path = %path, pattern = %spec, "Exact pattern matched");
            return Some((spec, value));
        }
        for (spec, value) in &self.prefixes {
            if spec.matches(path) {
                debug!(path = %path, pattern = %spec, "Prefix pattern matched");
                return Some((spec, value));
            }
        }
        for (spec, value) in &self.suffixes {
            if spec.matches(path) {
                debug!(path = %path, pattern = %spec, "Suffix pattern matched");
                return Some((spec, value));
            }
        }
        if path == "/" {
            if let Some((spec, value)) = &self.root {
                debug!(path = %path, "Root pattern matched");
                return Some((spec, value));
            }
        }
        if let Some((spec, value)) = &self.default {
            debug!(path = %path, "Default pattern matched");
            return Some((spec, value));
        }
        None
    }

    /// Iterate all entries in group order (exact, prefix, suffix, root,
    /// default). Used for diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<PathSpec>, &T)> {
        self.exact
            .values()
            .chain(self.prefixes.iter())
            .chain(self.suffixes.iter())
            .chain(self.root.iter())
            .chain(self.default.iter())
            .map(|(s, v)| (s, v))
    }
}
