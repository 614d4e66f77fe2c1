use std::fmt;

use crate::error::ConfigError;

/// Classification of a URL pattern declaration.
///
/// Groups are strictly ordered by match priority: `Exact` beats `Prefix`
/// (longer prefixes beat shorter ones), which beats `Suffix`, which beats
/// `Root`, which beats `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathSpecGroup {
    /// The empty declaration `""`; matches only the path `/`
    Root,
    /// A literal path such as `/a/b`
    Exact,
    /// A wildcard prefix such as `/a/*`
    Prefix,
    /// An extension pattern such as `*.jsp`
    Suffix,
    /// The declaration `/`; matches every path
    Default,
}

impl PathSpecGroup {
    /// Rank used as the major key of the specificity order.
    fn rank(self) -> u8 {
        match self {
            PathSpecGroup::Exact => 4,
            PathSpecGroup::Prefix => 3,
            PathSpecGroup::Suffix => 2,
            PathSpecGroup::Root => 1,
            PathSpecGroup::Default => 0,
        }
    }
}

/// The servlet-path/path-info split produced by matching a pattern
/// against a concrete request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSplit<'p> {
    /// The part of the path that selected the handler
    pub servlet_path: &'p str,
    /// The remainder below the matched part, if any
    pub path_info: Option<&'p str>,
}

/// An immutable, parsed URL pattern.
///
/// Four declaration shapes are accepted, plus the two special forms:
///
/// - `/a/b` — exact match
/// - `/a/*` — prefix match (also matches `/a` itself)
/// - `*.ext` — suffix match on the last path segment's extension
/// - `""` — root; matches only `/`
/// - `/` — default; matches everything
///
/// Anything else is rejected with [`ConfigError::InvalidPathSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
    declaration: String,
    group: PathSpecGroup,
    /// For `Prefix`: the declaration without the trailing `/*`.
    /// For `Suffix`: the declaration without the leading `*`.
    stem: String,
}

impl PathSpec {
    /// Parse and classify a pattern declaration.
    pub fn new(declaration: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidPathSpec {
            declaration: declaration.to_string(),
        };

        if declaration.is_empty() {
            return Ok(PathSpec {
                declaration: String::new(),
                group: PathSpecGroup::Root,
                stem: String::new(),
            });
        }
        if declaration == "/" {
            return Ok(PathSpec {
                declaration: declaration.to_string(),
                group: PathSpecGroup::Default,
                stem: String::new(),
            });
        }
        if let Some(suffix) = declaration.strip_prefix("*.") {
            if suffix.is_empty() || suffix.contains('*') || suffix.contains('/') {
                return Err(invalid());
            }
            // stem keeps the dot so "/x.jsp" can be matched with ends_with
            return Ok(PathSpec {
                declaration: declaration.to_string(),
                group: PathSpecGroup::Suffix,
                stem: declaration[1..].to_string(),
            });
        }
        if declaration.starts_with('/') {
            if let Some(prefix) = declaration.strip_suffix("/*") {
                if prefix.contains('*') {
                    return Err(invalid());
                }
                return Ok(PathSpec {
                    declaration: declaration.to_string(),
                    group: PathSpecGroup::Prefix,
                    stem: prefix.to_string(),
                });
            }
            if declaration.contains('*') {
                return Err(invalid());
            }
            return Ok(PathSpec {
                declaration: declaration.to_string(),
                group: PathSpecGroup::Exact,
                stem: String::new(),
            });
        }
        Err(invalid())
    }

    /// The original pattern string.
    pub fn declaration(&self) -> &str {
        &self.declaration
    }

    pub fn group(&self) -> PathSpecGroup {
        self.group
    }

    /// For prefix patterns, the declaration without the trailing `/*`.
    pub fn prefix(&self) -> Option<&str> {
        match self.group {
            PathSpecGroup::Prefix => Some(&self.stem),
            _ => None,
        }
    }

    /// For suffix patterns, the extension including the leading dot.
    pub fn suffix(&self) -> Option<&str> {
        match self.group {
            PathSpecGroup::Suffix => Some(&self.stem),
            _ => None,
        }
    }

    /// Does this pattern match the given path-within-context?
    pub fn matches(&self, path: &str) -> bool {
        match self.group {
            PathSpecGroup::Exact => path == self.declaration,
            PathSpecGroup::Prefix => {
                path == self.stem
                    || (path.len() > self.stem.len()
                        && path.starts_with(&self.stem)
                        && path.as_bytes()[self.stem.len()] == b'/')
            }
            PathSpecGroup::Suffix => path.ends_with(&self.stem) && path.len() > self.stem.len(),
            PathSpecGroup::Root => path == "/",
            PathSpecGroup::Default => true,
        }
    }

    /// Specificity key: higher compares greater. The major key is the
    /// group rank, the minor key the declaration length, which orders
    /// longer prefixes above shorter ones.
    pub fn specificity(&self) -> (u8, usize) {
        (self.group.rank(), self.declaration.len())
    }

    /// Split a matching path into its servlet-path and path-info parts.
    ///
    /// Returns `None` when the path does not match this pattern.
    pub fn split<'p>(&self, path: &'p str) -> Option<PathSplit<'p>> {
        if !self.matches(path) {
            return None;
        }
        let split = match self.group {
            PathSpecGroup::Exact | PathSpecGroup::Suffix | PathSpecGroup::Default => PathSplit {
                servlet_path: path,
                path_info: None,
            },
            PathSpecGroup::Root => PathSplit {
                servlet_path: "",
                path_info: Some(path),
            },
            PathSpecGroup::Prefix => {
                let rest = &path[self.stem.len()..];
                PathSplit {
                    servlet_path: &path[..self.stem.len()],
                    path_info: if rest.is_empty() { None } else { Some(rest) },
                }
            }
        };
        Some(split)
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.declaration.is_empty() {
            f.write_str("\"\"")
        } else {
            f.write_str(&self.declaration)
        }
    }
}
