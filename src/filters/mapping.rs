use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::pathspec::PathSpec;
use crate::registry::Source;

/// The reason a request is being routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchType {
    /// Fresh arrival from the connection layer
    Request,
    /// Internal forward to another target
    Forward,
    /// Internal include of another target's output
    Include,
    /// Error-page handling
    Error,
    /// Asynchronous continuation
    Async,
}

impl DispatchType {
    /// Number of dispatch types; sizes the per-type cache arrays.
    pub const COUNT: usize = 5;

    /// All dispatch types in bit order.
    pub const ALL: [DispatchType; DispatchType::COUNT] = [
        DispatchType::Request,
        DispatchType::Forward,
        DispatchType::Include,
        DispatchType::Error,
        DispatchType::Async,
    ];

    /// The bit this type occupies in a [`DispatchMask`].
    pub const fn bit(self) -> u8 {
        match self {
            DispatchType::Request => 1,
            DispatchType::Forward => 2,
            DispatchType::Include => 4,
            DispatchType::Error => 8,
            DispatchType::Async => 16,
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            DispatchType::Request => 0,
            DispatchType::Forward => 1,
            DispatchType::Include => 2,
            DispatchType::Error => 3,
            DispatchType::Async => 4,
        }
    }
}

impl fmt::Display for DispatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchType::Request => f.write_str("REQUEST"),
            DispatchType::Forward => f.write_str("FORWARD"),
            DispatchType::Include => f.write_str("INCLUDE"),
            DispatchType::Error => f.write_str("ERROR"),
            DispatchType::Async => f.write_str("ASYNC"),
        }
    }
}

/// Bitmask over dispatch types carried by a filter mapping.
///
/// REQUEST=1, FORWARD=2, INCLUDE=4, ERROR=8, ASYNC=16. The default mask
/// when a mapping does not specify one is REQUEST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchMask(u8);

impl DispatchMask {
    pub const REQUEST: DispatchMask = DispatchMask(DispatchType::Request.bit());
    pub const FORWARD: DispatchMask = DispatchMask(DispatchType::Forward.bit());
    pub const INCLUDE: DispatchMask = DispatchMask(DispatchType::Include.bit());
    pub const ERROR: DispatchMask = DispatchMask(DispatchType::Error.bit());
    pub const ASYNC: DispatchMask = DispatchMask(DispatchType::Async.bit());
    /// All five bits set.
    pub const ALL: DispatchMask = DispatchMask(0b1_1111);

    /// Build a mask from a list of dispatch types.
    pub fn of(types: &[DispatchType]) -> Self {
        DispatchMask(types.iter().fold(0, |bits, t| bits | t.bit()))
    }

    pub const fn contains(self, dispatch: DispatchType) -> bool {
        self.0 & dispatch.bit() != 0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl Default for DispatchMask {
    fn default() -> Self {
        DispatchMask::REQUEST
    }
}

impl From<DispatchType> for DispatchMask {
    fn from(dispatch: DispatchType) -> Self {
        DispatchMask(dispatch.bit())
    }
}

impl std::ops::BitOr for DispatchMask {
    type Output = DispatchMask;

    fn bitor(self, rhs: DispatchMask) -> DispatchMask {
        DispatchMask(self.0 | rhs.0)
    }
}

/// Wildcard target name matching every handler.
pub const ALL_TARGETS: &str = "*";

/// Declares which requests a filter applies to: by path patterns, by
/// target handler names (including the `*` wildcard), or both, further
/// narrowed by a dispatch-type mask.
#[derive(Debug, Clone)]
pub struct FilterMapping {
    filter_name: String,
    path_specs: Vec<Arc<PathSpec>>,
    target_names: Vec<String>,
    dispatches: DispatchMask,
    source: Source,
}

impl FilterMapping {
    /// A mapping for the named filter with no patterns or targets yet.
    /// Add at least one of either before registering it.
    pub fn new(filter_name: impl Into<String>, source: Source) -> Self {
        FilterMapping {
            filter_name: filter_name.into(),
            path_specs: Vec::new(),
            target_names: Vec::new(),
            dispatches: DispatchMask::default(),
            source,
        }
    }

    /// Add a path pattern this mapping applies to.
    pub fn with_path_spec(mut self, declaration: &str) -> Result<Self, ConfigError> {
        self.path_specs.push(Arc::new(PathSpec::new(declaration)?));
        Ok(self)
    }

    /// Add a target handler name (or [`ALL_TARGETS`]).
    pub fn with_target_name(mut self, name: impl Into<String>) -> Self {
        self.target_names.push(name.into());
        self
    }

    /// Replace the dispatch-type mask (defaults to REQUEST).
    pub fn with_dispatches(mut self, dispatches: DispatchMask) -> Self {
        self.dispatches = dispatches;
        self
    }

    pub fn filter_name(&self) -> &str {
        &self.filter_name
    }

    pub fn path_specs(&self) -> &[Arc<PathSpec>] {
        &self.path_specs
    }

    pub fn target_names(&self) -> &[String] {
        &self.target_names
    }

    pub fn dispatches(&self) -> DispatchMask {
        self.dispatches
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Does the mapping apply for this dispatch type?
    pub fn applies_to(&self, dispatch: DispatchType) -> bool {
        self.dispatches.contains(dispatch)
    }

    /// Does the mapping apply to this path under this dispatch type?
    pub fn applies_to_path(&self, path: &str, dispatch: DispatchType) -> bool {
        self.applies_to(dispatch) && self.path_specs.iter().any(|spec| spec.matches(path))
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.path_specs.is_empty() && self.target_names.is_empty() {
            return Err(ConfigError::EmptyFilterMapping {
                name: self.filter_name.clone(),
            });
        }
        Ok(())
    }
}
