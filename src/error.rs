use std::fmt;

/// Configuration error raised while rebuilding the derived dispatch tables.
///
/// Raised synchronously by [`crate::Dispatcher::rebuild`] (and by the
/// registration API when it triggers a rebuild). The mutation that caused it
/// is abandoned and the previously published tables keep serving lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A pattern string is not a valid exact, prefix, suffix, root or
    /// default declaration.
    InvalidPathSpec {
        /// The offending pattern string
        declaration: String,
    },
    /// A filter mapping references a filter name that is not registered.
    UnknownFilter {
        /// The missing filter name
        name: String,
    },
    /// A handler mapping references a handler name that is not registered.
    UnknownHandler {
        /// The missing handler name
        name: String,
    },
    /// Two holders were registered under the same name.
    DuplicateName {
        /// The contested name
        name: String,
    },
    /// More than one non-default mapping claims the same path pattern and
    /// duplicate mappings are not allowed.
    DuplicateMapping {
        /// The contested pattern
        path: String,
        /// Handler name of the mapping declared first
        existing: String,
        /// Handler name of the mapping declared later
        conflicting: String,
    },
    /// A filter mapping carries neither path patterns nor target names.
    EmptyFilterMapping {
        /// The filter name of the unusable mapping
        name: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPathSpec { declaration } => {
                write!(f, "invalid path pattern '{}'", declaration)
            }
            ConfigError::UnknownFilter { name } => {
                write!(f, "no filter named '{}'", name)
            }
            ConfigError::UnknownHandler { name } => {
                write!(f, "no handler named '{}'", name)
            }
            ConfigError::DuplicateName { name } => {
                write!(f, "a holder named '{}' is already registered", name)
            }
            ConfigError::DuplicateMapping {
                path,
                existing,
                conflicting,
            } => {
                write!(
                    f,
                    "multiple handlers map to path '{}': '{}' and '{}'",
                    path, existing, conflicting
                )
            }
            ConfigError::EmptyFilterMapping { name } => {
                write!(
                    f,
                    "filter mapping for '{}' has neither path patterns nor target names",
                    name
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Accumulates failures from multi-component start/stop.
///
/// Individual failures are collected so teardown of unrelated components
/// still runs; the aggregate is raised once at the end via
/// [`LifecycleErrors::into_result`].
#[derive(Debug, Default)]
pub struct LifecycleErrors {
    errors: Vec<anyhow::Error>,
}

impl LifecycleErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one component failure.
    pub fn push(&mut self, err: anyhow::Error) {
        self.errors.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// `Ok(())` when nothing failed, otherwise the aggregate error.
    pub fn into_result(self) -> anyhow::Result<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(anyhow::Error::new(self))
    }
}

impl fmt::Display for LifecycleErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lifecycle failure(s):", self.errors.len())?;
        for err in &self.errors {
            write!(f, " [{}]", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for LifecycleErrors {}
