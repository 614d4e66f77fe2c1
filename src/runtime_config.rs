//! Environment-driven runtime settings.
//!
//! Two variables tune the chain cache:
//!
//! - `CORRIDOR_CHAIN_CACHE` — `off`, `false` or `0` disables chain
//!   caching; anything else (or unset) leaves it on.
//! - `CORRIDOR_CHAIN_CACHE_SIZE` — per-dispatch-type bound on cached
//!   chains; `0` removes the bound. Defaults to 512.
//!
//! Unparseable values fall back to the defaults.

use std::env;

use crate::filters::DEFAULT_MAX_CACHED_CHAINS;

/// Runtime configuration loaded from environment variables.
///
/// Load at startup with [`RuntimeConfig::from_env`] and hand to
/// [`crate::Dispatcher::with_config`], or rely on
/// [`crate::Dispatcher::new`] which uses the defaults.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Whether built chains are cached (default: true)
    pub chain_cache_enabled: bool,
    /// Per-dispatch-type bound on cached chains; 0 = unbounded
    /// (default: 512)
    pub max_cached_chains: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            chain_cache_enabled: true,
            max_cached_chains: DEFAULT_MAX_CACHED_CHAINS,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let chain_cache_enabled = match env::var("CORRIDOR_CHAIN_CACHE") {
            Ok(val) => !matches!(val.to_ascii_lowercase().as_str(), "off" | "false" | "0"),
            Err(_) => true,
        };
        let max_cached_chains = env::var("CORRIDOR_CHAIN_CACHE_SIZE")
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or(DEFAULT_MAX_CACHED_CHAINS);

        RuntimeConfig {
            chain_cache_enabled,
            max_cached_chains,
        }
    }
}
