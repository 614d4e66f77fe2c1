//! # Filters Module
//!
//! Filter mappings, chain composition and the bounded chain cache.
//!
//! ## Overview
//!
//! A [`FilterMapping`] declares which requests a filter applies to — by
//! path pattern, by target handler name (including the `*` wildcard),
//! or both — restricted to a [`DispatchMask`] of dispatch types. The
//! master [`FilterMappingList`] keeps mappings in a three-zone order
//! (programmatic prepends, descriptor-declared, programmatic appends)
//! that survives any interleaving of insertions.
//!
//! For a resolved target, [`ChainBuilder`] walks the mappings in master
//! order and produces a [`FilterChain`]: path-matched filters first,
//! then name-matched filters for the handler, then wildcard-matched
//! filters. A [`ChainWalker`] drives one request through the chain; a
//! filter continues the walk by re-entering the walker, so a filter can
//! also short-circuit or wrap the downstream work.
//!
//! Built chains are cached per dispatch type in [`ChainCache`], keyed
//! by path or handler name, bounded, and shed in insertion order.
//!
//! ## Chain order
//!
//! For path `/p`, dispatch type `D` and handler `h`, the chain equals
//! the concatenation of
//!
//! 1. path mappings matching `/p` with `D` in their mask,
//! 2. name mappings for `h` with `D` in their mask,
//! 3. name mappings for `*` with `D` in their mask,
//!
//! each in master list order. A filter mapped more than once appears
//! once per mapping.

mod cache;
mod chain;
mod core;
mod list;
mod mapping;

pub use cache::{ChainCache, DEFAULT_MAX_CACHED_CHAINS};
pub use chain::{
    ChainBuilder, ChainWalker, FilterChain, ResolvedFilterMapping, MAX_INLINE_FILTERS,
};
pub use core::Filter;
pub use list::FilterMappingList;
pub use mapping::{DispatchMask, DispatchType, FilterMapping, ALL_TARGETS};
