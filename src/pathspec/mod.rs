//! # Path Pattern Module
//!
//! Pattern parsing and best-match path resolution.
//!
//! ## Overview
//!
//! A [`PathSpec`] classifies a mapping declaration into one of five
//! groups and answers whether it matches a concrete request path:
//!
//! - **Exact** — `/a/b` matches only `/a/b`
//! - **Prefix** — `/a/*` matches `/a` and everything below it
//! - **Suffix** — `*.jsp` matches any path ending in `.jsp`
//! - **Root** — the empty declaration matches only `/`
//! - **Default** — `/` matches every path
//!
//! A [`PathMap`] holds `(PathSpec, value)` entries and returns the single
//! best match for a path: exact beats prefix, longer prefixes beat
//! shorter ones, prefix beats suffix, suffix beats root, root beats
//! default. Ties cannot occur because duplicate declarations are
//! resolved before the table is built.
//!
//! ## Example
//!
//! ```rust
//! use corridor::pathspec::PathSpec;
//!
//! let spec = PathSpec::new("/api/*").unwrap();
//! assert!(spec.matches("/api/users"));
//! let split = spec.split("/api/users").unwrap();
//! assert_eq!(split.servlet_path, "/api");
//! assert_eq!(split.path_info, Some("/users"));
//! ```

mod core;
mod table;
#[cfg(test)]
mod tests;

pub use core::{PathSpec, PathSpecGroup, PathSplit};
pub use table::PathMap;
