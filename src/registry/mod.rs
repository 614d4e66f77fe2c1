//! # Registry Module
//!
//! Descriptors ("holders") for handlers, filters and listeners, and the
//! name-indexed master store the dispatcher derives its lookup tables
//! from.
//!
//! ## Overview
//!
//! A holder wraps the component instance together with its lifecycle
//! state:
//!
//! - **name** — unique per kind within a registry
//! - **source** — embedded, descriptor or dynamic API, which drives
//!   filter-mapping insertion order and the purge at stop
//! - **enabled / available / started** — runtime flags kept in atomics
//!   so request-path reads never lock
//! - **target** — a concrete instance, or a factory run when the
//!   holder starts
//!
//! Holders are constructed directly (`HandlerHolder::new`,
//! `FilterHolder::deferred`, ...) and handed to the dispatcher's
//! registration API, which owns them from then on. Derived indexes and
//! cached chains keep `Arc` references; nothing holds a reference back
//! to the dispatcher.

mod core;

pub use core::{FilterHolder, HandlerHolder, ListenerHolder, Registry, Source};
