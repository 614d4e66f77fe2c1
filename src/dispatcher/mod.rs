//! # Dispatcher Module
//!
//! The per-request entry point and the configuration surface around it.
//!
//! ## Overview
//!
//! The dispatcher resolves a target to exactly one handler and walks
//! the applicable filter chain around it:
//!
//! 1. A target starting with `/` is resolved against the path table;
//!    anything else is treated as a handler name.
//! 2. The resolved path mapping (pattern, servlet path, path info) is
//!    exposed on the request — in the include attribute for INCLUDE
//!    dispatch, otherwise in the request's active slot, saved and
//!    restored around the walk.
//! 3. The chain comes from the per-dispatch-type cache when enabled,
//!    or is built on the spot.
//! 4. The walk invokes each selected filter once and ends in the
//!    handler; an unresolved target falls to the downstream handler or
//!    the built-in 404.
//!
//! ## Configuration flow
//!
//! Handlers, filters, listeners and their mappings are registered
//! through the API here, then `rebuild` (run automatically at start and
//! after any mutation while started) recomputes the derived tables:
//! the name maps, the path table and the filter-mapping indexes.
//! Tables are published by atomic snapshot replacement, so request
//! threads never lock and never observe a half-built table. Every
//! publish invalidates the chain cache.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use corridor::{Dispatcher, Handler, HandlerRequest, HandlerResponse};
//! use http::Method;
//!
//! struct Pong;
//! impl Handler for Pong {
//!     fn handle(&self, _req: &mut HandlerRequest, res: &mut HandlerResponse) -> anyhow::Result<()> {
//!         res.body = serde_json::json!("pong");
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> anyhow::Result<()> {
//! let dispatcher = Dispatcher::new();
//! dispatcher.add_handler_with_mapping("pong", "/ping", Arc::new(Pong))?;
//! dispatcher.start()?;
//!
//! let mut req = HandlerRequest::new(Method::GET, "/ping");
//! let mut res = HandlerResponse::new();
//! dispatcher.dispatch("/ping", &mut req, &mut res)?;
//! assert_eq!(res.body, serde_json::json!("pong"));
//! # Ok(())
//! # }
//! ```

mod core;
mod rebuild;

pub use core::{Dispatcher, HandlerMapping};
