use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::debug;

use crate::registry::{FilterHolder, HandlerHolder};
use crate::request::{HandlerRequest, HandlerResponse};

use super::mapping::{DispatchType, FilterMapping, ALL_TARGETS};

/// Chains longer than this spill to the heap. Real deployments rarely
/// stack more than a handful of filters on one path.
pub const MAX_INLINE_FILTERS: usize = 8;

/// Stack-allocated filter list for a single chain.
pub type FilterVec = SmallVec<[Arc<FilterHolder>; MAX_INLINE_FILTERS]>;

/// A filter mapping paired with its resolved holder. Produced by the
/// rebuild so chain construction never looks filters up by name.
#[derive(Clone)]
pub struct ResolvedFilterMapping {
    pub mapping: Arc<FilterMapping>,
    pub holder: Arc<FilterHolder>,
}

/// An ordered sequence of filters terminated by exactly one handler.
///
/// Chains are immutable and shareable: the cache hands the same
/// `Arc<FilterChain>` to any number of concurrent requests, each of
/// which walks it with its own [`ChainWalker`].
pub struct FilterChain {
    filters: FilterVec,
    handler: Arc<HandlerHolder>,
}

impl FilterChain {
    pub(crate) fn new(filters: FilterVec, handler: Arc<HandlerHolder>) -> Self {
        FilterChain { filters, handler }
    }

    /// Number of filter invocations in the chain (the handler is not
    /// counted). The same filter appears once per mapping that selected
    /// it.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// A fresh single-request walker positioned at the first filter.
    pub fn walker(&self) -> ChainWalker<'_> {
        ChainWalker {
            chain: self,
            cursor: 0,
        }
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for holder in &self.filters {
            write!(f, "{}->", holder.name())?;
        }
        f.write_str(self.handler.name())
    }
}

/// Per-request cursor over a [`FilterChain`].
///
/// Each `proceed` call consumes exactly one filter; the call past the
/// last filter invokes the handler. Filters re-enter the walker to
/// continue the chain, so the walk is a single thread of control per
/// request.
pub struct ChainWalker<'c> {
    chain: &'c FilterChain,
    cursor: usize,
}

impl ChainWalker<'_> {
    /// Advance one step: invoke the next filter, or the handler once
    /// the filters are exhausted.
    ///
    /// When the request currently permits async but the next filter
    /// does not support it, the request's async-permitted flag is
    /// cleared for the duration of that filter's invocation and
    /// restored afterwards, whether the filter returns or fails.
    pub fn proceed(
        &mut self,
        req: &mut HandlerRequest,
        res: &mut HandlerResponse,
    ) -> anyhow::Result<()> {
        if self.cursor < self.chain.filters.len() {
            let holder = Arc::clone(&self.chain.filters[self.cursor]);
            self.cursor += 1;
            let filter = holder.filter()?;
            debug!(filter = %holder.name(), step = self.cursor, "Invoking filter");

            if req.is_async_supported() && !holder.is_async_supported() {
                req.set_async_supported(false);
                let result = filter.handle(req, res, self);
                req.set_async_supported(true);
                return result;
            }
            return filter.handle(req, res, self);
        }

        debug!(handler = %self.chain.handler.name(), "Invoking handler");
        self.chain.handler.handle(req, res)
    }
}

/// Computes the ordered filter list for a resolved target.
///
/// Selection follows the master filter-mapping order three times over:
/// first the path-based mappings matching the request path, then the
/// name-based mappings for the target handler, then the name-based
/// mappings for the `*` wildcard — each restricted to mappings whose
/// dispatch mask includes the current dispatch type.
pub struct ChainBuilder<'i> {
    path_filters: &'i [ResolvedFilterMapping],
    name_filters: &'i HashMap<String, Vec<ResolvedFilterMapping>>,
}

impl<'i> ChainBuilder<'i> {
    pub fn new(
        path_filters: &'i [ResolvedFilterMapping],
        name_filters: &'i HashMap<String, Vec<ResolvedFilterMapping>>,
    ) -> Self {
        ChainBuilder {
            path_filters,
            name_filters,
        }
    }

    /// Build the chain for `(path, dispatch)` ending in `handler`.
    /// `path` is `None` for name-based dispatch. Returns `None` when no
    /// filter applies, in which case the caller invokes the handler
    /// directly.
    pub fn build(
        &self,
        path: Option<&str>,
        dispatch: DispatchType,
        handler: &Arc<HandlerHolder>,
    ) -> Option<FilterChain> {
        let mut filters = FilterVec::new();

        if let Some(path) = path {
            for resolved in self.path_filters {
                if resolved.mapping.applies_to_path(path, dispatch) {
                    filters.push(Arc::clone(&resolved.holder));
                }
            }
        }

        for key in [handler.name(), ALL_TARGETS] {
            if let Some(named) = self.name_filters.get(key) {
                for resolved in named {
                    if resolved.mapping.applies_to(dispatch) {
                        filters.push(Arc::clone(&resolved.holder));
                    }
                }
            }
        }

        if filters.is_empty() {
            debug!(path = ?path, dispatch = %dispatch, handler = %handler.name(), "No filters apply");
            return None;
        }

        let chain = FilterChain::new(filters, Arc::clone(handler));
        debug!(dispatch = %dispatch, chain = ?chain, "Filter chain built");
        Some(chain)
    }
}
