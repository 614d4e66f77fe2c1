use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::filters::{
    ChainBuilder, ChainCache, DispatchMask, DispatchType, Filter, FilterChain, FilterMapping,
    FilterMappingList,
};
use crate::handler::{Default404Handler, Handler};
use crate::pathspec::PathSpec;
use crate::registry::{FilterHolder, HandlerHolder, ListenerHolder, Registry, Source};
use crate::request::{HandlerRequest, HandlerResponse, RequestAttribute, INCLUDE_MAPPING_ATTRIBUTE};
use crate::runtime_config::RuntimeConfig;

use super::rebuild::{rebuild_master, Indexes, MappedHandler};

/// Declares which path patterns a handler serves.
#[derive(Debug, Clone)]
pub struct HandlerMapping {
    handler_name: String,
    path_specs: Vec<Arc<PathSpec>>,
    source: Source,
    from_default_descriptor: bool,
}

impl HandlerMapping {
    pub fn new(handler_name: impl Into<String>, source: Source) -> Self {
        HandlerMapping {
            handler_name: handler_name.into(),
            path_specs: Vec::new(),
            source,
            from_default_descriptor: false,
        }
    }

    /// Add a path pattern this mapping serves.
    pub fn with_path_spec(mut self, declaration: &str) -> Result<Self, ConfigError> {
        self.path_specs.push(Arc::new(PathSpec::new(declaration)?));
        Ok(self)
    }

    /// Mark the mapping as a catch-all fallback. Fallback mappings lose
    /// conflicts against any non-fallback mapping for the same pattern.
    pub fn with_default_descriptor(mut self, from_default: bool) -> Self {
        self.from_default_descriptor = from_default;
        self
    }

    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    pub fn path_specs(&self) -> &[Arc<PathSpec>] {
        &self.path_specs
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn is_from_default_descriptor(&self) -> bool {
        self.from_default_descriptor
    }
}

/// The master configuration every rebuild derives its tables from.
#[derive(Clone)]
pub(crate) struct MasterConfig {
    pub(crate) registry: Registry,
    pub(crate) mappings: Vec<HandlerMapping>,
    pub(crate) filter_mappings: FilterMappingList,
    pub(crate) allow_duplicate_mappings: bool,
    pub(crate) ensure_default_handler: bool,
    pub(crate) start_with_unavailable: bool,
}

impl Default for MasterConfig {
    fn default() -> Self {
        MasterConfig {
            registry: Registry::new(),
            mappings: Vec::new(),
            filter_mappings: FilterMappingList::new(),
            allow_duplicate_mappings: false,
            ensure_default_handler: true,
            start_with_unavailable: false,
        }
    }
}

/// The per-request entry point tying resolution, chain building,
/// caching and invocation together.
///
/// All state is instance-scoped: registries and mappings live behind a
/// single exclusive configuration lock, while lookups run against an
/// immutable snapshot of derived tables that is republished wholesale
/// on every rebuild. Request threads therefore see either the old
/// complete snapshot or the new one, never a half-updated table.
pub struct Dispatcher {
    pub(crate) master: Mutex<MasterConfig>,
    pub(crate) indexes: ArcSwap<Indexes>,
    pub(crate) chain_cache: ChainCache,
    pub(crate) cache_enabled: AtomicBool,
    pub(crate) started: AtomicBool,
    pub(crate) downstream: RwLock<Option<Arc<dyn Handler>>>,
}

impl Dispatcher {
    /// A dispatcher with default runtime settings.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// A dispatcher tuned by a [`RuntimeConfig`] (typically
    /// [`RuntimeConfig::from_env`]).
    pub fn with_config(config: RuntimeConfig) -> Self {
        Dispatcher {
            master: Mutex::new(MasterConfig::default()),
            indexes: ArcSwap::from_pointee(Indexes::default()),
            chain_cache: ChainCache::new(config.max_cached_chains),
            cache_enabled: AtomicBool::new(config.chain_cache_enabled),
            started: AtomicBool::new(false),
            downstream: RwLock::new(None),
        }
    }

    /// Apply one configuration mutation. The mutation and the rebuild
    /// it triggers while started are atomic: on any error the master
    /// configuration and the published tables are left untouched.
    fn mutate<R>(
        &self,
        apply: impl FnOnce(&mut MasterConfig) -> Result<R, ConfigError>,
    ) -> Result<R, ConfigError> {
        let mut master = self.master.lock();
        let mut scratch = master.clone();
        let value = apply(&mut scratch)?;
        if self.started.load(Ordering::Acquire) {
            let indexes = rebuild_master(&mut scratch)?;
            self.publish(indexes);
        }
        *master = scratch;
        Ok(value)
    }

    pub(crate) fn publish(&self, indexes: Indexes) {
        self.indexes.store(Arc::new(indexes));
        self.chain_cache.invalidate();
    }

    // -- registration -------------------------------------------------

    /// Register a handler holder. Fails on a duplicate name.
    pub fn register_handler(
        &self,
        holder: HandlerHolder,
    ) -> Result<Arc<HandlerHolder>, ConfigError> {
        self.mutate(|master| master.registry.add_handler(holder))
    }

    /// Register a filter holder. Fails on a duplicate name.
    pub fn register_filter(&self, holder: FilterHolder) -> Result<Arc<FilterHolder>, ConfigError> {
        self.mutate(|master| master.registry.add_filter(holder))
    }

    /// Register a lifecycle listener holder.
    pub fn register_listener(
        &self,
        holder: ListenerHolder,
    ) -> Result<Arc<ListenerHolder>, ConfigError> {
        self.mutate(|master| master.registry.add_listener(holder))
    }

    /// Register a handler mapping. The referenced handler is validated
    /// at the next rebuild.
    pub fn register_mapping(&self, mapping: HandlerMapping) -> Result<(), ConfigError> {
        self.mutate(|master| {
            debug!(handler = %mapping.handler_name(), "Handler mapping registered");
            master.mappings.push(mapping);
            Ok(())
        })
    }

    /// Append a filter mapping: API-sourced mappings land in the append
    /// zone behind everything else, other sources land at the end of
    /// the descriptor zone.
    pub fn add_filter_mapping(&self, mapping: FilterMapping) -> Result<(), ConfigError> {
        mapping.validate()?;
        self.mutate(|master| {
            master.filter_mappings.append(Arc::new(mapping));
            Ok(())
        })
    }

    /// Prepend a filter mapping: API-sourced mappings land at the end
    /// of the prepend zone ahead of descriptor-declared mappings, other
    /// sources land at the very front.
    pub fn prepend_filter_mapping(&self, mapping: FilterMapping) -> Result<(), ConfigError> {
        mapping.validate()?;
        self.mutate(|master| {
            master.filter_mappings.prepend(Arc::new(mapping));
            Ok(())
        })
    }

    /// Register a handler together with an embedded mapping for `path`.
    pub fn add_handler_with_mapping(
        &self,
        name: &str,
        path: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<Arc<HandlerHolder>, ConfigError> {
        let mapping = HandlerMapping::new(name, Source::Embedded).with_path_spec(path)?;
        self.mutate(move |master| {
            let holder = master
                .registry
                .add_handler(HandlerHolder::new(name, Source::Embedded, handler))?;
            master.mappings.push(mapping);
            Ok(holder)
        })
    }

    /// Register a filter together with an embedded path mapping.
    pub fn add_filter_with_mapping(
        &self,
        name: &str,
        path: &str,
        dispatches: DispatchMask,
        filter: Arc<dyn Filter>,
    ) -> Result<Arc<FilterHolder>, ConfigError> {
        let mapping = FilterMapping::new(name, Source::Embedded)
            .with_path_spec(path)?
            .with_dispatches(dispatches);
        self.mutate(move |master| {
            let holder = master
                .registry
                .add_filter(FilterHolder::new(name, Source::Embedded, filter))?;
            master.filter_mappings.append(Arc::new(mapping));
            Ok(holder)
        })
    }

    /// Handler invoked when no target resolves, instead of the built-in
    /// 404 response.
    pub fn set_downstream_handler(&self, handler: Option<Arc<dyn Handler>>) {
        *self.downstream.write() = handler;
    }

    // -- settings -----------------------------------------------------

    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache_enabled.store(enabled, Ordering::Release);
        self.chain_cache.invalidate();
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache_enabled.load(Ordering::Acquire)
    }

    /// Bound each per-dispatch-type chain cache at `max_entries`
    /// (0 = unbounded).
    pub fn set_max_cache_entries(&self, max_entries: usize) {
        self.chain_cache.set_max_entries(max_entries);
        self.chain_cache.invalidate();
    }

    pub fn max_cache_entries(&self) -> usize {
        self.chain_cache.max_entries()
    }

    /// Allow several non-fallback mappings for one pattern; the last
    /// declared wins and a warning is logged.
    pub fn set_allow_duplicate_mappings(&self, allow: bool) -> Result<(), ConfigError> {
        self.mutate(|master| {
            master.allow_duplicate_mappings = allow;
            Ok(())
        })
    }

    pub fn is_allow_duplicate_mappings(&self) -> bool {
        self.master.lock().allow_duplicate_mappings
    }

    /// Install the built-in 404 handler at `/` whenever no active
    /// mapping covers it (the default).
    pub fn set_ensure_default_handler(&self, ensure: bool) -> Result<(), ConfigError> {
        self.mutate(|master| {
            master.ensure_default_handler = ensure;
            Ok(())
        })
    }

    pub fn is_ensure_default_handler(&self) -> bool {
        self.master.lock().ensure_default_handler
    }

    /// Report start as successful even when components failed to start;
    /// failures are logged and the holders stay unavailable.
    pub fn set_start_with_unavailable(&self, start: bool) -> Result<(), ConfigError> {
        self.mutate(|master| {
            master.start_with_unavailable = start;
            Ok(())
        })
    }

    // -- lookups ------------------------------------------------------

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Started and no registered handler is unavailable.
    pub fn is_available(&self) -> bool {
        if !self.is_started() {
            return false;
        }
        let master = self.master.lock();
        master.registry.handlers().iter().all(|h| h.is_available())
    }

    pub fn handler(&self, name: &str) -> Option<Arc<HandlerHolder>> {
        self.master.lock().registry.handler(name).cloned()
    }

    pub fn filter(&self, name: &str) -> Option<Arc<FilterHolder>> {
        self.master.lock().registry.filter(name).cloned()
    }

    /// The declared handler mapping for a literal pattern, if any.
    pub fn handler_mapping(&self, declaration: &str) -> Option<HandlerMapping> {
        self.master
            .lock()
            .mappings
            .iter()
            .find(|m| {
                m.path_specs()
                    .iter()
                    .any(|s| s.declaration() == declaration)
            })
            .cloned()
    }

    /// The chain cache, for inspection.
    pub fn chain_cache(&self) -> &ChainCache {
        &self.chain_cache
    }

    /// Print the resolved dispatch tables to stdout.
    pub fn dump_mappings(&self) {
        let indexes = self.indexes.load_full();
        println!(
            "[mappings] paths={} handlers={} path_filters={}",
            indexes.path_to_handler.len(),
            indexes.name_to_handler.len(),
            indexes.path_filters.len(),
        );
        for (spec, mapped) in indexes.path_to_handler.iter() {
            println!("[mapping] {} -> {}", spec, mapped.holder.name());
        }
        for resolved in &indexes.path_filters {
            let patterns: Vec<&str> = resolved
                .mapping
                .path_specs()
                .iter()
                .map(|s| s.declaration())
                .collect();
            println!(
                "[filter-mapping] {:?} dispatches={:#07b} -> {}",
                patterns,
                resolved.mapping.dispatches().bits(),
                resolved.mapping.filter_name(),
            );
        }
    }

    // -- request flow -------------------------------------------------

    /// Route one request to its target through the applicable filter
    /// chain.
    ///
    /// `target` is either a path within the context (starting with `/`,
    /// resolved against the path table) or a handler name. The resolved
    /// path mapping is exposed on the request — under the include
    /// attribute for INCLUDE dispatch, otherwise in the active slot,
    /// which is restored before this method returns. When nothing
    /// resolves, the downstream handler (if set) or the built-in 404
    /// responds.
    pub fn dispatch(
        &self,
        target: &str,
        req: &mut HandlerRequest,
        res: &mut HandlerResponse,
    ) -> anyhow::Result<()> {
        let dispatch_type = req.dispatch_type();
        let indexes = self.indexes.load_full();
        let is_path = target.starts_with('/');

        let mapped: Option<&MappedHandler> = if is_path {
            indexes.path_to_handler.best_match(target).map(|(_, m)| m)
        } else {
            indexes.name_to_handler.get(target)
        };

        debug!(
            target = %target,
            dispatch = %dispatch_type,
            handler = mapped.map(|m| m.holder.name()),
            "Target resolved"
        );

        let saved_mapping = req.path_mapping().cloned();
        if let (Some(mapped), true) = (mapped, is_path) {
            if let Some(mapping_info) = mapped.path_mapping_info(target) {
                if dispatch_type == DispatchType::Include {
                    req.set_attribute(
                        INCLUDE_MAPPING_ATTRIBUTE,
                        RequestAttribute::PathMapping(mapping_info),
                    );
                } else {
                    req.replace_path_mapping(Some(mapping_info));
                }
            }
        }

        let result = match mapped {
            None => self.not_found(req, res),
            Some(mapped) => {
                let chain =
                    self.chain_for(&indexes, is_path.then_some(target), dispatch_type, mapped);
                match &chain {
                    Some(chain) => {
                        let mut walker = chain.walker();
                        walker.proceed(req, res)
                    }
                    None => mapped.holder.handle(req, res),
                }
            }
        };

        if mapped.is_some() {
            req.set_handled(true);
        }
        if dispatch_type != DispatchType::Include {
            req.replace_path_mapping(saved_mapping);
        }
        result
    }

    /// Fetch the chain from the cache or build it. `path` is `None` for
    /// name-based dispatch, in which case the handler name keys the
    /// cache.
    fn chain_for(
        &self,
        indexes: &Indexes,
        path: Option<&str>,
        dispatch: DispatchType,
        mapped: &MappedHandler,
    ) -> Option<Arc<FilterChain>> {
        if indexes.path_filters.is_empty() && indexes.name_filters.is_empty() {
            return None;
        }

        let cache_enabled = self.cache_enabled.load(Ordering::Acquire);
        let key = path.unwrap_or_else(|| mapped.holder.name());

        if cache_enabled {
            if let Some(chain) = self.chain_cache.get(dispatch, key) {
                debug!(key = %key, dispatch = %dispatch, "Chain cache hit");
                return Some(chain);
            }
        }

        let builder = ChainBuilder::new(&indexes.path_filters, &indexes.name_filters);
        let chain = Arc::new(builder.build(path, dispatch, &mapped.holder)?);
        if cache_enabled {
            self.chain_cache.insert(dispatch, key, Arc::clone(&chain));
        }
        Some(chain)
    }

    fn not_found(&self, req: &mut HandlerRequest, res: &mut HandlerResponse) -> anyhow::Result<()> {
        info!(path = %req.path, "No handler resolved");
        let downstream = self.downstream.read().clone();
        match downstream {
            Some(handler) => handler.handle(req, res),
            None => Default404Handler.handle(req, res),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
