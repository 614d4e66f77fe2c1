use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::{ConfigError, LifecycleErrors};
use crate::filters::ResolvedFilterMapping;
use crate::handler::{Default404Handler, DEFAULT_404_HANDLER_NAME};
use crate::pathspec::{PathMap, PathSpec};
use crate::registry::{FilterHolder, HandlerHolder, Source};
use crate::request::PathMappingInfo;

use super::core::{Dispatcher, HandlerMapping, MasterConfig};

/// A handler resolved by path or by name. Path-resolved entries carry
/// the winning pattern so the request's path mapping can be derived;
/// name-resolved entries have no pattern.
pub(crate) struct MappedHandler {
    pub(crate) path_spec: Option<Arc<PathSpec>>,
    pub(crate) holder: Arc<HandlerHolder>,
}

impl MappedHandler {
    pub(crate) fn path_mapping_info(&self, path: &str) -> Option<PathMappingInfo> {
        let spec = self.path_spec.as_ref()?;
        let split = spec.split(path)?;
        Some(PathMappingInfo {
            pattern: spec.declaration().to_string(),
            handler_name: self.holder.name().to_string(),
            servlet_path: split.servlet_path.to_string(),
            path_info: split.path_info.map(str::to_string),
        })
    }
}

/// The derived dispatch tables, recomputed as a whole by every rebuild
/// and published by atomic replacement. In-flight lookups keep reading
/// the snapshot they loaded.
#[derive(Default)]
pub(crate) struct Indexes {
    pub(crate) name_to_handler: HashMap<String, MappedHandler>,
    pub(crate) name_to_filter: HashMap<String, Arc<FilterHolder>>,
    pub(crate) path_to_handler: PathMap<MappedHandler>,
    pub(crate) path_filters: Vec<ResolvedFilterMapping>,
    pub(crate) name_filters: HashMap<String, Vec<ResolvedFilterMapping>>,
}

/// Recompute every derived table from the master configuration.
///
/// Fails without side effects on the published state when a mapping
/// references a missing filter or handler, or when conflicting
/// non-fallback mappings exist for one pattern and duplicates are not
/// allowed. May install the built-in 404 handler into `master` first.
pub(crate) fn rebuild_master(master: &mut MasterConfig) -> Result<Indexes, ConfigError> {
    if master.ensure_default_handler && !has_active_root_mapping(master) {
        install_default_handler(master);
    }

    let mut indexes = Indexes::default();

    for holder in master.registry.handlers() {
        indexes.name_to_handler.insert(
            holder.name().to_string(),
            MappedHandler {
                path_spec: None,
                holder: Arc::clone(holder),
            },
        );
    }
    for holder in master.registry.filters() {
        indexes
            .name_to_filter
            .insert(holder.name().to_string(), Arc::clone(holder));
    }

    for mapping in master.filter_mappings.mappings() {
        let holder = indexes
            .name_to_filter
            .get(mapping.filter_name())
            .cloned()
            .ok_or_else(|| ConfigError::UnknownFilter {
                name: mapping.filter_name().to_string(),
            })?;
        let resolved = ResolvedFilterMapping {
            mapping: Arc::clone(mapping),
            holder,
        };
        if !mapping.path_specs().is_empty() {
            indexes.path_filters.push(resolved.clone());
        }
        for target in mapping.target_names() {
            indexes
                .name_filters
                .entry(target.clone())
                .or_default()
                .push(resolved.clone());
        }
    }

    // Group handler mappings by pattern, keeping declaration order
    // within each group and across groups.
    let mut by_declaration: Vec<(Arc<PathSpec>, Vec<&HandlerMapping>)> = Vec::new();
    for mapping in &master.mappings {
        for spec in mapping.path_specs() {
            match by_declaration
                .iter_mut()
                .find(|(s, _)| s.declaration() == spec.declaration())
            {
                Some((_, group)) => group.push(mapping),
                None => by_declaration.push((Arc::clone(spec), vec![mapping])),
            }
        }
    }

    for (spec, group) in by_declaration {
        let mut active: Vec<&HandlerMapping> = Vec::new();
        for mapping in group {
            let holder = master
                .registry
                .handler(mapping.handler_name())
                .ok_or_else(|| ConfigError::UnknownHandler {
                    name: mapping.handler_name().to_string(),
                })?;
            if holder.is_enabled() {
                active.push(mapping);
            }
        }
        if active.is_empty() {
            debug!(pattern = %spec, "Every mapped handler is disabled, omitting pattern");
            continue;
        }

        let non_defaults: Vec<&HandlerMapping> = active
            .iter()
            .copied()
            .filter(|m| !m.is_from_default_descriptor())
            .collect();
        let winner: &HandlerMapping = match non_defaults.len() {
            0 => active[0],
            1 => non_defaults[0],
            _ if master.allow_duplicate_mappings => {
                let last = non_defaults[non_defaults.len() - 1];
                warn!(
                    pattern = %spec,
                    chosen = %last.handler_name(),
                    rejected = %non_defaults[0].handler_name(),
                    "Multiple handlers map to pattern, choosing last declared"
                );
                last
            }
            _ => {
                return Err(ConfigError::DuplicateMapping {
                    path: spec.declaration().to_string(),
                    existing: non_defaults[0].handler_name().to_string(),
                    conflicting: non_defaults[1].handler_name().to_string(),
                })
            }
        };

        let holder = master
            .registry
            .handler(winner.handler_name())
            .ok_or_else(|| ConfigError::UnknownHandler {
                name: winner.handler_name().to_string(),
            })?;
        debug!(pattern = %spec, handler = %winner.handler_name(), "Pattern mapped");
        indexes.path_to_handler.insert(
            Arc::clone(&spec),
            MappedHandler {
                path_spec: Some(Arc::clone(&spec)),
                holder: Arc::clone(holder),
            },
        );
    }

    info!(
        handlers = indexes.name_to_handler.len(),
        filters = indexes.name_to_filter.len(),
        patterns = indexes.path_to_handler.len(),
        path_filters = indexes.path_filters.len(),
        "Dispatch tables rebuilt"
    );
    Ok(indexes)
}

fn has_active_root_mapping(master: &MasterConfig) -> bool {
    master.mappings.iter().any(|mapping| {
        mapping
            .path_specs()
            .iter()
            .any(|spec| spec.declaration() == "/")
            && master
                .registry
                .handler(mapping.handler_name())
                .map(|h| h.is_enabled())
                .unwrap_or(false)
    })
}

fn install_default_handler(master: &mut MasterConfig) {
    if master.registry.handler(DEFAULT_404_HANDLER_NAME).is_none() {
        let holder = HandlerHolder::new(
            DEFAULT_404_HANDLER_NAME,
            Source::Embedded,
            Arc::new(Default404Handler),
        );
        let _ = master.registry.add_handler(holder);
    }
    let already_mapped = master.mappings.iter().any(|m| {
        m.handler_name() == DEFAULT_404_HANDLER_NAME
            && m.path_specs().iter().any(|s| s.declaration() == "/")
    });
    if already_mapped {
        return;
    }
    info!(handler = DEFAULT_404_HANDLER_NAME, "Installing fallback mapping for '/'");
    let mapping = HandlerMapping::new(DEFAULT_404_HANDLER_NAME, Source::Embedded)
        .with_path_spec("/")
        .expect("'/' is a valid pattern")
        .with_default_descriptor(true);
    master.mappings.push(mapping);
}

impl Dispatcher {
    /// Recompute the derived dispatch tables and republish them,
    /// invalidating the chain cache. Safe to call at any time; a
    /// configuration error leaves the previous tables serving.
    pub fn rebuild(&self) -> Result<(), ConfigError> {
        let mut master = self.master.lock();
        let indexes = rebuild_master(&mut master)?;
        self.publish(indexes);
        Ok(())
    }

    /// Start the dispatcher: rebuild the tables, then start listeners,
    /// filters, and handlers — handlers in ascending init-order, with
    /// unordered handlers last and ties broken by registration order.
    ///
    /// Component failures are logged and accumulated so unrelated
    /// components still start; the aggregate is returned at the end
    /// unless `start_with_unavailable` is set.
    pub fn start(&self) -> anyhow::Result<()> {
        let mut master = self.master.lock();
        info!("Starting dispatcher");
        let indexes = rebuild_master(&mut master)?;
        self.publish(indexes);

        let mut errors = LifecycleErrors::new();
        for listener in master.registry.listeners() {
            if let Err(err) = listener.start() {
                error!(listener = %listener.name(), error = %err, "Listener failed to start");
                errors.push(err);
            }
        }
        for filter in master.registry.filters() {
            if let Err(err) = filter.start() {
                error!(filter = %filter.name(), error = %err, "Filter failed to start");
                errors.push(err);
            }
        }
        let mut handlers: Vec<Arc<HandlerHolder>> = master.registry.handlers().to_vec();
        handlers.sort_by_key(|h| (h.init_order().is_none(), h.init_order()));
        for handler in handlers {
            if let Err(err) = handler.start() {
                error!(handler = %handler.name(), error = %err, "Handler failed to start");
                errors.push(err);
            }
        }

        self.started.store(true, Ordering::Release);
        info!(failures = errors.len(), "Dispatcher started");

        if master.start_with_unavailable && !errors.is_empty() {
            warn!(failures = errors.len(), "Continuing with unavailable components");
            return Ok(());
        }
        errors.into_result()
    }

    /// Stop the dispatcher: stop handlers, filters and listeners in
    /// reverse start order, then purge everything that was not added
    /// through the programmatic API so a later start resumes from the
    /// embedded baseline. The derived tables and the chain cache are
    /// cleared.
    pub fn stop(&self) -> anyhow::Result<()> {
        let mut master = self.master.lock();
        info!("Stopping dispatcher");
        let errors = LifecycleErrors::new();

        for handler in master.registry.handlers().iter().rev() {
            handler.stop();
        }
        for filter in master.registry.filters().iter().rev() {
            filter.stop();
        }
        for listener in master.registry.listeners().iter().rev() {
            listener.stop();
        }

        let master = &mut *master;
        master.registry.retain_embedded();
        let registry = &master.registry;
        master.mappings.retain(|m| {
            m.source() == Source::Embedded && registry.handler(m.handler_name()).is_some()
        });
        master.filter_mappings.retain(|m| {
            m.source() == Source::Embedded && registry.filter(m.filter_name()).is_some()
        });

        self.indexes.store(Arc::new(Indexes::default()));
        self.chain_cache.invalidate();
        self.started.store(false, Ordering::Release);
        info!("Dispatcher stopped");
        errors.into_result()
    }
}
