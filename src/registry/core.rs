use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::filters::Filter;
use crate::handler::{Handler, LifecycleListener};
use crate::request::{HandlerRequest, HandlerResponse};

/// Where a descriptor came from. Drives insertion-order rules for filter
/// mappings and the purge behavior at stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Added through the programmatic embedding API
    Embedded,
    /// Loaded from a deployment descriptor
    Descriptor,
    /// Declared through the dynamic registration interface
    Api,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Embedded => f.write_str("embedded"),
            Source::Descriptor => f.write_str("descriptor"),
            Source::Api => f.write_str("api"),
        }
    }
}

type HandlerFactory = Arc<dyn Fn() -> Arc<dyn Handler> + Send + Sync>;
type FilterFactory = Arc<dyn Fn() -> Arc<dyn Filter> + Send + Sync>;

/// Lifecycle record for one registered handler.
///
/// Owned by the registry; derived indexes and cached chains hold `Arc`
/// references. Runtime flags are atomics so the request path never
/// locks a holder.
pub struct HandlerHolder {
    name: String,
    source: Source,
    enabled: AtomicBool,
    available: AtomicBool,
    started: AtomicBool,
    init_order: Option<u32>,
    factory: Option<HandlerFactory>,
    instance: RwLock<Option<Arc<dyn Handler>>>,
}

impl HandlerHolder {
    /// Holder around an already-constructed handler instance.
    pub fn new(name: impl Into<String>, source: Source, handler: Arc<dyn Handler>) -> Self {
        HandlerHolder {
            name: name.into(),
            source,
            enabled: AtomicBool::new(true),
            available: AtomicBool::new(false),
            started: AtomicBool::new(false),
            init_order: None,
            factory: None,
            instance: RwLock::new(Some(handler)),
        }
    }

    /// Holder whose handler is constructed lazily when the holder
    /// starts.
    pub fn deferred<F>(name: impl Into<String>, source: Source, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Handler> + Send + Sync + 'static,
    {
        HandlerHolder {
            name: name.into(),
            source,
            enabled: AtomicBool::new(true),
            available: AtomicBool::new(false),
            started: AtomicBool::new(false),
            init_order: None,
            factory: Some(Arc::new(factory)),
            instance: RwLock::new(None),
        }
    }

    /// Set the initialization-order hint. Holders with a hint start in
    /// ascending hint order before holders without one.
    pub fn with_init_order(mut self, order: u32) -> Self {
        self.init_order = Some(order);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn init_order(&self) -> Option<u32> {
        self.init_order
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Disabled holders are skipped when path mappings are resolved.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Resolve the instance (running the deferred factory if needed),
    /// run its `init` hook and mark the holder available.
    pub fn start(&self) -> anyhow::Result<()> {
        if self.is_started() {
            return Ok(());
        }
        let instance = {
            let mut slot = self.instance.write();
            if slot.is_none() {
                if let Some(factory) = &self.factory {
                    *slot = Some(factory());
                }
            }
            slot.clone()
        };
        let instance = instance
            .with_context(|| format!("handler '{}' has no instance or factory", self.name))?;
        instance
            .init()
            .with_context(|| format!("handler '{}' failed to initialize", self.name))?;
        self.available.store(true, Ordering::Release);
        self.started.store(true, Ordering::Release);
        debug!(handler = %self.name, "Handler started");
        Ok(())
    }

    /// Run the `destroy` hook, drop a factory-built instance and mark
    /// the holder unavailable.
    pub fn stop(&self) {
        if !self.is_started() {
            return;
        }
        if let Some(instance) = self.instance.read().clone() {
            instance.destroy();
        }
        if self.factory.is_some() {
            *self.instance.write() = None;
        }
        self.available.store(false, Ordering::Release);
        self.started.store(false, Ordering::Release);
        debug!(handler = %self.name, "Handler stopped");
    }

    /// Invoke the held handler.
    pub fn handle(
        &self,
        req: &mut HandlerRequest,
        res: &mut HandlerResponse,
    ) -> anyhow::Result<()> {
        let instance = self.instance.read().clone();
        match instance {
            Some(handler) => handler.handle(req, res),
            None => anyhow::bail!("handler '{}' is not available", self.name),
        }
    }
}

impl fmt::Debug for HandlerHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerHolder")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("enabled", &self.is_enabled())
            .field("available", &self.is_available())
            .finish()
    }
}

/// Lifecycle record for one registered filter. Same shape as
/// [`HandlerHolder`] plus the async-support flag.
pub struct FilterHolder {
    name: String,
    source: Source,
    enabled: AtomicBool,
    available: AtomicBool,
    started: AtomicBool,
    init_order: Option<u32>,
    async_supported: bool,
    factory: Option<FilterFactory>,
    instance: RwLock<Option<Arc<dyn Filter>>>,
}

impl FilterHolder {
    pub fn new(name: impl Into<String>, source: Source, filter: Arc<dyn Filter>) -> Self {
        FilterHolder {
            name: name.into(),
            source,
            enabled: AtomicBool::new(true),
            available: AtomicBool::new(false),
            started: AtomicBool::new(false),
            init_order: None,
            async_supported: true,
            factory: None,
            instance: RwLock::new(Some(filter)),
        }
    }

    pub fn deferred<F>(name: impl Into<String>, source: Source, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Filter> + Send + Sync + 'static,
    {
        FilterHolder {
            name: name.into(),
            source,
            enabled: AtomicBool::new(true),
            available: AtomicBool::new(false),
            started: AtomicBool::new(false),
            init_order: None,
            async_supported: true,
            factory: Some(Arc::new(factory)),
            instance: RwLock::new(None),
        }
    }

    /// Declare whether the filter understands asynchronous completion.
    /// A filter that does not has the request's async-permitted flag
    /// cleared around its invocation.
    pub fn with_async_supported(mut self, supported: bool) -> Self {
        self.async_supported = supported;
        self
    }

    pub fn with_init_order(mut self, order: u32) -> Self {
        self.init_order = Some(order);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn init_order(&self) -> Option<u32> {
        self.init_order
    }

    pub fn is_async_supported(&self) -> bool {
        self.async_supported
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn start(&self) -> anyhow::Result<()> {
        if self.is_started() {
            return Ok(());
        }
        let instance = {
            let mut slot = self.instance.write();
            if slot.is_none() {
                if let Some(factory) = &self.factory {
                    *slot = Some(factory());
                }
            }
            slot.clone()
        };
        let instance = instance
            .with_context(|| format!("filter '{}' has no instance or factory", self.name))?;
        instance
            .init()
            .with_context(|| format!("filter '{}' failed to initialize", self.name))?;
        self.available.store(true, Ordering::Release);
        self.started.store(true, Ordering::Release);
        debug!(filter = %self.name, "Filter started");
        Ok(())
    }

    pub fn stop(&self) {
        if !self.is_started() {
            return;
        }
        if let Some(instance) = self.instance.read().clone() {
            instance.destroy();
        }
        if self.factory.is_some() {
            *self.instance.write() = None;
        }
        self.available.store(false, Ordering::Release);
        self.started.store(false, Ordering::Release);
        debug!(filter = %self.name, "Filter stopped");
    }

    /// The held filter instance.
    pub fn filter(&self) -> anyhow::Result<Arc<dyn Filter>> {
        self.instance
            .read()
            .clone()
            .with_context(|| format!("filter '{}' is not available", self.name))
    }
}

impl fmt::Debug for FilterHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterHolder")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("async_supported", &self.async_supported)
            .field("enabled", &self.is_enabled())
            .field("available", &self.is_available())
            .finish()
    }
}

/// Lifecycle record for one registered listener.
pub struct ListenerHolder {
    name: String,
    source: Source,
    started: AtomicBool,
    listener: Arc<dyn LifecycleListener>,
}

impl ListenerHolder {
    pub fn new(
        name: impl Into<String>,
        source: Source,
        listener: Arc<dyn LifecycleListener>,
    ) -> Self {
        ListenerHolder {
            name: name.into(),
            source,
            started: AtomicBool::new(false),
            listener,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn start(&self) -> anyhow::Result<()> {
        if self.is_started() {
            return Ok(());
        }
        self.listener
            .started()
            .with_context(|| format!("listener '{}' failed to start", self.name))?;
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    pub fn stop(&self) {
        if !self.is_started() {
            return;
        }
        self.listener.stopped();
        self.started.store(false, Ordering::Release);
    }
}

/// Name-indexed store of handler, filter and listener holders.
///
/// The registry is the master record; rebuilds derive the published
/// lookup tables from it. Names are unique per kind.
#[derive(Default, Clone)]
pub struct Registry {
    handlers: Vec<Arc<HandlerHolder>>,
    filters: Vec<Arc<FilterHolder>>,
    listeners: Vec<Arc<ListenerHolder>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&mut self, holder: HandlerHolder) -> Result<Arc<HandlerHolder>, ConfigError> {
        if self.handler(holder.name()).is_some() {
            return Err(ConfigError::DuplicateName {
                name: holder.name().to_string(),
            });
        }
        let holder = Arc::new(holder);
        info!(handler = %holder.name(), source = %holder.source(), "Handler registered");
        self.handlers.push(Arc::clone(&holder));
        Ok(holder)
    }

    pub fn add_filter(&mut self, holder: FilterHolder) -> Result<Arc<FilterHolder>, ConfigError> {
        if self.filter(holder.name()).is_some() {
            return Err(ConfigError::DuplicateName {
                name: holder.name().to_string(),
            });
        }
        let holder = Arc::new(holder);
        info!(filter = %holder.name(), source = %holder.source(), "Filter registered");
        self.filters.push(Arc::clone(&holder));
        Ok(holder)
    }

    pub fn add_listener(
        &mut self,
        holder: ListenerHolder,
    ) -> Result<Arc<ListenerHolder>, ConfigError> {
        if self.listeners.iter().any(|l| l.name() == holder.name()) {
            return Err(ConfigError::DuplicateName {
                name: holder.name().to_string(),
            });
        }
        let holder = Arc::new(holder);
        self.listeners.push(Arc::clone(&holder));
        Ok(holder)
    }

    pub fn handler(&self, name: &str) -> Option<&Arc<HandlerHolder>> {
        self.handlers.iter().find(|h| h.name() == name)
    }

    pub fn filter(&self, name: &str) -> Option<&Arc<FilterHolder>> {
        self.filters.iter().find(|f| f.name() == name)
    }

    pub fn handlers(&self) -> &[Arc<HandlerHolder>] {
        &self.handlers
    }

    pub fn filters(&self) -> &[Arc<FilterHolder>] {
        &self.filters
    }

    pub fn listeners(&self) -> &[Arc<ListenerHolder>] {
        &self.listeners
    }

    /// Drop everything that did not come from the programmatic API, so
    /// a later start resumes from the embedded baseline.
    pub fn retain_embedded(&mut self) {
        self.handlers.retain(|h| h.source() == Source::Embedded);
        self.filters.retain(|f| f.source() == Source::Embedded);
        self.listeners.retain(|l| l.source() == Source::Embedded);
    }
}
