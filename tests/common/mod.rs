//! Shared fixtures for integration tests: handlers, filters and
//! listeners that record their invocations into a common log.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use corridor::filters::ChainWalker;
use corridor::{Filter, Handler, HandlerRequest, HandlerResponse, LifecycleListener};
use serde_json::json;

/// Shared invocation log. Each fixture pushes one entry per call.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Fresh log for one test. Also installs the test tracing subscriber,
/// so dispatcher logs show up under `RUST_LOG=corridor=debug`.
pub fn call_log() -> CallLog {
    init_tracing();
    Arc::new(Mutex::new(Vec::new()))
}

/// Install a fmt subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn entries(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Handler that records its name and answers with it.
pub struct RecordingHandler {
    pub name: String,
    pub log: CallLog,
}

impl RecordingHandler {
    pub fn new(name: &str, log: &CallLog) -> Arc<Self> {
        Arc::new(RecordingHandler {
            name: name.to_string(),
            log: Arc::clone(log),
        })
    }
}

impl Handler for RecordingHandler {
    fn handle(&self, _req: &mut HandlerRequest, res: &mut HandlerResponse) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(self.name.clone());
        res.body = json!({ "handler": self.name });
        Ok(())
    }

    fn init(&self) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(format!("init:{}", self.name));
        Ok(())
    }
}

/// Handler that records the request's active path mapping.
pub struct MappingProbeHandler {
    pub log: CallLog,
}

impl Handler for MappingProbeHandler {
    fn handle(&self, req: &mut HandlerRequest, _res: &mut HandlerResponse) -> anyhow::Result<()> {
        let entry = match req.path_mapping() {
            Some(m) => format!(
                "pattern={} servlet_path={} path_info={:?}",
                m.pattern, m.servlet_path, m.path_info
            ),
            None => "no-mapping".to_string(),
        };
        self.log.lock().unwrap().push(entry);
        Ok(())
    }
}

/// Handler whose `init` hook fails.
pub struct FailingInitHandler;

impl Handler for FailingInitHandler {
    fn handle(&self, _req: &mut HandlerRequest, _res: &mut HandlerResponse) -> anyhow::Result<()> {
        Ok(())
    }

    fn init(&self) -> anyhow::Result<()> {
        anyhow::bail!("refusing to initialize")
    }
}

/// Filter that records its name and continues the chain.
pub struct RecordingFilter {
    pub name: String,
    pub log: CallLog,
}

impl RecordingFilter {
    pub fn new(name: &str, log: &CallLog) -> Arc<Self> {
        Arc::new(RecordingFilter {
            name: name.to_string(),
            log: Arc::clone(log),
        })
    }
}

impl Filter for RecordingFilter {
    fn handle(
        &self,
        req: &mut HandlerRequest,
        res: &mut HandlerResponse,
        chain: &mut ChainWalker<'_>,
    ) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(self.name.clone());
        chain.proceed(req, res)
    }
}

/// Filter that records the async-permitted flag it observes, then
/// either fails or continues.
pub struct AsyncProbeFilter {
    pub log: CallLog,
    pub fail: bool,
}

impl Filter for AsyncProbeFilter {
    fn handle(
        &self,
        req: &mut HandlerRequest,
        res: &mut HandlerResponse,
        chain: &mut ChainWalker<'_>,
    ) -> anyhow::Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("async={}", req.is_async_supported()));
        if self.fail {
            anyhow::bail!("probe failure");
        }
        chain.proceed(req, res)
    }
}

/// Listener that records start/stop notifications.
pub struct RecordingListener {
    pub log: CallLog,
}

impl LifecycleListener for RecordingListener {
    fn started(&self) -> anyhow::Result<()> {
        self.log.lock().unwrap().push("listener:started".to_string());
        Ok(())
    }

    fn stopped(&self) {
        self.log.lock().unwrap().push("listener:stopped".to_string());
    }
}

/// Filter that answers by itself without continuing the chain.
pub struct ShortCircuitFilter {
    pub log: CallLog,
}

impl Filter for ShortCircuitFilter {
    fn handle(
        &self,
        _req: &mut HandlerRequest,
        res: &mut HandlerResponse,
        _chain: &mut ChainWalker<'_>,
    ) -> anyhow::Result<()> {
        self.log.lock().unwrap().push("short-circuit".to_string());
        res.status = 403;
        Ok(())
    }
}
