//! Handler and listener traits plus the built-in 404 handler.

use http::StatusCode;
use serde_json::Value;

use crate::request::{HandlerRequest, HandlerResponse};

/// The final responder for a request.
///
/// Implementations must be safe to invoke from many request threads at
/// once; the dispatcher shares one instance across all concurrent
/// requests.
///
/// # Example
///
/// ```rust
/// use corridor::{Handler, HandlerRequest, HandlerResponse};
///
/// struct Hello;
///
/// impl Handler for Hello {
///     fn handle(&self, _req: &mut HandlerRequest, res: &mut HandlerResponse) -> anyhow::Result<()> {
///         res.body = serde_json::json!({"hello": "world"});
///         Ok(())
///     }
/// }
/// ```
pub trait Handler: Send + Sync {
    /// Respond to the request. Errors propagate out of the chain walk
    /// unchanged.
    fn handle(&self, req: &mut HandlerRequest, res: &mut HandlerResponse) -> anyhow::Result<()>;

    /// Called once when the owning holder starts.
    fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once when the owning holder stops.
    fn destroy(&self) {}
}

/// Receives dispatcher start/stop notifications.
pub trait LifecycleListener: Send + Sync {
    /// Called during start, before filters and handlers start.
    fn started(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during stop, after filters and handlers stopped.
    fn stopped(&self) {}
}

/// Built-in fallback handler: writes HTTP 404 with an empty body on any
/// method.
pub struct Default404Handler;

/// Name under which the built-in 404 handler is registered when
/// `ensure_default_handler` installs it.
pub const DEFAULT_404_HANDLER_NAME: &str = "corridor-default-404";

impl Handler for Default404Handler {
    fn handle(&self, _req: &mut HandlerRequest, res: &mut HandlerResponse) -> anyhow::Result<()> {
        res.status = StatusCode::NOT_FOUND.as_u16();
        res.headers.clear();
        res.body = Value::Null;
        Ok(())
    }
}
