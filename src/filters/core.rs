use crate::request::{HandlerRequest, HandlerResponse};

use super::chain::ChainWalker;

/// An interceptor that runs before the handler.
///
/// A filter may inspect or mutate the request and response, short-circuit
/// by returning without calling the walker, or wrap the downstream
/// processing by doing work after `chain.proceed` returns. Filters are
/// shared across concurrent requests and must be thread-safe.
///
/// # Example
///
/// ```rust
/// use corridor::{Filter, HandlerRequest, HandlerResponse};
/// use corridor::filters::ChainWalker;
///
/// struct ServerHeader;
///
/// impl Filter for ServerHeader {
///     fn handle(
///         &self,
///         req: &mut HandlerRequest,
///         res: &mut HandlerResponse,
///         chain: &mut ChainWalker<'_>,
///     ) -> anyhow::Result<()> {
///         chain.proceed(req, res)?;
///         res.headers.insert("server".into(), "corridor".into());
///         Ok(())
///     }
/// }
/// ```
pub trait Filter: Send + Sync {
    /// Process the request, normally continuing down the chain via
    /// `chain.proceed(req, res)`. Errors propagate out of the chain
    /// walk unchanged.
    fn handle(
        &self,
        req: &mut HandlerRequest,
        res: &mut HandlerResponse,
        chain: &mut ChainWalker<'_>,
    ) -> anyhow::Result<()>;

    /// Called once when the owning holder starts.
    fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once when the owning holder stops.
    fn destroy(&self) {}
}
