pub mod dispatcher;
pub mod error;
pub mod filters;
pub mod handler;
pub mod pathspec;
pub mod registry;
pub mod request;
pub mod runtime_config;

pub use dispatcher::{Dispatcher, HandlerMapping};
pub use error::{ConfigError, LifecycleErrors};
pub use filters::{DispatchMask, DispatchType, Filter, FilterMapping};
pub use handler::{Default404Handler, Handler, LifecycleListener};
pub use pathspec::{PathSpec, PathSpecGroup};
pub use registry::{FilterHolder, HandlerHolder, ListenerHolder, Source};
pub use request::{HandlerRequest, HandlerResponse, PathMappingInfo, RequestAttribute};
pub use runtime_config::RuntimeConfig;
