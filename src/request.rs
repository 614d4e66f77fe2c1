//! Request and response objects carried through a dispatch.
//!
//! The dispatcher treats the pair as opaque cargo for filters and the
//! target handler, but owns a small amount of per-request state on the
//! request side: the dispatch type, the async-permitted flag, the
//! handled flag, the active path-mapping slot and the attribute map.

use std::collections::HashMap;

use http::Method;
use serde::Serialize;
use serde_json::Value;

use crate::filters::DispatchType;

/// Attribute name under which the resolved path mapping is stored for
/// INCLUDE dispatches, preserved for on-the-wire compatibility with the
/// servlet API.
pub const INCLUDE_MAPPING_ATTRIBUTE: &str = "javax.servlet.include.mapping";

/// How a request path was mapped to its handler.
///
/// Derived from the winning pattern at resolution time and exposed to
/// filters and handlers through the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMappingInfo {
    /// The winning pattern declaration
    pub pattern: String,
    /// Name of the resolved handler
    pub handler_name: String,
    /// The part of the path that selected the handler
    pub servlet_path: String,
    /// The remainder below the matched part, if any
    pub path_info: Option<String>,
}

/// A value stored in the request attribute map.
#[derive(Debug, Clone)]
pub enum RequestAttribute {
    /// A resolved path mapping (e.g. under [`INCLUDE_MAPPING_ATTRIBUTE`])
    PathMapping(PathMappingInfo),
    /// Arbitrary JSON payload set by filters or handlers
    Json(Value),
}

/// Request data passed through the filter chain to a handler.
///
/// Contains the extracted HTTP request information plus the dispatch
/// state the dispatcher maintains around the chain walk.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path within the context, beginning with `/`
    pub path: String,
    /// HTTP headers
    pub headers: HashMap<String, String>,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
    dispatch_type: DispatchType,
    async_supported: bool,
    handled: bool,
    path_mapping: Option<PathMappingInfo>,
    attributes: HashMap<String, RequestAttribute>,
}

impl HandlerRequest {
    /// Create a fresh REQUEST-dispatch request for the given method and
    /// path. The request starts async-permitted and unhandled.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        HandlerRequest {
            method,
            path: path.into(),
            headers: HashMap::new(),
            body: None,
            dispatch_type: DispatchType::Request,
            async_supported: true,
            handled: false,
            path_mapping: None,
            attributes: HashMap::new(),
        }
    }

    /// Reuse this request under a different dispatch type (forward,
    /// include, error or async re-dispatch).
    pub fn with_dispatch_type(mut self, dispatch_type: DispatchType) -> Self {
        self.dispatch_type = dispatch_type;
        self
    }

    pub fn dispatch_type(&self) -> DispatchType {
        self.dispatch_type
    }

    /// Whether asynchronous completion is currently permitted.
    pub fn is_async_supported(&self) -> bool {
        self.async_supported
    }

    /// Flip the async-permitted flag. The dispatcher uses this around
    /// filters that do not support async; filters may also clear it for
    /// everything downstream.
    pub fn set_async_supported(&mut self, supported: bool) {
        self.async_supported = supported;
    }

    /// Whether a handler was reached for this request.
    pub fn is_handled(&self) -> bool {
        self.handled
    }

    pub fn set_handled(&mut self, handled: bool) {
        self.handled = handled;
    }

    /// The active path mapping, if the request has been resolved.
    pub fn path_mapping(&self) -> Option<&PathMappingInfo> {
        self.path_mapping.as_ref()
    }

    /// Replace the active path-mapping slot, returning the previous
    /// value so the caller can restore it.
    pub fn replace_path_mapping(
        &mut self,
        mapping: Option<PathMappingInfo>,
    ) -> Option<PathMappingInfo> {
        std::mem::replace(&mut self.path_mapping, mapping)
    }

    pub fn attribute(&self, name: &str) -> Option<&RequestAttribute> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: RequestAttribute) {
        self.attributes.insert(name.into(), value);
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<RequestAttribute> {
        self.attributes.remove(name)
    }
}

/// Response data produced by the filter chain and handler.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers
    #[serde(skip_serializing)]
    pub headers: HashMap<String, String>,
    /// Response body as JSON
    pub body: Value,
}

impl HandlerResponse {
    /// An empty 200 response, the starting state for a dispatch.
    pub fn new() -> Self {
        HandlerResponse {
            status: 200,
            headers: HashMap::new(),
            body: Value::Null,
        }
    }

    /// A 200 response carrying the given JSON body.
    pub fn ok_json(body: Value) -> Self {
        HandlerResponse {
            status: 200,
            headers: HashMap::new(),
            body,
        }
    }

    /// An empty response with the given status.
    pub fn status(status: u16) -> Self {
        HandlerResponse {
            status,
            headers: HashMap::new(),
            body: Value::Null,
        }
    }
}

impl Default for HandlerResponse {
    fn default() -> Self {
        Self::new()
    }
}
