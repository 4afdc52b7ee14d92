//! # JSON-RPC 2.0 Dispatch Engine
//!
//! A pure, transport-agnostic JSON-RPC 2.0 server core: it decodes request
//! envelopes, routes them through a composable middleware pipeline to
//! registered handlers, executes concurrently where the protocol allows it,
//! and encodes spec-compliant responses.
//!
//! ## Features
//! - Full JSON-RPC 2.0 envelope semantics (batches, notifications, error
//!   objects)
//! - Transport agnostic: resolution entry points work over any byte stream
//! - Case-insensitive method dispatch with a thread-safe handler registry
//! - Decorator-style middleware with logging and schema validation built in
//! - Typed handler adapter so user functions keep their own request and
//!   response shapes

pub mod context;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod response;
pub mod types;

// Re-export main types
pub use context::RequestContext;
pub use dispatch::JsonRpcDispatcher;
pub use error::{JsonRpcErrorCode, JsonRpcErrorObject};
pub use handler::{HandlerResult, JsonRpcHandler, TypedHandler, typed};
pub use middleware::{
    DispatchFn, LoggingMiddleware, Middleware, MiddlewareFn, MiddlewareStack, middleware_fn,
};
#[cfg(feature = "validation")]
pub use middleware::{SchemaError, ValidationBuilder, ValidationMiddleware};
pub use registry::HandlerRegistry;
pub use request::JsonRpcRequest;
pub use response::JsonRpcResponse;
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Application errors reported by handlers
    pub const USER_ERROR: i64 = -32000;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}
