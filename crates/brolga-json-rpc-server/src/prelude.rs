//! # Dispatch Engine Prelude
//!
//! Convenient re-exports of the most commonly used types.
//!
//! ```rust
//! use brolga_json_rpc_server::prelude::*;
//! ```

pub use crate::context::RequestContext;
pub use crate::dispatch::JsonRpcDispatcher;
pub use crate::error::{JsonRpcErrorCode, JsonRpcErrorObject};
pub use crate::handler::{HandlerResult, JsonRpcHandler, TypedHandler, typed};
pub use crate::middleware::{
    DispatchFn, LoggingMiddleware, Middleware, MiddlewareFn, MiddlewareStack, middleware_fn,
};
#[cfg(feature = "validation")]
pub use crate::middleware::{SchemaError, ValidationBuilder, ValidationMiddleware};
pub use crate::registry::HandlerRegistry;
pub use crate::request::JsonRpcRequest;
pub use crate::response::JsonRpcResponse;
pub use crate::types::{JsonRpcVersion, RequestId};

// Standard error codes
pub use crate::error_codes::*;
