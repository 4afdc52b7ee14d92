//! Middleware composition for the dispatch pipeline.
//!
//! A middleware is a decorator over the dispatch function: given the next
//! stage it returns a new stage that may run logic before the inner call,
//! after it, or both, and may short-circuit by never calling `next`.
//! Middlewares registered first end up outermost, so the first registration
//! observes the total latency and the final response of everything inside.

mod logging;
#[cfg(feature = "validation")]
mod validation;

pub use logging::LoggingMiddleware;
#[cfg(feature = "validation")]
pub use validation::{SchemaError, ValidationBuilder, ValidationMiddleware};

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::RequestContext;
use crate::request::JsonRpcRequest;
use crate::response::JsonRpcResponse;

/// A composed dispatch stage: one request in, one response out.
///
/// The request travels as `Arc` so outer stages can still inspect it after
/// handing it to the inner call.
pub type DispatchFn =
    Arc<dyn Fn(RequestContext, Arc<JsonRpcRequest>) -> BoxFuture<'static, JsonRpcResponse> + Send + Sync>;

/// A request/response interceptor wrapped around the core dispatch.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: DispatchFn) -> DispatchFn;
}

/// Adapt a plain transform function into a [`Middleware`].
///
/// ```ignore
/// dispatcher.use_middleware(middleware_fn(|next| {
///     Arc::new(move |ctx, req| { /* ... */ })
/// }));
/// ```
pub fn middleware_fn<F>(f: F) -> MiddlewareFn<F>
where
    F: Fn(DispatchFn) -> DispatchFn + Send + Sync,
{
    MiddlewareFn { f }
}

/// [`Middleware`] backed by a transform closure. See [`middleware_fn`].
pub struct MiddlewareFn<F> {
    f: F,
}

impl<F> Middleware for MiddlewareFn<F>
where
    F: Fn(DispatchFn) -> DispatchFn + Send + Sync,
{
    fn wrap(&self, next: DispatchFn) -> DispatchFn {
        (self.f)(next)
    }
}

/// Ordered middleware chain, folded around the core dispatch at
/// pipeline-build time.
#[derive(Default, Clone)]
pub struct MiddlewareStack {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware. Earlier additions wrap later ones.
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.layers.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Fold the chain around `inner`. Folding in reverse registration order
    /// leaves the first-registered middleware outermost.
    pub fn compose(&self, inner: DispatchFn) -> DispatchFn {
        let mut chain = inner;
        for layer in self.layers.iter().rev() {
            chain = layer.wrap(chain);
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JsonRpcErrorObject;
    use crate::types::RequestId;
    use serde_json::value::to_raw_value;
    use std::sync::Mutex;

    fn terminal() -> DispatchFn {
        Arc::new(|_ctx, req| {
            Box::pin(async move {
                let raw = to_raw_value("handled").unwrap();
                JsonRpcResponse::result(req.id.clone(), raw)
            })
        })
    }

    fn tracing_layer(tag: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<dyn Middleware> {
        Arc::new(middleware_fn(move |next: DispatchFn| -> DispatchFn {
            let log = Arc::clone(&log);
            Arc::new(move |ctx, req| {
                let next = Arc::clone(&next);
                let log = Arc::clone(&log);
                Box::pin(async move {
                    log.lock().unwrap().push(format!("pre_{}", tag));
                    let resp = next(ctx, req).await;
                    log.lock().unwrap().push(format!("post_{}", tag));
                    resp
                })
            })
        }))
    }

    fn request() -> Arc<JsonRpcRequest> {
        Arc::new(JsonRpcRequest::new(RequestId::Number(1), "test", None))
    }

    #[tokio::test]
    async fn first_registered_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = MiddlewareStack::new();
        stack.push(tracing_layer("a", Arc::clone(&log)));
        stack.push(tracing_layer("b", Arc::clone(&log)));

        let chain = stack.compose(terminal());
        let resp = chain(RequestContext::new(), request()).await;
        assert!(!resp.is_error());

        let order = log.lock().unwrap().clone();
        assert_eq!(order, vec!["pre_a", "pre_b", "post_b", "post_a"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_inner_stages_but_unwinds_outer_ones() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = MiddlewareStack::new();
        stack.push(tracing_layer("outer", Arc::clone(&log)));

        let reject: Arc<dyn Middleware> = Arc::new(middleware_fn(|_next: DispatchFn| -> DispatchFn {
            Arc::new(|_ctx, req| {
                Box::pin(async move {
                    JsonRpcResponse::error(
                        req.id.clone(),
                        JsonRpcErrorObject::invalid_request(),
                    )
                })
            })
        }));
        stack.push(reject);
        stack.push(tracing_layer("inner", Arc::clone(&log)));

        let chain = stack.compose(terminal());
        let resp = chain(RequestContext::new(), request()).await;
        assert_eq!(resp.error.unwrap().code, -32600);

        // The rejecting stage never called next, so the innermost layer and
        // the terminal stage were skipped while the outer layer unwound.
        let order = log.lock().unwrap().clone();
        assert_eq!(order, vec!["pre_outer", "post_outer"]);
    }

    #[tokio::test]
    async fn empty_stack_is_a_passthrough() {
        let stack = MiddlewareStack::new();
        assert!(stack.is_empty());
        let chain = stack.compose(terminal());
        let resp = chain(RequestContext::new(), request()).await;
        assert_eq!(resp.id, Some(RequestId::Number(1)));
    }
}
