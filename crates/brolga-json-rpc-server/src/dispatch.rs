use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::context::RequestContext;
use crate::error::JsonRpcErrorObject;
use crate::error_codes;
use crate::handler::JsonRpcHandler;
use crate::middleware::{DispatchFn, Middleware, MiddlewareStack};
use crate::registry::HandlerRegistry;
use crate::request::JsonRpcRequest;
use crate::response::JsonRpcResponse;

/// The request-resolution engine.
///
/// Owns the handler registry and the middleware pipeline and exposes the
/// resolution entry points transports drive: [`single_request`] for one
/// envelope, [`batch_request`] for a request array, and [`resolve`] for a
/// persistent stream of newline-delimited envelopes.
///
/// [`single_request`]: JsonRpcDispatcher::single_request
/// [`batch_request`]: JsonRpcDispatcher::batch_request
/// [`resolve`]: JsonRpcDispatcher::resolve
#[derive(Default)]
pub struct JsonRpcDispatcher {
    registry: Arc<HandlerRegistry>,
    middleware: MiddlewareStack,
}

impl JsonRpcDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a method. Names are canonicalized to lower
    /// case; the last registration wins. Safe to call while dispatches are
    /// in flight.
    pub fn register<H>(&self, method: &str, handler: H)
    where
        H: JsonRpcHandler + 'static,
    {
        self.register_arc(method, Arc::new(handler));
    }

    pub fn register_arc(&self, method: &str, handler: Arc<dyn JsonRpcHandler>) {
        debug!(method, "register method");
        self.registry.register(method, handler);
    }

    /// Append a middleware to the pipeline. The first middleware added is
    /// outermost around the core dispatch.
    pub fn use_middleware<M>(&mut self, middleware: M)
    where
        M: Middleware + 'static,
    {
        self.middleware.push(Arc::new(middleware));
    }

    pub fn registered_methods(&self) -> Vec<String> {
        self.registry.methods()
    }

    /// Fold the middleware stack around the core method-call stage.
    fn compose(&self) -> DispatchFn {
        let registry = Arc::clone(&self.registry);
        let core: DispatchFn = Arc::new(move |ctx, req| {
            let registry = Arc::clone(&registry);
            Box::pin(async move { call_method(registry, ctx, req).await })
        });
        self.middleware.compose(core)
    }

    /// Run one already-decoded request through the composed pipeline.
    ///
    /// Notifications produce a response too; callers that write to a peer
    /// are responsible for discarding it.
    pub async fn dispatch(&self, ctx: RequestContext, request: JsonRpcRequest) -> JsonRpcResponse {
        let chain = self.compose();
        chain(ctx, Arc::new(request)).await
    }

    /// Dispatch every element of a batch as an independent task and collect
    /// the non-notification responses in completion order.
    pub async fn dispatch_batch(
        &self,
        ctx: RequestContext,
        requests: Vec<JsonRpcRequest>,
    ) -> Vec<JsonRpcResponse> {
        let chain = self.compose();
        let mut tasks = JoinSet::new();
        for request in requests {
            let chain = Arc::clone(&chain);
            let ctx = ctx.clone();
            tasks.spawn(async move {
                let request = Arc::new(request);
                let notification = request.is_notification();
                let response = chain(ctx, request).await;
                (!notification).then_some(response)
            });
        }

        // Responses carry ids, not positions, so completion order is fine.
        let mut responses = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(response)) => responses.push(response),
                Ok(None) => {}
                Err(e) => error!("batch task failed: {}", e),
            }
        }
        responses
    }

    /// Decode exactly one request envelope from `body` and write the
    /// response. A decode failure yields a single ParseError envelope; a
    /// notification yields nothing.
    pub async fn single_request<W>(&self, ctx: RequestContext, body: &[u8], writer: &mut W)
    where
        W: AsyncWrite + Unpin,
    {
        let request: JsonRpcRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(e) => {
                debug!("can't decode request: {}", e);
                let response = JsonRpcResponse::error(None, JsonRpcErrorObject::parse_error());
                if let Err(e) = write_json(writer, &response).await {
                    warn!("can't write response: {}", e);
                }
                return;
            }
        };

        let id = request.id.clone();
        let notification = request.is_notification();
        let response = self.dispatch(ctx, request).await;
        if notification {
            return;
        }
        if let Err(e) = write_json(writer, &response).await {
            warn!("can't write response: {}", e);
            write_internal_error(writer, id).await;
        }
    }

    /// Decode a request array from `body`, dispatch every element
    /// concurrently, and write the aggregate response array once all
    /// elements completed. Invalid array JSON yields one ParseError
    /// envelope for the whole batch, never per-element errors.
    pub async fn batch_request<W>(&self, ctx: RequestContext, body: &[u8], writer: &mut W)
    where
        W: AsyncWrite + Unpin,
    {
        let requests: Vec<JsonRpcRequest> = match serde_json::from_slice(body) {
            Ok(requests) => requests,
            Err(e) => {
                debug!("can't decode batch: {}", e);
                let response = JsonRpcResponse::error(None, JsonRpcErrorObject::parse_error());
                if let Err(e) = write_json(writer, &response).await {
                    warn!("can't write response: {}", e);
                }
                return;
            }
        };

        let responses = self.dispatch_batch(ctx, requests).await;
        if let Err(e) = write_json(writer, &responses).await {
            warn!("can't write batch response: {}", e);
            write_internal_error(writer, None).await;
        }
    }

    /// Streaming mode over newline-delimited JSON documents.
    ///
    /// Reads one envelope per line until end-of-stream, a decode error, or
    /// cancellation. With `parallel == true` every request runs as an
    /// independent task synchronized only on the shared writer lock, and
    /// all in-flight tasks are joined before returning; otherwise each
    /// request finishes before the next line is read.
    pub async fn resolve<R, W>(&self, ctx: RequestContext, reader: R, writer: W, parallel: bool)
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let chain = self.compose();
        let writer = Arc::new(Mutex::new(writer));
        let mut tasks = JoinSet::new();
        let mut lines = reader.lines();

        loop {
            let line = tokio::select! {
                _ = ctx.cancelled() => break,
                line = lines.next_line() => line,
            };
            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    debug!("read error: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(request) => request,
                Err(e) => {
                    debug!("can't decode request: {}", e);
                    break;
                }
            };

            let exec = execute(Arc::clone(&chain), ctx.clone(), request, Arc::clone(&writer));
            if parallel {
                tasks.spawn(exec);
            } else {
                exec.await;
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("request task failed: {}", e);
            }
        }
    }
}

/// Innermost dispatch stage: registry lookup plus handler invocation.
///
/// An unknown method turns into MethodNotFound here, which is what makes it
/// traverse every middleware's outer stage without reaching a handler.
async fn call_method(
    registry: Arc<HandlerRegistry>,
    ctx: RequestContext,
    req: Arc<JsonRpcRequest>,
) -> JsonRpcResponse {
    let Some(handler) = registry.lookup(&req.method) else {
        return JsonRpcResponse::error(req.id.clone(), JsonRpcErrorObject::method_not_found());
    };
    match handler.call(ctx, req.params()).await {
        Ok(result) => JsonRpcResponse::result(req.id.clone(), result),
        Err(e) => {
            debug!(method = %req.method, "handler error: {}", e);
            JsonRpcResponse::error(req.id.clone(), e)
        }
    }
}

/// Run one streamed request to completion and write its response under the
/// writer lock.
async fn execute<W>(
    chain: DispatchFn,
    ctx: RequestContext,
    request: JsonRpcRequest,
    writer: Arc<Mutex<W>>,
) where
    W: AsyncWrite + Unpin,
{
    let request = Arc::new(request);
    let id = request.id.clone();
    let notification = request.is_notification();
    let response = chain(ctx, request).await;
    if notification {
        return;
    }

    let mut writer = writer.lock().await;
    if let Err(e) = write_json(&mut *writer, &response).await {
        warn!("can't write response: {}", e);
        write_internal_error(&mut *writer, id).await;
    }
}

/// Encode `value` as one newline-terminated JSON document and flush.
async fn write_json<W, T>(writer: &mut W, value: &T) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let mut buf = serde_json::to_vec(value).map_err(std::io::Error::other)?;
    buf.push(b'\n');
    writer.write_all(&buf).await?;
    writer.flush().await
}

/// Best-effort InternalError envelope after a failed response write.
async fn write_internal_error<W>(writer: &mut W, id: Option<crate::types::RequestId>)
where
    W: AsyncWrite + Unpin,
{
    let fallback = JsonRpcResponse::error(
        id,
        JsonRpcErrorObject::from_code(error_codes::INTERNAL_ERROR),
    );
    if let Err(e) = write_json(writer, &fallback).await {
        warn!("can't write error response: {}", e);
    }
}
