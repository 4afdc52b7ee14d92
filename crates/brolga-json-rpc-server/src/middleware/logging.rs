use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use super::{DispatchFn, Middleware};

/// Logs method, params and wall-clock latency for every dispatch.
///
/// Emits one `tracing` event per call after the inner stages complete; the
/// response is passed through untouched. With no subscriber installed this
/// is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for LoggingMiddleware {
    fn wrap(&self, next: DispatchFn) -> DispatchFn {
        Arc::new(move |ctx, req| {
            let next = Arc::clone(&next);
            Box::pin(async move {
                let started = Instant::now();
                let response = next(ctx, Arc::clone(&req)).await;
                let elapsed = started.elapsed().as_micros();

                let args = match req.params() {
                    None => "<empty body>".to_string(),
                    Some(raw) => match serde_json::from_str::<serde_json::Value>(raw.get()) {
                        Ok(value) => value.to_string(),
                        Err(e) => format!("<invalid body: {}>", e),
                    },
                };
                info!(method = %req.method, args = %args, elapsed_us = elapsed as u64, "rpc call");

                response
            })
        })
    }
}
