//! # Transports for the brolga JSON-RPC dispatch engine
//!
//! A [`Transport`] establishes byte-stream sessions with peers and drives
//! the resolver's entry points for each session; the engine itself stays
//! transport-agnostic. This crate ships HTTP, raw TCP and WebSocket
//! bindings plus [`serve`], which runs a set of transports until the first
//! fatal error or cancellation.

pub mod http;
pub mod tcp;
pub mod ws;

pub use http::HttpTransport;
pub use tcp::TcpTransport;
pub use ws::WebSocketTransport;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::error;

use brolga_json_rpc_server::{JsonRpcDispatcher, RequestContext};

/// Failure to establish or keep a listening transport.
///
/// Per-request failures never surface here; they become JSON-RPC error
/// envelopes inside the engine.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// A component that feeds peer byte streams into a dispatcher.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Accept sessions until cancellation or a fatal listener error, calling
    /// the appropriate resolver entry point once per logical session.
    async fn run(
        &self,
        ctx: RequestContext,
        dispatcher: Arc<JsonRpcDispatcher>,
    ) -> Result<(), TransportError>;
}

/// Run every transport concurrently until the first returns an error.
///
/// On the first error the shared cancellation token fires so the remaining
/// transports shut down; the error is returned once all of them finished.
pub async fn serve(
    ctx: RequestContext,
    dispatcher: Arc<JsonRpcDispatcher>,
    transports: Vec<Arc<dyn Transport>>,
) -> Result<(), TransportError> {
    let mut tasks = JoinSet::new();
    for transport in transports {
        let ctx = ctx.clone();
        let dispatcher = Arc::clone(&dispatcher);
        tasks.spawn(async move { transport.run(ctx, dispatcher).await });
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                if first_error.is_none() {
                    ctx.cancellation().cancel();
                    first_error = Some(e);
                }
            }
            Err(e) => {
                error!("transport task failed: {}", e);
                ctx.cancellation().cancel();
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
