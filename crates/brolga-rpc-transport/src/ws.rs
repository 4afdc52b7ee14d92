//! WebSocket binding: one resolve session per incoming message.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::io::AsyncReadExt;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use brolga_json_rpc_server::{JsonRpcDispatcher, RequestContext};

use crate::{Transport, TransportError};

/// WebSocket listener treating every text or binary frame as a stream of
/// JSON-RPC documents.
///
/// The session's buffered output is sent back as a single text frame; a
/// frame holding only notifications produces no reply. Ping/pong frames are
/// answered by the protocol layer.
pub struct WebSocketTransport {
    bind: SocketAddr,
    parallel: bool,
}

impl WebSocketTransport {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            parallel: false,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn run(
        &self,
        ctx: RequestContext,
        dispatcher: Arc<JsonRpcDispatcher>,
    ) -> Result<(), TransportError> {
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!("WebSocket transport listening on {}", self.bind);

        loop {
            let (stream, peer) = tokio::select! {
                _ = ctx.cancelled() => break,
                accepted = listener.accept() => accepted?,
            };
            debug!("new connection from {}", peer);

            let ctx = ctx.clone();
            let dispatcher = Arc::clone(&dispatcher);
            let parallel = self.parallel;
            tokio::spawn(async move {
                if let Err(e) = handle_socket(stream, ctx, dispatcher, parallel).await {
                    debug!("websocket session from {} ended: {}", peer, e);
                }
            });
        }
        Ok(())
    }
}

async fn handle_socket(
    stream: tokio::net::TcpStream,
    ctx: RequestContext,
    dispatcher: Arc<JsonRpcDispatcher>,
    parallel: bool,
) -> Result<(), TransportError> {
    let ws = accept_async(stream).await?;
    let (mut sink, mut messages) = ws.split();

    loop {
        let message = tokio::select! {
            _ = ctx.cancelled() => break,
            message = messages.next() => match message {
                Some(message) => message?,
                None => break,
            },
        };
        let data = match message {
            Message::Text(text) => text.as_bytes().to_vec(),
            Message::Binary(data) => data.to_vec(),
            Message::Close(_) => break,
            _ => continue,
        };

        let output = resolve_buffered(&dispatcher, ctx.clone(), &data, parallel).await;
        if !output.is_empty() {
            sink.send(Message::text(String::from_utf8_lossy(&output).into_owned()))
                .await?;
        }
    }
    Ok(())
}

/// Run one resolve session over an in-memory pipe and collect its output.
///
/// The drain task runs alongside the session so large outputs cannot fill
/// the pipe and stall the resolver.
async fn resolve_buffered(
    dispatcher: &JsonRpcDispatcher,
    ctx: RequestContext,
    data: &[u8],
    parallel: bool,
) -> Vec<u8> {
    let (mut rx, tx) = tokio::io::duplex(64 * 1024);
    let drain = tokio::spawn(async move {
        let mut out = Vec::new();
        let _ = rx.read_to_end(&mut out).await;
        out
    });

    dispatcher.resolve(ctx, data, tx, parallel).await;

    match drain.await {
        Ok(out) => out,
        Err(e) => {
            debug!("output drain failed: {}", e);
            Vec::new()
        }
    }
}
