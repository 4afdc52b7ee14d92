//! Raw TCP binding: one streaming resolve session per connection.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::BufReader;
use tracing::{debug, info};

use brolga_json_rpc_server::{JsonRpcDispatcher, RequestContext};

use crate::{Transport, TransportError};

/// TCP listener carrying newline-delimited JSON-RPC documents per
/// connection.
///
/// With `parallel` set, requests on one connection execute as independent
/// tasks and responses are written in completion order; otherwise requests
/// are processed strictly in arrival order.
pub struct TcpTransport {
    bind: SocketAddr,
    parallel: bool,
}

impl TcpTransport {
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
impl Transport for TcpTransport {
    async fn run(
        &self,
        ctx: RequestContext,
        dispatcher: Arc<JsonRpcDispatcher>,
    ) -> Result<(), TransportError> {
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!("TCP transport listening on {}", self.bind);

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
                let (read_half, write_half) = stream.into_split();
                dispatcher
                    .resolve(ctx, BufReader::new(read_half), write_half, parallel)
                    .await;
                debug!("connection from {} closed", peer);
            });
        }
        Ok(())
    }
}
