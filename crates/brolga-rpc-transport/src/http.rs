//! HTTP binding: one JSON-RPC call (single or batch) per POST request.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tracing::{debug, info};

use brolga_json_rpc_server::{JsonRpcDispatcher, RequestContext};

use crate::{Transport, TransportError};

/// HTTP listener forwarding request bodies to the resolver.
///
/// Only POST is accepted (405 otherwise). The body is sniffed for a leading
/// `[` to select batch vs single mode. When a CORS origin is configured,
/// OPTIONS preflights are answered and the allow headers are attached to
/// every response.
pub struct HttpTransport {
    bind: SocketAddr,
    cors_origin: Option<String>,
}

impl HttpTransport {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            cors_origin: None,
        }
    }

    /// Allow cross-origin requests from `origin` (use `"*"` for any).
    pub fn cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = Some(origin.into());
        self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn run(
        &self,
        ctx: RequestContext,
        dispatcher: Arc<JsonRpcDispatcher>,
    ) -> Result<(), TransportError> {
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!("HTTP transport listening on {}", self.bind);

        loop {
            let (stream, peer) = tokio::select! {
                _ = ctx.cancelled() => break,
                accepted = listener.accept() => accepted?,
            };
            debug!("new connection from {}", peer);

            let ctx = ctx.clone();
            let dispatcher = Arc::clone(&dispatcher);
            let cors_origin = self.cors_origin.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    handle_request(
                        req,
                        ctx.clone(),
                        Arc::clone(&dispatcher),
                        cors_origin.clone(),
                    )
                });
                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("error serving connection: {}", err);
                }
            });
        }
        Ok(())
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    ctx: RequestContext,
    dispatcher: Arc<JsonRpcDispatcher>,
    cors_origin: Option<String>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.method() == Method::OPTIONS && cors_origin.is_some() {
        let mut response = Response::new(Full::new(Bytes::new()));
        apply_cors_headers(response.headers_mut(), cors_origin.as_deref());
        return Ok(response);
    }
    if req.method() != Method::POST {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
        return Ok(response);
    }

    let mut out = Vec::new();
    match req.into_body().collect().await {
        Ok(collected) => {
            let body = collected.to_bytes();
            if is_batch(&body) {
                dispatcher.batch_request(ctx, &body, &mut out).await;
            } else {
                dispatcher.single_request(ctx, &body, &mut out).await;
            }
        }
        Err(e) => {
            debug!("can't read body: {}", e);
            let envelope = brolga_json_rpc_server::JsonRpcResponse::error(
                None,
                brolga_json_rpc_server::JsonRpcErrorObject::parse_error(),
            );
            out = serde_json::to_vec(&envelope).unwrap_or_default();
        }
    }

    let mut response = Response::new(Full::new(Bytes::from(out)));
    apply_cors_headers(response.headers_mut(), cors_origin.as_deref());
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap, cors_origin: Option<&str>) {
    let Some(origin) = cors_origin else {
        return;
    };
    if let Ok(value) = origin.parse() {
        headers.insert("Access-Control-Allow-Origin", value);
        headers.insert(
            "Access-Control-Allow-Headers",
            hyper::header::HeaderValue::from_static("Content-Type"),
        );
    }
}

/// A JSON-RPC call is a batch when the first non-whitespace byte is `[`.
fn is_batch(body: &[u8]) -> bool {
    body.iter()
        .copied()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| b == b'[')
}
