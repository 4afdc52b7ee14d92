//! Calculator JSON-RPC service.
//!
//! Exposes `multiply` and `divide` over HTTP (port 8000, CORS enabled) and
//! raw TCP (port 3000), with request logging and schema validation on
//! `divide`.
//!
//! Try it:
//! ```bash
//! curl -X POST localhost:8000 \
//!   -d '{"jsonrpc":"2.0","method":"divide","params":{"a":10,"b":3},"id":1}'
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::info;

use brolga_json_rpc_server::prelude::*;
use brolga_rpc_transport::{HttpTransport, TcpTransport, Transport, serve};

#[derive(Debug, Deserialize)]
struct Args {
    a: i64,
    b: i64,
}

#[derive(Debug, Serialize)]
struct Quotient {
    quo: i64,
    rem: i64,
}

#[derive(Debug, Error)]
enum CalcError {
    #[error("divide by zero")]
    DivideByZero,
}

async fn multiply(_ctx: RequestContext, args: Args) -> Result<i64, Infallible> {
    Ok(args.a * args.b)
}

async fn divide(_ctx: RequestContext, args: Args) -> Result<Quotient, CalcError> {
    if args.b == 0 {
        return Err(CalcError::DivideByZero);
    }
    Ok(Quotient {
        quo: args.a / args.b,
        rem: args.a % args.b,
    })
}

fn divide_schemas() -> Result<ValidationMiddleware, SchemaError> {
    ValidationMiddleware::builder()
        .request_schema(
            "divide",
            json!({
                "type": "object",
                "properties": {
                    "a": {"type": "integer"},
                    "b": {"type": "integer", "not": {"const": 0}}
                },
                "required": ["a", "b"]
            }),
        )
        .response_schema(
            "divide",
            json!({
                "type": "object",
                "properties": {
                    "quo": {"type": "integer"},
                    "rem": {"type": "integer"}
                },
                "required": ["quo", "rem"]
            }),
        )
        .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut dispatcher = JsonRpcDispatcher::new();
    dispatcher.use_middleware(LoggingMiddleware::new());
    dispatcher.use_middleware(divide_schemas()?);
    dispatcher.register("multiply", typed(multiply));
    dispatcher.register("divide", typed(divide));

    let transports: Vec<Arc<dyn Transport>> = vec![
        Arc::new(HttpTransport::new(([127, 0, 0, 1], 8000).into()).cors_origin("*")),
        Arc::new(TcpTransport::new(([127, 0, 0, 1], 3000).into())),
    ];

    let ctx = RequestContext::new();
    let shutdown = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
            shutdown.cancellation().cancel();
        }
    });

    serve(ctx, Arc::new(dispatcher), transports).await?;
    Ok(())
}
