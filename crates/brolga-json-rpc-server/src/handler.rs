use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::value::{RawValue, to_raw_value};

use crate::context::RequestContext;
use crate::error::JsonRpcErrorObject;

/// Outcome of an untyped handler invocation.
pub type HandlerResult = Result<Box<RawValue>, JsonRpcErrorObject>;

/// The untyped handler contract the dispatch core works against.
///
/// Implementations receive the request params as raw JSON and produce a raw
/// JSON result or a JSON-RPC error object. Most users never implement this
/// directly; [`typed`] adapts a strongly-typed async function to it.
#[async_trait]
pub trait JsonRpcHandler: Send + Sync {
    async fn call(&self, ctx: RequestContext, params: Option<&RawValue>) -> HandlerResult;
}

/// Adapter exposing a typed `async (RequestContext, Req) -> Result<Resp, E>`
/// function as a [`JsonRpcHandler`].
///
/// This is the only place typed user code meets the untyped dispatch core:
/// params are decoded here, results are encoded here, and the core never
/// learns about concrete request/response shapes.
pub struct TypedHandler<F, Req, Resp, Err, Fut> {
    handler: F,
    _marker: PhantomData<fn(Req) -> (Resp, Err, Fut)>,
}

impl<F, Req, Resp, Err, Fut> TypedHandler<F, Req, Resp, Err, Fut>
where
    F: Fn(RequestContext, Req) -> Fut + Send + Sync,
    Req: DeserializeOwned + Send + Sync,
    Resp: Serialize + Send,
    Err: fmt::Display + Send,
    Fut: Future<Output = Result<Resp, Err>> + Send,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Req, Resp, Err, Fut> JsonRpcHandler for TypedHandler<F, Req, Resp, Err, Fut>
where
    F: Fn(RequestContext, Req) -> Fut + Send + Sync,
    Req: DeserializeOwned + Send + Sync,
    Resp: Serialize + Send,
    Err: fmt::Display + Send,
    Fut: Future<Output = Result<Resp, Err>> + Send,
{
    async fn call(&self, ctx: RequestContext, params: Option<&RawValue>) -> HandlerResult {
        // Absent params decode as JSON null, so nullable request shapes work
        // without an envelope-level special case.
        let raw = params.map_or("null", RawValue::get);
        let request: Req =
            serde_json::from_str(raw).map_err(|_| JsonRpcErrorObject::parse_error())?;

        let response = (self.handler)(ctx, request)
            .await
            .map_err(|e| JsonRpcErrorObject::user_error(e.to_string()))?;

        to_raw_value(&response)
            .map_err(|e| JsonRpcErrorObject::internal_error(Some(e.to_string())))
    }
}

/// Wrap a typed async function as an untyped handler.
///
/// ```ignore
/// async fn multiply(_ctx: RequestContext, args: Args) -> Result<i64, Infallible> {
///     Ok(args.a * args.b)
/// }
///
/// dispatcher.register("multiply", typed(multiply));
/// ```
pub fn typed<F, Req, Resp, Err, Fut>(handler: F) -> TypedHandler<F, Req, Resp, Err, Fut>
where
    F: Fn(RequestContext, Req) -> Fut + Send + Sync,
    Req: DeserializeOwned + Send + Sync,
    Resp: Serialize + Send,
    Err: fmt::Display + Send,
    Fut: Future<Output = Result<Resp, Err>> + Send,
{
    TypedHandler::new(handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::convert::Infallible;

    #[derive(Debug, Deserialize)]
    struct Args {
        a: i64,
        b: i64,
    }

    async fn multiply(_ctx: RequestContext, args: Args) -> Result<i64, Infallible> {
        Ok(args.a * args.b)
    }

    async fn divide(_ctx: RequestContext, args: Args) -> Result<i64, String> {
        if args.b == 0 {
            return Err("divide by zero".to_string());
        }
        Ok(args.a / args.b)
    }

    fn raw(json: &str) -> Box<RawValue> {
        RawValue::from_string(json.to_string()).unwrap()
    }

    #[tokio::test]
    async fn decodes_params_and_encodes_result() {
        let handler = typed(multiply);
        let result = handler
            .call(RequestContext::new(), Some(&raw(r#"{"a":3,"b":4}"#)))
            .await
            .unwrap();
        assert_eq!(result.get(), "12");
    }

    #[tokio::test]
    async fn malformed_params_yield_parse_error() {
        let handler = typed(multiply);
        let err = handler
            .call(RequestContext::new(), Some(&raw(r#"{"a":"x"}"#)))
            .await
            .unwrap_err();
        assert_eq!(err.code, -32700);
        assert_eq!(err.message, "Parse error");
    }

    #[tokio::test]
    async fn absent_params_decode_as_null() {
        let handler = typed(multiply);
        // Args has required fields, so null params cannot reach the handler.
        let err = handler.call(RequestContext::new(), None).await.unwrap_err();
        assert_eq!(err.code, -32700);
    }

    #[tokio::test]
    async fn handler_error_becomes_user_error_verbatim() {
        let handler = typed(divide);
        let err = handler
            .call(RequestContext::new(), Some(&raw(r#"{"a":1,"b":0}"#)))
            .await
            .unwrap_err();
        assert_eq!(err.code, -32000);
        assert_eq!(err.message, "divide by zero");
    }
}
