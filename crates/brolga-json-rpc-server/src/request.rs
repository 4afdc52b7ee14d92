use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::types::{JsonRpcVersion, RequestId};

/// A JSON-RPC request envelope.
///
/// `params` is kept as raw JSON; decoding into concrete shapes happens in
/// the typed handler adapter, never in the dispatch core. A `None` id marks
/// a notification: no response is ever produced for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(rename = "jsonrpc", default)]
    pub version: JsonRpcVersion,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Box<RawValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl JsonRpcRequest {
    pub fn new(
        id: impl Into<RequestId>,
        method: impl Into<String>,
        params: Option<Box<RawValue>>,
    ) -> Self {
        Self {
            version: JsonRpcVersion,
            method: method.into(),
            params,
            id: Some(id.into()),
        }
    }

    /// Create a notification (a request that never gets a response).
    pub fn notification(method: impl Into<String>, params: Option<Box<RawValue>>) -> Self {
        Self {
            version: JsonRpcVersion,
            method: method.into(),
            params,
            id: None,
        }
    }

    pub fn params(&self) -> Option<&RawValue> {
        self.params.as_deref()
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_request() {
        let req: JsonRpcRequest = serde_json::from_str(
            r#"{"jsonrpc":"2.0","method":"divide","params":{"a":10,"b":3},"id":1}"#,
        )
        .unwrap();
        assert_eq!(req.method, "divide");
        assert_eq!(req.id, Some(RequestId::Number(1)));
        assert_eq!(req.params().unwrap().get(), r#"{"a":10,"b":3}"#);
    }

    #[test]
    fn null_or_absent_id_is_a_notification() {
        let absent: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"ping"}"#).unwrap();
        assert!(absent.is_notification());

        let null: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"ping","id":null}"#).unwrap();
        assert!(null.is_notification());
    }

    #[test]
    fn missing_version_is_tolerated() {
        let req: JsonRpcRequest =
            serde_json::from_str(r#"{"method":"ping","id":"a"}"#).unwrap();
        assert_eq!(req.id, Some(RequestId::String("a".to_string())));
    }

    #[test]
    fn absent_fields_are_omitted_on_the_wire() {
        let req = JsonRpcRequest::notification("ping", None);
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("\"id\""));
        assert!(!json.contains("\"params\""));
        assert!(json.contains(r#""jsonrpc":"2.0""#));
    }
}
