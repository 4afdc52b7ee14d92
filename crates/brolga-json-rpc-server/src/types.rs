use std::fmt;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier of a JSON-RPC request.
///
/// The specification allows strings and numbers. A request without an id
/// (or with `"id": null`) is a notification and is modelled as
/// `Option<RequestId>::None` on the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

/// Protocol version marker.
///
/// Always serializes as the literal `"2.0"`. Incoming envelopes are not
/// rejected on a missing or mismatched `jsonrpc` field; the marker exists so
/// outgoing envelopes are always stamped correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(crate::JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer)?;
        Ok(JsonRpcVersion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_deserializes_untagged() {
        let n: RequestId = serde_json::from_str("7").unwrap();
        assert_eq!(n, RequestId::Number(7));

        let s: RequestId = serde_json::from_str(r#""abc""#).unwrap();
        assert_eq!(s, RequestId::String("abc".to_string()));
    }

    #[test]
    fn version_serializes_as_2_0() {
        let json = serde_json::to_string(&JsonRpcVersion).unwrap();
        assert_eq!(json, r#""2.0""#);
    }

    #[test]
    fn version_tolerates_any_input() {
        assert!(serde_json::from_str::<JsonRpcVersion>(r#""2.0""#).is_ok());
        assert!(serde_json::from_str::<JsonRpcVersion>(r#""1.0""#).is_ok());
        assert!(serde_json::from_str::<JsonRpcVersion>("null").is_ok());
    }
}
