use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error_codes;

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    /// Application errors surfaced by handlers (-32000)
    UserError,
    /// Implementation-defined server errors (-32099 to -32001)
    ServerError(i64),
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::UserError => error_codes::USER_ERROR,
            JsonRpcErrorCode::ServerError(code) => *code,
        }
    }

    /// Canonical message for the reserved codes, empty otherwise.
    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::UserError => "Other error",
            JsonRpcErrorCode::ServerError(_) => "",
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC error object carried in the `error` member of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Build an error object for any integer code.
    ///
    /// The six reserved codes get their canonical message; every other code
    /// carries an empty message until one is set explicitly.
    pub fn from_code(code: i64) -> Self {
        let message = match code {
            error_codes::PARSE_ERROR => "Parse error",
            error_codes::INVALID_REQUEST => "Invalid Request",
            error_codes::METHOD_NOT_FOUND => "Method not found",
            error_codes::INVALID_PARAMS => "Invalid params",
            error_codes::INTERNAL_ERROR => "Internal error",
            error_codes::USER_ERROR => "Other error",
            _ => "",
        };
        Self::new(code, message)
    }

    pub fn parse_error() -> Self {
        Self::from_code(error_codes::PARSE_ERROR)
    }

    pub fn invalid_request() -> Self {
        Self::from_code(error_codes::INVALID_REQUEST)
    }

    pub fn method_not_found() -> Self {
        Self::from_code(error_codes::METHOD_NOT_FOUND)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_PARAMS, message)
    }

    pub fn internal_error(message: Option<String>) -> Self {
        match message {
            Some(message) => Self::new(error_codes::INTERNAL_ERROR, message),
            None => Self::from_code(error_codes::INTERNAL_ERROR),
        }
    }

    /// Application error reported by a handler. The message is carried
    /// verbatim; callers are responsible for not leaking internals through
    /// handler error text.
    pub fn user_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::USER_ERROR, message)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl fmt::Display for JsonRpcErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "jsonrpc error: code: {} message: {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcErrorObject {}
