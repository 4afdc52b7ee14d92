use std::collections::HashMap;
use std::sync::Arc;

use jsonschema::Validator;
use serde::Deserialize;
use serde_json::Value;
use serde_json::value::RawValue;
use thiserror::Error;

use super::{DispatchFn, Middleware};
use crate::error::JsonRpcErrorObject;
use crate::response::JsonRpcResponse;

/// Failure to build a [`ValidationMiddleware`].
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid schema document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    #[error("invalid {kind} schema for method '{method}': {message}")]
    Compile {
        method: String,
        kind: &'static str,
        message: String,
    },
}

struct MethodSchema {
    request: Option<Validator>,
    response: Option<Validator>,
}

/// Validates request params and response results against per-method JSON
/// schemas.
///
/// Request params are checked before the inner call; a violation
/// short-circuits with InvalidParams (-32602), the message listing every
/// violated property path and reason. Successful results are checked after
/// the inner call under the same error shape. Methods without a schema pass
/// through unchecked; method keys are matched case-insensitively.
pub struct ValidationMiddleware {
    schemas: Arc<HashMap<String, MethodSchema>>,
}

#[derive(Deserialize)]
struct RawMethodSchema {
    #[serde(default)]
    request: Option<Value>,
    #[serde(default)]
    response: Option<Value>,
}

impl ValidationMiddleware {
    pub fn builder() -> ValidationBuilder {
        ValidationBuilder::default()
    }

    /// Build from a JSON document of the shape
    /// `{"method": {"request": <schema>, "response": <schema>}}` where both
    /// schemas are optional.
    pub fn from_json(document: &str) -> Result<Self, SchemaError> {
        let raw: HashMap<String, RawMethodSchema> = serde_json::from_str(document)?;
        let mut builder = ValidationBuilder::default();
        for (method, schema) in raw {
            if let Some(request) = schema.request {
                builder = builder.request_schema(&method, request);
            }
            if let Some(response) = schema.response {
                builder = builder.response_schema(&method, response);
            }
        }
        builder.build()
    }
}

/// Collects per-method schemas and compiles them into a
/// [`ValidationMiddleware`].
#[derive(Default)]
pub struct ValidationBuilder {
    methods: HashMap<String, (Option<Value>, Option<Value>)>,
}

impl ValidationBuilder {
    pub fn request_schema(mut self, method: &str, schema: Value) -> Self {
        self.methods.entry(method.to_lowercase()).or_default().0 = Some(schema);
        self
    }

    pub fn response_schema(mut self, method: &str, schema: Value) -> Self {
        self.methods.entry(method.to_lowercase()).or_default().1 = Some(schema);
        self
    }

    pub fn build(self) -> Result<ValidationMiddleware, SchemaError> {
        let mut schemas = HashMap::new();
        for (method, (request, response)) in self.methods {
            let entry = MethodSchema {
                request: compile(&method, "request", request)?,
                response: compile(&method, "response", response)?,
            };
            schemas.insert(method, entry);
        }
        Ok(ValidationMiddleware {
            schemas: Arc::new(schemas),
        })
    }
}

fn compile(
    method: &str,
    kind: &'static str,
    schema: Option<Value>,
) -> Result<Option<Validator>, SchemaError> {
    schema
        .map(|schema| {
            Validator::new(&schema).map_err(|e| SchemaError::Compile {
                method: method.to_string(),
                kind,
                message: e.to_string(),
            })
        })
        .transpose()
}

fn raw_to_value(raw: Option<&RawValue>) -> Value {
    raw.and_then(|raw| serde_json::from_str(raw.get()).ok())
        .unwrap_or(Value::Null)
}

fn violations(validator: &Validator, data: &Value) -> Option<JsonRpcErrorObject> {
    let messages: Vec<String> = validator
        .iter_errors(data)
        .map(|e| format!("{}: {}", e.instance_path, e))
        .collect();
    if messages.is_empty() {
        None
    } else {
        Some(JsonRpcErrorObject::invalid_params(messages.join("\n")))
    }
}

impl Middleware for ValidationMiddleware {
    fn wrap(&self, next: DispatchFn) -> DispatchFn {
        let schemas = Arc::clone(&self.schemas);
        Arc::new(move |ctx, req| {
            let next = Arc::clone(&next);
            let schemas = Arc::clone(&schemas);
            Box::pin(async move {
                let Some(entry) = schemas.get(&req.method.to_lowercase()) else {
                    return next(ctx, req).await;
                };

                if let Some(validator) = &entry.request {
                    let params = raw_to_value(req.params());
                    if let Some(error) = violations(validator, &params) {
                        return JsonRpcResponse::error(req.id.clone(), error);
                    }
                }

                let response = next(ctx, Arc::clone(&req)).await;

                if let Some(validator) = &entry.response {
                    if let Some(result) = &response.result {
                        let result = raw_to_value(Some(result));
                        if let Some(error) = violations(validator, &result) {
                            return JsonRpcResponse::error(req.id.clone(), error);
                        }
                    }
                }

                response
            })
        })
    }
}
