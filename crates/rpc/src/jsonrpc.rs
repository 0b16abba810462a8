//! JSON-RPC 2.0 envelope
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    /// Passed through as-is: array-style and object-style params both occur
    pub params: &'a Value,
    pub id: u64,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(method: &'a str, params: &'a Value, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JsonRpcErrorObject {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// A node's answer: either a `result` or an `error`, never both
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRpcResponse {
    Result(Value),
    Error(JsonRpcErrorObject),
}

impl JsonRpcResponse {
    /// Parse a response body
    ///
    /// A `null` result is a valid result. A body with neither field, or
    /// with a malformed `error`, is rejected.
    pub fn from_slice(body: &[u8]) -> Result<Self, String> {
        let mut map = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err("response is not a JSON object".into()),
            Err(err) => return Err(format!("malformed JSON: {err}")),
        };

        if let Some(error) = map.remove("error").filter(|e| !e.is_null()) {
            return serde_json::from_value(error)
                .map(JsonRpcResponse::Error)
                .map_err(|err| format!("malformed error object: {err}"));
        }

        match map.remove("result") {
            Some(result) => Ok(JsonRpcResponse::Result(result)),
            None => Err("response has neither result nor error".into()),
        }
    }
}
