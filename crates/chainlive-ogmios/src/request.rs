//! JSON-RPC 2.0 wire types, as spoken by Ogmios.
//!
//! Ogmios takes named parameters (an object, or nothing) and echoes the
//! request `id` and `method` back on every response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC request ID: string, number, or null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(u64),
    String(String),
    #[default]
    Null,
}

impl std::fmt::Display for RpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub id: RpcId,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id: RpcId::Number(id),
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default)]
    pub id: RpcId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Whether this response answers request `id`. An error with a `null` id
    /// (the server could not read the request) answers whatever is in flight.
    pub fn answers(&self, id: u64) -> bool {
        match &self.id {
            RpcId::Number(n) => *n == id,
            RpcId::Null => self.error.is_some(),
            RpcId::String(_) => false,
        }
    }

    /// Unwrap the result value or return the error object.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        if let Some(err) = self.error {
            Err(err)
        } else {
            Ok(self.result.unwrap_or(Value::Null))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_without_params() {
        let req = JsonRpcRequest::new(7, "nextBlock", None);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, json!({"jsonrpc": "2.0", "method": "nextBlock", "id": 7}));
    }

    #[test]
    fn request_with_named_params() {
        let req = JsonRpcRequest::new(1, "findIntersection", Some(json!({"points": ["origin"]})));
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""params":{"points":["origin"]}"#));
    }

    #[test]
    fn null_id_error_answers_request_in_flight() {
        let resp: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "error": {"code": -32700, "message": "Parse error"},
            "id": null
        }))
        .unwrap();
        assert!(resp.answers(4));

        let resp: JsonRpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "result": {}, "id": null})).unwrap();
        assert!(!resp.answers(4));

        let resp: JsonRpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "result": {}, "id": 3})).unwrap();
        assert!(!resp.answers(4));
        assert!(resp.answers(3));
    }

    #[test]
    fn response_echoes_method() {
        let resp: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "method": "nextBlock",
            "result": {"direction": "forward"},
            "id": 3
        }))
        .unwrap();
        assert_eq!(resp.method.as_deref(), Some("nextBlock"));
        assert_eq!(resp.id, RpcId::Number(3));
        assert_eq!(resp.into_result().unwrap()["direction"], "forward");
    }

    #[test]
    fn response_error() {
        let resp: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "error": {"code": 1000, "message": "No intersection found."},
        }))
        .unwrap();
        assert_eq!(resp.id, RpcId::Null);
        assert_eq!(resp.into_result().unwrap_err().code, 1000);
    }
}
