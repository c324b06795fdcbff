//! JSON-RPC 2.0 id handling and message classification.
//!
//! The proxy only needs enough of JSON-RPC to label traffic in logs and to
//! echo request ids back when it answers a blocked prompt itself. Classification
//! operates on an already-parsed `serde_json::Value`.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// JSON-RPC request id.
///
/// Never coerce between types: if the client sends `"id": 1`, the answer
/// carries `"id": 1`, not `"id": "1"`. An explicit `null` id is distinct from
/// an absent one (absent means notification).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JsonRpcId {
    /// Integer id (`"id": 1`).
    Number(i64),
    /// String id (`"id": "abc-123"`).
    String(String),
    /// Explicit null id (`"id": null`).
    Null,
}

impl Serialize for JsonRpcId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            JsonRpcId::Number(n) => serializer.serialize_i64(*n),
            JsonRpcId::String(s) => serializer.serialize_str(s),
            JsonRpcId::Null => serializer.serialize_none(),
        }
    }
}

impl fmt::Display for JsonRpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonRpcId::Number(n) => write!(f, "{n}"),
            JsonRpcId::String(s) => write!(f, "{s}"),
            JsonRpcId::Null => write!(f, "null"),
        }
    }
}

/// JSON-RPC 2.0 message classification.
///
/// Determined by presence/absence of `id` and `method`:
/// - Request: both `id` and `method`
/// - Response: `id` but no `method`
/// - Notification: `method` but no `id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonRpcMessageKind {
    Request { id: JsonRpcId, method: String },
    Response { id: JsonRpcId },
    Notification { method: String },
}

impl JsonRpcMessageKind {
    /// Short label for structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            JsonRpcMessageKind::Request { .. } => "request",
            JsonRpcMessageKind::Response { .. } => "response",
            JsonRpcMessageKind::Notification { .. } => "notification",
        }
    }
}

/// Classify a parsed JSON-RPC value without taking ownership.
///
/// Validates `"jsonrpc": "2.0"`, then classifies on `id` / `method`.
///
/// # Errors
///
/// - `InvalidVersion` if the version field is missing or not `"2.0"`
/// - `InvalidId` if `id` is present but not a string, integer or null
/// - `Unclassifiable` if neither `id` nor `method` is present
pub fn classify_jsonrpc(value: &Value) -> Result<JsonRpcMessageKind, JsonRpcClassifyError> {
    let version = value.get("jsonrpc").and_then(|v| v.as_str());
    if version != Some("2.0") {
        return Err(JsonRpcClassifyError::InvalidVersion);
    }

    let id = value
        .get("id")
        .map(parse_id)
        .transpose()
        .map_err(|_| JsonRpcClassifyError::InvalidId)?;
    let method = value
        .get("method")
        .and_then(|v| v.as_str())
        .map(String::from);

    match (id, method) {
        (Some(id), Some(method)) => Ok(JsonRpcMessageKind::Request { id, method }),
        (Some(id), None) => Ok(JsonRpcMessageKind::Response { id }),
        (None, Some(method)) => Ok(JsonRpcMessageKind::Notification { method }),
        (None, None) => Err(JsonRpcClassifyError::Unclassifiable),
    }
}

/// Parse a JSON value into a [`JsonRpcId`].
///
/// Accepts string, integer, or null. Rejects floats, booleans, arrays, objects.
pub fn parse_id(value: &Value) -> Result<JsonRpcId, JsonRpcClassifyError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(JsonRpcId::Number)
            .ok_or(JsonRpcClassifyError::InvalidId),
        Value::String(s) => Ok(JsonRpcId::String(s.clone())),
        Value::Null => Ok(JsonRpcId::Null),
        _ => Err(JsonRpcClassifyError::InvalidId),
    }
}

/// Errors that can occur during JSON-RPC message classification.
#[derive(Debug, thiserror::Error)]
pub enum JsonRpcClassifyError {
    /// The `jsonrpc` field is missing or not `"2.0"`.
    #[error("missing or invalid jsonrpc version field")]
    InvalidVersion,
    /// The `id` field is present but not a string, integer, or null.
    #[error("invalid id field")]
    InvalidId,
    /// The message has neither `id` nor `method`.
    #[error("message has neither id nor method")]
    Unclassifiable,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_request() {
        let val = json!({"jsonrpc": "2.0", "id": 1, "method": "session/prompt", "params": {}});
        let kind = classify_jsonrpc(&val).unwrap();
        assert_eq!(
            kind,
            JsonRpcMessageKind::Request {
                id: JsonRpcId::Number(1),
                method: "session/prompt".to_string()
            }
        );
        assert_eq!(kind.label(), "request");
    }

    #[test]
    fn test_classify_response() {
        let val = json!({"jsonrpc": "2.0", "id": "a", "result": {}});
        let kind = classify_jsonrpc(&val).unwrap();
        assert_eq!(
            kind,
            JsonRpcMessageKind::Response {
                id: JsonRpcId::String("a".to_string())
            }
        );
    }

    #[test]
    fn test_classify_notification() {
        let val = json!({"jsonrpc": "2.0", "method": "session/update"});
        let kind = classify_jsonrpc(&val).unwrap();
        assert_eq!(kind.label(), "notification");
    }

    #[test]
    fn test_classify_missing_version() {
        let val = json!({"id": 1, "method": "x"});
        assert!(matches!(
            classify_jsonrpc(&val),
            Err(JsonRpcClassifyError::InvalidVersion)
        ));
    }

    #[test]
    fn test_classify_unclassifiable() {
        let val = json!({"jsonrpc": "2.0"});
        assert!(matches!(
            classify_jsonrpc(&val),
            Err(JsonRpcClassifyError::Unclassifiable)
        ));
    }

    #[test]
    fn test_float_and_bool_ids_rejected() {
        for id in [json!(1.5), json!(true), json!([1]), json!({"a": 1})] {
            let val = json!({"jsonrpc": "2.0", "id": id, "method": "x"});
            assert!(matches!(
                classify_jsonrpc(&val),
                Err(JsonRpcClassifyError::InvalidId)
            ));
        }
    }

    #[test]
    fn test_id_serializes_without_coercion() {
        assert_eq!(serde_json::to_value(JsonRpcId::Number(7)).unwrap(), json!(7));
        assert_eq!(
            serde_json::to_value(JsonRpcId::String("7".into())).unwrap(),
            json!("7")
        );
        assert_eq!(serde_json::to_value(JsonRpcId::Null).unwrap(), json!(null));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(JsonRpcId::Number(3).to_string(), "3");
        assert_eq!(JsonRpcId::String("x".into()).to_string(), "x");
        assert_eq!(JsonRpcId::Null.to_string(), "null");
    }
}
