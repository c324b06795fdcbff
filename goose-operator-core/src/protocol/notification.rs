//! Synthetic messages the proxy sends to the editor on its own behalf.

use serde_json::{Value, json};

use crate::jsonrpc::JsonRpcId;

use super::SESSION_UPDATE;

/// Build a `session/update` notification carrying one text update.
///
/// The session id is omitted when the originating prompt had none.
pub fn session_update(session_id: Option<&str>, text: &str) -> Value {
    let mut params = json!({
        "updates": [{
            "type": "text",
            "text": text,
        }]
    });
    if let Some(sid) = session_id {
        params["sessionId"] = Value::String(sid.to_string());
    }
    json!({
        "jsonrpc": "2.0",
        "method": SESSION_UPDATE,
        "params": params,
    })
}

/// Build the response that closes a blocked prompt request.
pub fn refusal_response(id: &JsonRpcId) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": { "stopReason": "refusal" },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_update_shape() {
        let v = session_update(Some("abc"), "hello");
        assert_eq!(v["jsonrpc"], "2.0");
        assert_eq!(v["method"], "session/update");
        assert_eq!(v["params"]["sessionId"], "abc");
        assert_eq!(v["params"]["updates"][0]["type"], "text");
        assert_eq!(v["params"]["updates"][0]["text"], "hello");
        assert!(v.get("id").is_none());
    }

    #[test]
    fn test_session_update_without_session() {
        let v = session_update(None, "x");
        assert!(v["params"].get("sessionId").is_none());
    }

    #[test]
    fn test_refusal_echoes_id_type() {
        let v = refusal_response(&JsonRpcId::String("7".into()));
        assert_eq!(v["id"], "7");
        assert_eq!(v["result"]["stopReason"], "refusal");
        let v = refusal_response(&JsonRpcId::Number(7));
        assert_eq!(v["id"], 7);
    }
}
