//! Decoded protocol units exchanged with the editor and the agent.
//!
//! One input line is one decode attempt. A line that decodes to a JSON object
//! becomes a [`Message`]; anything else that is not blank becomes
//! [`Frame::Opaque`] and travels (or is logged) without interpretation.

mod notification;
mod prompt;

pub use notification::{refusal_response, session_update};
pub use prompt::{PromptRequest, PromptShape};

use serde_json::{Map, Value};

use crate::jsonrpc::{JsonRpcClassifyError, JsonRpcId, JsonRpcMessageKind, classify_jsonrpc};

/// Method the editor uses to send a user prompt to the agent.
pub const SESSION_PROMPT: &str = "session/prompt";

/// Method the agent (or the proxy) uses to push session updates to the editor.
pub const SESSION_UPDATE: &str = "session/update";

/// Why a non-blank line could not become a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The line is not valid JSON.
    #[error("not JSON: {reason}")]
    NotJson { reason: String },
    /// The line is valid JSON but not an object (batch arrays, scalars).
    #[error("JSON value is not an object")]
    NotObject,
}

/// One unit read from either stream.
#[derive(Debug, Clone)]
pub enum Frame {
    /// Successfully decoded protocol message.
    Message(Message),
    /// Undecodable line, carried as raw text.
    Opaque { text: String, error: DecodeError },
}

impl Frame {
    /// Decode a single line (or a whole one-shot blob).
    ///
    /// Returns `None` for empty or whitespace-only input, which callers treat
    /// as a no-op. Never fails: decode problems yield [`Frame::Opaque`], whose
    /// text is the line minus its terminator and otherwise untouched.
    pub fn decode(line: &str) -> Option<Frame> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match Message::decode(trimmed) {
            Ok(msg) => Frame::Message(msg),
            Err(error) => Frame::Opaque {
                text: strip_terminator(line).to_string(),
                error,
            },
        })
    }
}

/// Remove one trailing `\n` or `\r\n`.
pub fn strip_terminator(line: &str) -> &str {
    match line.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => line,
    }
}

/// A decoded JSON-RPC-like message.
///
/// `raw` is the original line (trimmed of surrounding whitespace and the line
/// terminator) and is what gets forwarded whenever the message is not mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// `method` field, when present and a string.
    pub method: Option<String>,
    /// `id` field, when present and a valid JSON-RPC id.
    pub id: Option<JsonRpcId>,
    /// `params` field, when present.
    pub params: Option<Value>,
    /// The full decoded object.
    pub body: Map<String, Value>,
    /// Original text of the line.
    pub raw: String,
}

impl Message {
    /// Decode a JSON object from text.
    pub fn decode(text: &str) -> Result<Message, DecodeError> {
        let value: Value = serde_json::from_str(text).map_err(|e| DecodeError::NotJson {
            reason: e.to_string(),
        })?;
        Message::from_value(value, text)
    }

    /// Build a message from an already-parsed value.
    pub fn from_value(value: Value, raw: impl Into<String>) -> Result<Message, DecodeError> {
        let Value::Object(body) = value else {
            return Err(DecodeError::NotObject);
        };
        let method = body
            .get("method")
            .and_then(|m| m.as_str())
            .map(String::from);
        let id = body
            .get("id")
            .and_then(|id| crate::jsonrpc::parse_id(id).ok());
        let params = body.get("params").cloned();
        Ok(Message {
            method,
            id,
            params,
            body,
            raw: raw.into(),
        })
    }

    /// JSON-RPC classification for audit logging.
    pub fn kind(&self) -> Result<JsonRpcMessageKind, JsonRpcClassifyError> {
        classify_jsonrpc(&Value::Object(self.body.clone()))
    }

    /// Label for logs: the method name, or the JSON-RPC kind for responses.
    pub fn label(&self) -> &str {
        match &self.method {
            Some(m) => m.as_str(),
            None if self.body.contains_key("result") || self.body.contains_key("error") => {
                "response"
            }
            None => "-",
        }
    }

    /// Extract the prompt carried by this message, if it is a prompt request.
    ///
    /// `prompt_methods` is the configured set of prompt method names.
    pub fn prompt(&self, prompt_methods: &[String]) -> Option<PromptRequest> {
        let method = self.method.as_deref()?;
        if !prompt_methods.iter().any(|m| m == method) {
            return None;
        }
        PromptRequest::extract(self.params.as_ref()?)
    }

    /// Copy of this message with `params` replaced; `raw` is re-serialized.
    pub fn with_params(&self, params: Value) -> Message {
        let mut body = self.body.clone();
        body.insert("params".to_string(), params.clone());
        let raw = serde_json::to_string(&body).unwrap_or_else(|_| self.raw.clone());
        Message {
            method: self.method.clone(),
            id: self.id.clone(),
            params: Some(params),
            body,
            raw,
        }
    }
}

/// Serialize a JSON value as one NDJSON line (with trailing newline).
pub fn to_line(value: &Value) -> String {
    let mut line = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_blank_is_none() {
        assert!(Frame::decode("").is_none());
        assert!(Frame::decode("   \t \r\n").is_none());
    }

    #[test]
    fn test_decode_message() {
        let line = r#"{"jsonrpc":"2.0","id":3,"method":"session/prompt","params":{"sessionId":"s"}}"#;
        let Some(Frame::Message(msg)) = Frame::decode(line) else {
            panic!("expected message");
        };
        assert_eq!(msg.method.as_deref(), Some("session/prompt"));
        assert_eq!(msg.id, Some(JsonRpcId::Number(3)));
        assert_eq!(msg.params, Some(json!({"sessionId": "s"})));
        assert_eq!(msg.raw, line);
    }

    #[test]
    fn test_decode_trims_line_terminator() {
        let Some(Frame::Message(msg)) = Frame::decode("{\"method\":\"x\"}\r\n") else {
            panic!("expected message");
        };
        assert_eq!(msg.raw, "{\"method\":\"x\"}");
    }

    #[test]
    fn test_decode_non_json_is_opaque() {
        let Some(Frame::Opaque { text, error }) = Frame::decode("Goose ACP agent started...")
        else {
            panic!("expected opaque");
        };
        assert_eq!(text, "Goose ACP agent started...");
        assert!(matches!(error, DecodeError::NotJson { .. }));
    }

    #[test]
    fn test_opaque_keeps_whitespace_and_drops_terminator() {
        for (line, expected) in [
            ("  indented chatter \t\n", "  indented chatter \t"),
            ("windows line\r\n", "windows line"),
            ("  no terminator  ", "  no terminator  "),
        ] {
            let Some(Frame::Opaque { text, .. }) = Frame::decode(line) else {
                panic!("expected opaque for {line:?}");
            };
            assert_eq!(text, expected);
        }
    }

    #[test]
    fn test_strip_terminator() {
        assert_eq!(strip_terminator("a\n"), "a");
        assert_eq!(strip_terminator("a\r\n"), "a");
        assert_eq!(strip_terminator("a\n\n"), "a\n");
        assert_eq!(strip_terminator("a\r"), "a\r");
    }

    #[test]
    fn test_decode_truncated_json_is_opaque() {
        assert!(matches!(
            Frame::decode(r#"{"jsonrpc":"2.0","id":1"#),
            Some(Frame::Opaque { .. })
        ));
    }

    #[test]
    fn test_decode_array_and_scalar_are_opaque() {
        for line in ["[1,2,3]", "42", "\"hello\"", "null"] {
            match Frame::decode(line) {
                Some(Frame::Opaque { error, .. }) => assert_eq!(error, DecodeError::NotObject),
                other => panic!("expected opaque for {line}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_invalid_id_is_dropped_not_fatal() {
        let msg = Message::decode(r#"{"jsonrpc":"2.0","id":1.5,"method":"m"}"#).unwrap();
        assert!(msg.id.is_none());
        assert!(msg.kind().is_err());
    }

    #[test]
    fn test_label() {
        let req = Message::decode(r#"{"method":"session/new","id":1}"#).unwrap();
        assert_eq!(req.label(), "session/new");
        let resp = Message::decode(r#"{"id":1,"result":{}}"#).unwrap();
        assert_eq!(resp.label(), "response");
        let other = Message::decode(r#"{"foo":1}"#).unwrap();
        assert_eq!(other.label(), "-");
    }

    #[test]
    fn test_prompt_requires_configured_method() {
        let msg = Message::decode(
            r#"{"jsonrpc":"2.0","id":1,"method":"session/prompt","params":{"prompt":{"text":"hi"}}}"#,
        )
        .unwrap();
        assert!(msg.prompt(&[SESSION_PROMPT.to_string()]).is_some());
        assert!(msg.prompt(&["other/method".to_string()]).is_none());
    }

    #[test]
    fn test_with_params_reserializes() {
        let msg = Message::decode(r#"{"jsonrpc":"2.0","id":1,"method":"m","params":{"a":1}}"#)
            .unwrap();
        let updated = msg.with_params(json!({"a": 2}));
        let reparsed: Value = serde_json::from_str(&updated.raw).unwrap();
        assert_eq!(reparsed["params"]["a"], 2);
        assert_eq!(reparsed["id"], 1);
        assert_eq!(reparsed["method"], "m");
    }

    #[test]
    fn test_to_line_terminates() {
        let line = to_line(&json!({"a": 1}));
        assert_eq!(line, "{\"a\":1}\n");
    }
}
