//! Prompt extraction and in-place rewriting.

use serde_json::Value;

/// Where the prompt text lives inside `params.prompt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptShape {
    /// `"prompt": {"text": "..."}`
    TextObject,
    /// `"prompt": [{"type": "text", "text": "..."}, ...]`; the index is the
    /// last text block, which receives any appended policy.
    ContentBlocks { last_text: usize },
    /// `"prompt": "..."`
    Plain,
}

/// Logical view of a user prompt carried by a prompt-method message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    /// `params.sessionId`, when the protocol variant carries one.
    pub session_id: Option<String>,
    /// Prompt text as the classifier sees it.
    pub prompt_text: String,
    pub shape: PromptShape,
}

impl PromptRequest {
    /// Extract a prompt from a message's `params`.
    ///
    /// Returns `None` when `params` does not have a recognised prompt shape;
    /// callers treat that as "nothing to classify".
    pub fn extract(params: &Value) -> Option<PromptRequest> {
        let session_id = params
            .get("sessionId")
            .and_then(|s| s.as_str())
            .map(String::from);

        let (prompt_text, shape) = match params.get("prompt")? {
            Value::String(text) => (text.clone(), PromptShape::Plain),
            Value::Object(obj) => {
                let text = obj.get("text")?.as_str()?;
                (text.to_string(), PromptShape::TextObject)
            }
            Value::Array(blocks) => {
                let texts: Vec<(usize, &str)> = blocks
                    .iter()
                    .enumerate()
                    .filter(|(_, b)| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                    .filter_map(|(i, b)| b.get("text").and_then(|t| t.as_str()).map(|t| (i, t)))
                    .collect();
                let (last_text, _) = *texts.last()?;
                let joined = texts
                    .iter()
                    .map(|(_, t)| *t)
                    .collect::<Vec<_>>()
                    .join("\n");
                (joined, PromptShape::ContentBlocks { last_text })
            }
            _ => return None,
        };

        Some(PromptRequest {
            session_id,
            prompt_text,
            shape,
        })
    }

    /// Append `suffix` to the prompt text inside `params`.
    ///
    /// After this call, re-extracting the prompt yields
    /// `prompt_text + suffix`. Returns `false` if `params` no longer matches
    /// the recorded shape.
    pub fn append_to(&self, params: &mut Value, suffix: &str) -> bool {
        let Some(prompt) = params.get_mut("prompt") else {
            return false;
        };
        let slot = match (&self.shape, prompt) {
            (PromptShape::Plain, slot @ Value::String(_)) => slot,
            (PromptShape::TextObject, Value::Object(obj)) => match obj.get_mut("text") {
                Some(slot) => slot,
                None => return false,
            },
            (PromptShape::ContentBlocks { last_text }, Value::Array(blocks)) => {
                match blocks.get_mut(*last_text).and_then(|b| b.get_mut("text")) {
                    Some(slot) => slot,
                    None => return false,
                }
            }
            _ => return false,
        };
        let Some(current) = slot.as_str() else {
            return false;
        };
        let updated = format!("{current}{suffix}");
        *slot = Value::String(updated);
        true
    }
}
