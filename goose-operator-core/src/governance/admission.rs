//! Admission engine: classify a prompt, then allow, mutate or block it.
//!
//! The engine is shared by the streaming relay and the one-shot runner. It
//! holds no per-session state; every call is evaluated on its own.
//!
//! ```text
//! Received ──► Classified ──┬─► Allowed ──► Forwarded
//!                           ├─► Mutated ──► Forwarded (rewritten)
//!                           └─► Blocked ──► Suppressed (+ notice to client)
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::classifier::{IntentClassifier, Outcome};
use crate::config::Config;
use crate::config::defaults::DEFAULT_POLICY_HEADER;
use crate::policy::PolicyStore;
use crate::protocol::{Frame, Message, PromptRequest, refusal_response, session_update};

/// Admission verdict for one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Forward the prompt unchanged.
    Allow(String),
    /// Forward `text` (the original prompt, the delimiter, then the policy).
    Mutate { text: String, policy_id: String },
    /// Do not forward; show `notification` to the user instead.
    Block { notification: String },
}

impl Verdict {
    /// Label for audit logs.
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Allow(_) => "allow",
            Verdict::Mutate { .. } => "mutate",
            Verdict::Block { .. } => "block",
        }
    }
}

/// Everything a driver needs to act on one admitted frame.
#[derive(Debug, Clone)]
pub struct Admission {
    pub verdict: Verdict,
    /// Line to write downstream (without terminator). `None` on block.
    pub forward: Option<String>,
    /// Messages to send back to the client, in order.
    pub replies: Vec<Value>,
}

impl Admission {
    fn passthrough(raw: &str) -> Self {
        Self {
            verdict: Verdict::Allow(raw.to_string()),
            forward: Some(raw.to_string()),
            replies: Vec::new(),
        }
    }
}

/// Prompt admission controller.
pub struct AdmissionEngine {
    classifier: IntentClassifier,
    store: Arc<dyn PolicyStore>,
    prompt_methods: Vec<String>,
    header: String,
}

impl AdmissionEngine {
    pub fn new(
        classifier: IntentClassifier,
        store: Arc<dyn PolicyStore>,
        prompt_methods: Vec<String>,
        header: Option<String>,
    ) -> Self {
        Self {
            classifier,
            store,
            prompt_methods,
            header: header.unwrap_or_else(|| DEFAULT_POLICY_HEADER.to_string()),
        }
    }

    /// Build an engine from a validated configuration.
    pub fn from_config(config: &Config, store: Arc<dyn PolicyStore>) -> Self {
        Self::new(
            IntentClassifier::from_rules(&config.rules),
            store,
            config.prompt_methods.clone(),
            config.policies.header.clone(),
        )
    }

    /// Delimiter placed between the prompt and an appended policy.
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Methods whose params carry a prompt.
    pub fn prompt_methods(&self) -> &[String] {
        &self.prompt_methods
    }

    /// Decide on bare prompt text.
    pub fn evaluate_text(&self, prompt_text: &str) -> Verdict {
        self.decide(prompt_text, None, "-")
    }

    /// Admit one decoded frame from the client.
    ///
    /// Opaque lines and non-prompt messages pass through verbatim.
    pub fn admit_frame(&self, frame: &Frame) -> Admission {
        match frame {
            Frame::Message(message) => self.admit(message),
            Frame::Opaque { text, .. } => Admission::passthrough(text),
        }
    }

    /// Admit one decoded message from the client.
    pub fn admit(&self, message: &Message) -> Admission {
        let Some(prompt) = message.prompt(&self.prompt_methods) else {
            return Admission::passthrough(&message.raw);
        };
        let session_id = prompt.session_id.as_deref();
        let verdict = self.decide(&prompt.prompt_text, session_id, message.label());

        match &verdict {
            Verdict::Allow(_) => Admission {
                verdict,
                forward: Some(message.raw.clone()),
                replies: Vec::new(),
            },
            Verdict::Mutate { text, policy_id } => {
                let Some(rewritten) = rewrite(message, &prompt, text) else {
                    warn!(
                        component = "admission",
                        method = %message.label(),
                        policy_id = %policy_id,
                        "prompt shape changed during rewrite, forwarding unmodified"
                    );
                    return Admission::passthrough(&message.raw);
                };
                let notice = format!(
                    "✨ **Admission Controller**: Mutated prompt with `{policy_id}` policy."
                );
                Admission {
                    replies: vec![session_update(session_id, &notice)],
                    forward: Some(rewritten.raw),
                    verdict,
                }
            }
            Verdict::Block { notification } => {
                let mut replies = vec![session_update(session_id, notification)];
                if let Some(id) = &message.id {
                    replies.push(refusal_response(id));
                }
                Admission {
                    replies,
                    forward: None,
                    verdict,
                }
            }
        }
    }

    fn decide(&self, prompt_text: &str, session_id: Option<&str>, method: &str) -> Verdict {
        let classification = self.classifier.classify(prompt_text);
        let rule = classification
            .rule_index
            .map(|i| i.to_string())
            .unwrap_or_else(|| "-".to_string());
        let outcome = classification.outcome.label();

        let (verdict, policy_id) = match classification.outcome {
            Outcome::NoPolicy => (Verdict::Allow(prompt_text.to_string()), None),
            Outcome::ApplyPolicy(policy_id) => match self.store.load(&policy_id) {
                Ok(policy) => {
                    debug!(policy_id = %policy_id, bytes = policy.len(), "policy loaded");
                    let text = format!("{prompt_text}{}{policy}", self.header);
                    (Verdict::Mutate { text, policy_id: policy_id.clone() }, Some(policy_id))
                }
                Err(e) => {
                    warn!(
                        component = "admission",
                        policy_id = %policy_id,
                        error = %e,
                        "policy unavailable, forwarding prompt unmodified"
                    );
                    (Verdict::Allow(prompt_text.to_string()), Some(policy_id))
                }
            },
            Outcome::Block { reason } => (
                Verdict::Block {
                    notification: format!("🛑 **Admission Controller**: Blocked request: {reason}"),
                },
                None,
            ),
        };

        info!(
            component = "admission",
            method = %method,
            session_id = session_id.unwrap_or("-"),
            rule = %rule,
            matched = classification.matched.as_deref().unwrap_or("-"),
            outcome = outcome,
            policy_id = policy_id.as_deref().unwrap_or("-"),
            verdict = verdict.label(),
            "admission audit"
        );

        verdict
    }
}

/// Rebuild `message` with its prompt replaced by `text`.
fn rewrite(message: &Message, prompt: &PromptRequest, text: &str) -> Option<Message> {
    let suffix = text.strip_prefix(prompt.prompt_text.as_str())?;
    let mut params = message.params.clone()?;
    if !prompt.append_to(&mut params, suffix) {
        return None;
    }
    Some(message.with_params(params))
}
