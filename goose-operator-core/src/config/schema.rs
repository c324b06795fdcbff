//! Configuration schema type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::{
    BUILTIN_RULE_KEYWORDS, BUILTIN_RULE_POLICY, DEFAULT_COMMAND, DEFAULT_ONESHOT_ARGS,
    DEFAULT_STREAM_ARGS, OperatorDefaults,
};
use super::duration_format;
use crate::policy::loader::DEFAULT_POLICY_SUFFIX;
use crate::protocol::SESSION_PROMPT;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-Level Schema
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Root configuration structure.
///
/// # Example
/// ```yaml
/// schema: 1
///
/// downstream:
///   command: goose
///   args: [acp]
///
/// policies:
///   root: ./policies
///
/// rules:
///   - match: [fortune, zelda]
///     policy: zelda-quality-control
///   - match: "rm -rf /"
///     action: block
///     reason: destructive filesystem command
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Schema version (must be 1).
    pub schema: u32,

    /// How to launch the agent.
    #[serde(default)]
    pub downstream: DownstreamConfig,

    /// Where policy documents live.
    #[serde(default)]
    pub policies: PolicyConfig,

    /// JSON-RPC methods whose params carry a user prompt.
    #[serde(default = "default_prompt_methods")]
    pub prompt_methods: Vec<String>,

    /// Ordered classification rules (first match wins).
    #[serde(default)]
    pub rules: Vec<Rule>,

    /// File this configuration was read from, if any.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Default for Config {
    /// Built-in configuration used when no file is found.
    fn default() -> Self {
        Self {
            schema: 1,
            downstream: DownstreamConfig::default(),
            policies: PolicyConfig::default(),
            prompt_methods: default_prompt_methods(),
            rules: vec![Rule {
                keywords: Keywords::Multiple(
                    BUILTIN_RULE_KEYWORDS.iter().map(|s| s.to_string()).collect(),
                ),
                action: RuleAction::Policy,
                policy: Some(BUILTIN_RULE_POLICY.to_string()),
                reason: None,
                description: Some("built-in fortune/zelda quality control".to_string()),
            }],
            source_path: None,
        }
    }
}

fn default_prompt_methods() -> Vec<String> {
    vec![SESSION_PROMPT.to_string()]
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Downstream
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Agent invocation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownstreamConfig {
    /// Executable name or path; bare names are looked up on `PATH`.
    #[serde(default = "default_command")]
    pub command: String,

    /// Arguments for streaming mode.
    #[serde(default = "default_stream_args")]
    pub args: Vec<String>,

    /// Arguments for one-shot mode; the composed prompt is appended.
    #[serde(default = "default_oneshot_args")]
    pub oneshot_args: Vec<String>,

    /// Grace period after closing the agent's stdin.
    #[serde(
        default = "default_stdin_close_grace",
        with = "duration_format"
    )]
    pub stdin_close_grace: Duration,

    /// Grace period after SIGTERM before a forced kill.
    #[serde(default = "default_sigterm_grace", with = "duration_format")]
    pub sigterm_grace: Duration,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_stream_args(),
            oneshot_args: default_oneshot_args(),
            stdin_close_grace: default_stdin_close_grace(),
            sigterm_grace: default_sigterm_grace(),
        }
    }
}

fn default_command() -> String {
    DEFAULT_COMMAND.to_string()
}

fn default_stream_args() -> Vec<String> {
    DEFAULT_STREAM_ARGS.iter().map(|s| s.to_string()).collect()
}

fn default_oneshot_args() -> Vec<String> {
    DEFAULT_ONESHOT_ARGS.iter().map(|s| s.to_string()).collect()
}

fn default_stdin_close_grace() -> Duration {
    OperatorDefaults::default().stdin_close_grace
}

fn default_sigterm_grace() -> Duration {
    OperatorDefaults::default().sigterm_grace
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Policies
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Policy document location and injection format.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
    /// Policy directory. Relative paths are resolved against the config
    /// file's directory.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// File suffix appended to the policy id.
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Delimiter inserted between the prompt and the policy text.
    #[serde(default)]
    pub header: Option<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            root: None,
            suffix: default_suffix(),
            header: None,
        }
    }
}

fn default_suffix() -> String {
    DEFAULT_POLICY_SUFFIX.to_string()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Rules
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What a matching rule does.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Append the named policy to the prompt.
    #[default]
    Policy,
    /// Refuse the prompt without forwarding it.
    Block,
}

impl std::fmt::Display for RuleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleAction::Policy => write!(f, "policy"),
            RuleAction::Block => write!(f, "block"),
        }
    }
}

/// A classification rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Rule {
    /// Keyword(s); the rule matches when any one is a substring of the
    /// lowercased prompt.
    #[serde(rename = "match")]
    pub keywords: Keywords,

    /// Action to take when matched.
    #[serde(default)]
    pub action: RuleAction,

    /// Policy id (required if action: policy).
    #[serde(default)]
    pub policy: Option<String>,

    /// Reason shown to the user when blocking.
    #[serde(default)]
    pub reason: Option<String>,

    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
}

/// One keyword or a list of alternatives.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Keywords {
    Single(String),
    Multiple(Vec<String>),
}

impl Keywords {
    /// All keywords, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Keywords::Single(k) => std::slice::from_ref(k),
            Keywords::Multiple(ks) => ks,
        };
        slice.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl Rule {
    /// Short label used in logs and validation messages.
    pub fn label(&self) -> String {
        self.keywords.iter().collect::<Vec<_>>().join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_builtin_rule() {
        let config = Config::default();
        assert_eq!(config.schema, 1);
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].policy.as_deref(), Some("zelda-quality-control"));
        assert_eq!(config.rules[0].label(), "fortune|zelda");
        assert_eq!(config.prompt_methods, vec!["session/prompt".to_string()]);
        assert_eq!(config.downstream.command, "goose");
        assert_eq!(config.downstream.args, vec!["acp".to_string()]);
    }

    #[test]
    fn test_keywords_iter() {
        let single = Keywords::Single("a".into());
        assert_eq!(single.iter().collect::<Vec<_>>(), vec!["a"]);
        let multi = Keywords::Multiple(vec!["a".into(), "b".into()]);
        assert_eq!(multi.iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(Keywords::Multiple(vec![]).is_empty());
    }

    #[test]
    fn test_rule_action_display() {
        assert_eq!(RuleAction::Policy.to_string(), "policy");
        assert_eq!(RuleAction::Block.to_string(), "block");
    }
}
