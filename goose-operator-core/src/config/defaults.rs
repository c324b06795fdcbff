//! Centralized default values for goose-operator configuration.

use std::time::Duration;

/// Agent executable, resolved through `PATH`.
pub const DEFAULT_COMMAND: &str = "goose";

/// Arguments for the long-lived streaming agent.
pub const DEFAULT_STREAM_ARGS: &[&str] = &["acp"];

/// Arguments for a one-shot run; the composed prompt is appended last.
pub const DEFAULT_ONESHOT_ARGS: &[&str] = &["run", "--text"];

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "GOOSE_OPERATOR_CONFIG";

/// Environment variable overriding the policy directory.
pub const POLICY_DIR_ENV: &str = "GOOSE_OPERATOR_POLICY_DIR";

/// Delimiter placed between the user's prompt and an injected policy.
pub const DEFAULT_POLICY_HEADER: &str = "\n\nIMPORTANT: You are being governed by the following policy.\nYou MUST adhere to these rules:\n";

/// Keywords and policy of the built-in rule used when no config file exists.
pub const BUILTIN_RULE_KEYWORDS: &[&str] = &["fortune", "zelda"];
pub const BUILTIN_RULE_POLICY: &str = "zelda-quality-control";

/// Timing defaults for the downstream process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorDefaults {
    /// Time the agent gets to exit on its own after its stdin closes.
    pub stdin_close_grace: Duration,
    /// Time between SIGTERM and a forced kill.
    pub sigterm_grace: Duration,
}

impl Default for OperatorDefaults {
    fn default() -> Self {
        Self {
            stdin_close_grace: Duration::from_millis(500),
            sigterm_grace: Duration::from_secs(2),
        }
    }
}
