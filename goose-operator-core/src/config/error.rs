//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation errors.
///
/// All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    // ─────────────────────────────────────────────────────────────────────────
    // Rule validation errors
    // ─────────────────────────────────────────────────────────────────────────
    /// `action: policy` without a `policy` id.
    #[error("rule #{index} ('{rule}') has action: policy but no policy id")]
    MissingPolicyId { index: usize, rule: String },

    /// A rule with no keywords, or with an empty keyword.
    #[error("rule #{index} has an empty match keyword")]
    EmptyKeyword { index: usize },

    /// A policy id that could escape the policy root.
    #[error("rule #{index} names invalid policy id '{policy}'")]
    InvalidPolicyId { index: usize, policy: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Value validation errors
    // ─────────────────────────────────────────────────────────────────────────
    /// `downstream.command` is blank.
    #[error("downstream.command must not be empty")]
    EmptyDownstreamCommand,

    /// `prompt_methods` is empty, so nothing would ever be classified.
    #[error("prompt_methods must name at least one method")]
    NoPromptMethods,

    /// Required environment variable not set.
    #[error("environment variable '{var}' not set (required for field '{field}')")]
    MissingEnvVar { var: String, field: String },

    /// Schema version not supported.
    #[error("unsupported schema version {version}, expected 1")]
    UnsupportedSchemaVersion { version: u32 },

    // ─────────────────────────────────────────────────────────────────────────
    // I/O and parsing errors
    // ─────────────────────────────────────────────────────────────────────────
    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    ParseError(#[from] serde_saphyr::Error),

    /// I/O error reading config file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Explicitly requested config file does not exist.
    #[error("configuration file not found (searched: {searched:?})")]
    ConfigFileNotFound { searched: Vec<PathBuf> },

    /// Empty configuration file.
    #[error("configuration file is empty")]
    EmptyConfigFile,
}

/// Validation warnings (non-fatal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// `policy` given on a block rule; it is ignored.
    PolicyOnBlockRule { index: usize },

    /// Every keyword of this rule contains a keyword of an earlier rule, so
    /// the earlier rule always wins and this one can never match.
    ShadowedRule { index: usize, by: usize },
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PolicyOnBlockRule { index } => {
                write!(f, "rule #{index} has a policy id but action is 'block'")
            }
            Self::ShadowedRule { index, by } => {
                write!(f, "rule #{index} is unreachable: rule #{by} always matches first")
            }
        }
    }
}

/// Result of configuration validation.
#[derive(Debug)]
pub struct ValidationResult {
    /// Non-fatal warnings encountered during validation.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(warnings: Vec<ValidationWarning>) -> Self {
        Self { warnings }
    }

    /// Check if validation passed with no warnings.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
