//! Configuration loading and validation.
//!
//! Search order: explicit path, `$GOOSE_OPERATOR_CONFIG`, the per-user config
//! directory, then the built-in defaults.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use tracing::{info, warn};

use super::defaults::{CONFIG_ENV, POLICY_DIR_ENV};
use super::error::{ConfigError, ValidationResult, ValidationWarning};
use super::schema::{Config, RuleAction};
use crate::policy::loader::executable_dir;
use crate::policy::validate_policy_id;

/// Configuration file search paths (in priority order), excluding an
/// explicit CLI path.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        paths.push(PathBuf::from(path));
    }

    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("goose-operator").join("config.yaml"));
    }

    paths
}

/// Find the configuration file to use.
///
/// An explicit path must exist. Otherwise the first existing default path is
/// returned, or `None` when there is none.
pub fn find_config_file(explicit_path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(ConfigError::ConfigFileNotFound {
            searched: vec![path.to_path_buf()],
        });
    }

    Ok(default_config_paths().into_iter().find(|p| p.exists()))
}

/// Load configuration from a file path.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;

    if contents.trim().is_empty() {
        return Err(ConfigError::EmptyConfigFile);
    }

    let contents = substitute_env_vars(&contents)?;

    let mut config: Config = serde_saphyr::from_str(&contents)?;
    config.source_path = Some(std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()));

    Ok(config)
}

/// Load and validate configuration from a file.
pub fn load_and_validate(path: &Path) -> Result<(Config, ValidationResult), ConfigError> {
    let config = load_config(path)?;
    let result = validate(&config)?;
    Ok((config, result))
}

/// Resolve, load and validate the effective configuration.
///
/// Falls back to [`Config::default`] when no file is found and none was
/// requested explicitly.
pub fn load_effective(explicit_path: Option<&Path>) -> Result<(Config, ValidationResult), ConfigError> {
    match find_config_file(explicit_path)? {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            let (config, result) = load_and_validate(&path)?;
            for warning in &result.warnings {
                warn!(path = %path.display(), "config: {warning}");
            }
            Ok((config, result))
        }
        None => {
            warn!("no configuration file found, using built-in rule table");
            let config = Config::default();
            let result = validate(&config)?;
            Ok((config, result))
        }
    }
}

/// Resolve the absolute policy directory for a configuration.
///
/// Priority: `$GOOSE_OPERATOR_POLICY_DIR`, `policies.root` (relative to the
/// config file's directory), then `policies/` next to the executable's
/// parent directory. Never relative to the current working directory.
pub fn resolve_policy_root(config: &Config) -> PathBuf {
    if let Ok(dir) = std::env::var(POLICY_DIR_ENV) {
        if !dir.trim().is_empty() {
            return absolutize(PathBuf::from(dir), &executable_dir());
        }
    }

    let config_dir = config
        .source_path
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf);

    match (&config.policies.root, config_dir) {
        (Some(root), Some(base)) => absolutize(root.clone(), &base),
        (Some(root), None) => absolutize(root.clone(), &executable_dir()),
        (None, Some(base)) => base.join("policies"),
        (None, None) => {
            let exe_dir = executable_dir();
            exe_dir
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or(exe_dir)
                .join("policies")
        }
    }
}

fn absolutize(path: PathBuf, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Environment Variable Substitution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

// SAFETY: .expect() on a compile-time literal pattern, covered by
// test_env_var_pattern_compiles().
static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .expect("BUG: ENV_VAR_PATTERN regex is invalid")
});

/// Substitute environment variables in a string.
///
/// - `${VAR}` - required, fails if not set
/// - `${VAR:-default}` - optional with default
pub fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut missing = None;
    let result = ENV_VAR_PATTERN.replace_all(content, |cap: &regex::Captures<'_>| {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(value) => value,
            Err(_) => match cap.get(2) {
                Some(default) => default.as_str().to_string(),
                None => {
                    missing.get_or_insert_with(|| var_name.to_string());
                    String::new()
                }
            },
        }
    });

    if let Some(var) = missing {
        return Err(ConfigError::MissingEnvVar {
            var,
            field: "configuration".to_string(),
        });
    }

    Ok(result.into_owned())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Validate a configuration.
pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
    let mut warnings = Vec::new();

    if config.schema != 1 {
        return Err(ConfigError::UnsupportedSchemaVersion {
            version: config.schema,
        });
    }

    if config.downstream.command.trim().is_empty() {
        return Err(ConfigError::EmptyDownstreamCommand);
    }

    if config.prompt_methods.is_empty() {
        return Err(ConfigError::NoPromptMethods);
    }

    for (index, rule) in config.rules.iter().enumerate() {
        if rule.keywords.is_empty() || rule.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::EmptyKeyword { index });
        }

        match rule.action {
            RuleAction::Policy => {
                let Some(policy) = rule.policy.as_deref() else {
                    return Err(ConfigError::MissingPolicyId {
                        index,
                        rule: rule.label(),
                    });
                };
                if validate_policy_id(policy).is_err() {
                    return Err(ConfigError::InvalidPolicyId {
                        index,
                        policy: policy.to_string(),
                    });
                }
            }
            RuleAction::Block => {
                if rule.policy.is_some() {
                    warnings.push(ValidationWarning::PolicyOnBlockRule { index });
                }
            }
        }
    }

    // A later rule is dead when each of its keywords contains some keyword of
    // a single earlier rule.
    for (index, rule) in config.rules.iter().enumerate() {
        let shadowing = config.rules[..index].iter().position(|earlier| {
            rule.keywords.iter().all(|k| {
                let k = k.to_lowercase();
                earlier
                    .keywords
                    .iter()
                    .any(|e| k.contains(&e.to_lowercase()))
            })
        });
        if let Some(by) = shadowing {
            warnings.push(ValidationWarning::ShadowedRule { index, by });
        }
    }

    if warnings.is_empty() {
        Ok(ValidationResult::ok())
    } else {
        Ok(ValidationResult::with_warnings(warnings))
    }
}
