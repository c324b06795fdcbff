//! Operator configuration: schema, defaults, loading and validation.

pub mod defaults;
pub mod duration_format;
mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ValidationResult, ValidationWarning};
pub use loader::{
    default_config_paths, find_config_file, load_and_validate, load_config, load_effective,
    resolve_policy_root, substitute_env_vars, validate,
};
pub use schema::{Config, DownstreamConfig, Keywords, PolicyConfig, Rule, RuleAction};
