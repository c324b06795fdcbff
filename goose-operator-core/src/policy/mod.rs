//! Governance policy documents.
//!
//! A policy document is opaque text identified by a stable key (the file stem).
//! The admission engine asks a [`PolicyStore`] for it each time a rule selects
//! it; nothing is cached, so edits on disk take effect on the next prompt.

pub mod loader;

pub use loader::FsPolicyStore;

use thiserror::Error;

/// Errors returned by a [`PolicyStore`].
///
/// None of these are fatal to the proxy: the admission engine degrades to an
/// unmodified passthrough and logs a warning.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// No document exists for the key.
    #[error("policy '{id}' not found at {path}")]
    NotFound { id: String, path: String },

    /// The key would resolve outside the policy root, or is empty.
    #[error("invalid policy id '{id}'")]
    InvalidId { id: String },

    /// The document exists but could not be read.
    #[error("failed to read policy '{id}' from {path}: {reason}")]
    Unreadable {
        id: String,
        path: String,
        reason: String,
    },
}

/// Lookup of policy text by key.
///
/// Implementations must be safe to call concurrently from several tasks and
/// must not block distinct-key lookups on each other.
pub trait PolicyStore: Send + Sync {
    /// Return the full text of the policy identified by `id`.
    fn load(&self, id: &str) -> Result<String, PolicyError>;
}

/// Check that a policy key is a bare file stem.
///
/// Keys are joined onto the policy root, so anything that could walk out of
/// it (separators, `..`, NUL) is rejected.
pub fn validate_policy_id(id: &str) -> Result<(), PolicyError> {
    let bad = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\', '\0'])
        || id.starts_with('.');
    if bad {
        return Err(PolicyError::InvalidId { id: id.to_string() });
    }
    Ok(())
}
