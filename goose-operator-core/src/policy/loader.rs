//! File-backed policy store.
//!
//! Documents live at `<root>/<id><suffix>`. The root is fixed at construction
//! and is always absolute, so lookups never depend on the process's current
//! working directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{PolicyError, PolicyStore, validate_policy_id};

/// Default file suffix for policy documents.
pub const DEFAULT_POLICY_SUFFIX: &str = ".yaml";

/// Reads policy documents from a directory on every call.
///
/// Holds no mutable state; concurrent calls are independent file reads.
#[derive(Debug, Clone)]
pub struct FsPolicyStore {
    root: PathBuf,
    suffix: String,
}

impl FsPolicyStore {
    /// Create a store rooted at `root`.
    ///
    /// A relative `root` is anchored to the directory of the running
    /// executable rather than the current working directory.
    pub fn new(root: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            executable_dir().join(root)
        };
        Self {
            root,
            suffix: suffix.into(),
        }
    }

    /// Directory the store reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a policy key resolves to (without checking it exists).
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}{}", self.suffix))
    }
}

impl PolicyStore for FsPolicyStore {
    fn load(&self, id: &str) -> Result<String, PolicyError> {
        validate_policy_id(id)?;
        let path = self.path_for(id);
        debug!(policy_id = id, path = %path.display(), "loading policy");
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PolicyError::NotFound {
                id: id.to_string(),
                path: path.display().to_string(),
            },
            _ => PolicyError::Unreadable {
                id: id.to_string(),
                path: path.display().to_string(),
                reason: e.to_string(),
            },
        })
    }
}

/// Directory containing the running executable, falling back to `/`.
pub(crate) fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| fs::canonicalize(&exe).ok().or(Some(exe)))
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("/"))
}
