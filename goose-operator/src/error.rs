//! Error types for the stdio relay and the CLI drivers.
//!
//! `FramingError` covers line reading failures: size limits and IO.
//! Undecodable lines are not errors; they become opaque frames.
//!
//! `OperatorError` covers everything that can end a run: configuration,
//! downstream spawn failures, and unrecoverable IO on either stream.

use goose_operator_core::StreamDirection;
use goose_operator_core::config::ConfigError;

/// Errors that can occur while reading one NDJSON line.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// A single line exceeds the configured maximum size.
    ///
    /// The offending line has already been drained; the reader is positioned
    /// at the start of the next line.
    #[error("Message exceeds maximum size of {max_bytes} bytes")]
    MessageTooLarge {
        /// The configured maximum message size in bytes.
        max_bytes: usize,
    },

    /// An underlying IO error occurred while reading.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Operator Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that terminate a proxy or one-shot run.
#[derive(Debug, thiserror::Error)]
pub enum OperatorError {
    /// The agent executable is not on `PATH`.
    #[error("downstream agent '{command}' not found on PATH")]
    DownstreamNotFound {
        /// The command that was looked up.
        command: String,
    },

    /// The agent process could not be started.
    #[error("failed to start downstream agent '{command}': {reason}")]
    DownstreamSpawn {
        /// The resolved command.
        command: String,
        /// Human-readable description of the spawn failure.
        reason: String,
    },

    /// Unrecoverable framing error on one of the streams.
    #[error("Framing error on {direction} stream: {source}")]
    Framing {
        /// Which direction the error occurred on.
        direction: StreamDirection,
        /// The underlying framing error.
        source: FramingError,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An underlying IO error occurred.
    #[error("IO error: {0}")]
    Io(std::io::Error),
}

impl OperatorError {
    /// Wrap an IO error as a framing error on `direction`.
    pub(crate) fn io(direction: StreamDirection, e: std::io::Error) -> Self {
        OperatorError::Framing {
            direction,
            source: FramingError::Io(e),
        }
    }
}
