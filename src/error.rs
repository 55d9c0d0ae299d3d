//! Error types for the analyzer.
//!
//! One enum per boundary, `thiserror` only. `AnalyzerError` is what callers of
//! the library see; `ComputationError` never leaves the scoring module.

use std::path::PathBuf;

/// Errors surfaced by preprocessing, training, scoring and persistence.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// Malformed, empty or length-mismatched session input.
    #[error("invalid session: {0}")]
    Validation(String),

    /// A model or baseline is required but none is active.
    #[error("not initialized: {0}")]
    NotInitialized(&'static str),

    /// No training session produced a usable sequence.
    #[error("no usable session in training set")]
    EmptyTrainingSet,

    /// An analysis call exceeded its deadline.
    #[error("analysis timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The analysis worker stopped before sending a result.
    #[error("analysis worker failed: {0}")]
    Worker(String),
}

/// Checkpoint and configuration file failures.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed checkpoint: {0}")]
    Format(#[from] serde_json::Error),

    #[error("unsupported checkpoint version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Numeric failure inside a single accuracy sub-score.
///
/// Always recovered locally by substituting the neutral score.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComputationError {
    #[error("not enough samples")]
    EmptyInput,

    #[error("non-finite intermediate value")]
    NonFinite,
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
