// error.rs — Error types for the hook engine.
//
// Two very different families live here:
//
// - Configuration errors (RegistryError, ConfigError, PatternError) are
//   fatal to whoever loads the registry or config. They are returned.
// - HookFault is per-hook and never leaves the runner: it is collapsed
//   into a Verdict of kind `error` (fail-open).

use std::path::PathBuf;

use thiserror::Error;

/// Configuration-time failures of the hook registry and manifest.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two hooks share an id. The registry refuses the whole change.
    #[error("duplicate hook id '{id}'")]
    DuplicateHook { id: String },

    /// A descriptor failed validation (empty id, zero timeout, bad matcher, ...).
    #[error("invalid descriptor for hook '{id}': {reason}")]
    InvalidDescriptor { id: String, reason: String },

    /// An operation named a hook that is not registered.
    #[error("unknown hook '{id}'")]
    UnknownHook { id: String },

    /// The manifest file could not be read.
    #[error("failed to read manifest at {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The manifest file could not be parsed.
    #[error("failed to parse manifest at {path}: {reason}")]
    ManifestParse { path: String, reason: String },
}

impl RegistryError {
    pub(crate) fn invalid(id: impl Into<String>, reason: impl Into<String>) -> Self {
        RegistryError::InvalidDescriptor {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// A pattern could not be compiled.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("invalid regex '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("invalid glob '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },
}

/// Errors an evaluator reports back to the runner.
///
/// Evaluators are opaque to the engine; whatever goes wrong inside them is
/// expressed through these variants and ends up as a `HookFault::Execution`.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("{reason}")]
    Failed { reason: String },

    #[error("invalid hook response: {reason}")]
    InvalidResponse { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),
}

impl EvaluationError {
    pub fn failed(reason: impl Into<String>) -> Self {
        EvaluationError::Failed {
            reason: reason.into(),
        }
    }
}

/// A per-hook failure. Never propagated past the runner.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HookFault {
    /// The hook did not produce a result within its timeout.
    #[error("hook {hook_id} timed out")]
    Timeout { hook_id: String, timeout_ms: u64 },

    /// The hook returned an error or panicked.
    #[error("hook {hook_id} failed: {reason}")]
    Execution { hook_id: String, reason: String },

    /// The hook was still pending when the pipeline deadline passed.
    #[error("hook {hook_id} did not finish before the pipeline deadline")]
    PipelineDeadline { hook_id: String },
}

/// Engine configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// An observability sink failed to record a verdict. Logged, never fatal.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink '{sink}' failed: {reason}")]
    Failed { sink: String, reason: String },

    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),
}
