// error.rs — Error types for building built-in evaluators.
//
// These are configuration-time errors: a handler block in the manifest
// that cannot become an evaluator. The factory maps them to
// RegistryError::InvalidDescriptor so the whole manifest load fails.

use hw_engine::PatternError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvaluatorError {
    /// The `handler` block did not match any known handler shape.
    #[error("invalid handler: {reason}")]
    InvalidHandler { reason: String },

    /// A rule's pattern does not compile.
    #[error("rule '{rule_id}': {source}")]
    InvalidPattern {
        rule_id: String,
        #[source]
        source: PatternError,
    },

    /// A rule is internally inconsistent (e.g. `replace` without a replacement).
    #[error("rule '{rule_id}': {reason}")]
    InvalidRule { rule_id: String, reason: String },
}
