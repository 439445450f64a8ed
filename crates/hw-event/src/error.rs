// error.rs — Error types for event intake.
//
// Every variant describes one way a host payload can fail validation.
// None of them is ever surfaced to the host as a block.

use thiserror::Error;

/// Reasons an inbound payload could not be shaped into an [`crate::Event`].
#[derive(Debug, Error)]
pub enum MalformedEventError {
    /// The payload bytes were not valid UTF-8.
    #[error("malformed event: payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The payload text was not valid JSON.
    #[error("malformed event: invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The payload was JSON, but not an object.
    #[error("malformed event: payload must be a JSON object")]
    NotAnObject,

    /// A required field is missing (or null).
    #[error("malformed event: missing field '{field}'")]
    MissingField { field: &'static str },

    /// A field is present but is not a string.
    #[error("malformed event: field '{field}' must be a string")]
    NotAString { field: &'static str },

    /// The phase is not one of the two known values.
    #[error("malformed event: unknown phase '{value}' (expected \"pre\" or \"post\")")]
    UnknownPhase { value: String },

    /// The tool name is an empty (or whitespace-only) string.
    #[error("malformed event: field 'toolName' must not be empty")]
    EmptyToolName,
}
