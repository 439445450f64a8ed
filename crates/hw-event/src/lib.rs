//! # hw-event
//!
//! The intercepted-operation event model for hookwarden.
//!
//! The host (an AI coding assistant) emits one payload per file-mutating
//! operation. [`intake::normalize`] validates that payload and shapes it into
//! an immutable [`Event`], or rejects it with a [`MalformedEventError`].
//!
//! ## Key invariants
//!
//! - **Immutable**: an `Event` has no setters; hooks see exactly what the
//!   host sent.
//! - **No filesystem access**: `file_path` is a string, never resolved.
//! - **Malformed input is an error value**, not a panic. The pipeline turns
//!   it into an `allow` result (fail-open).

pub mod error;
pub mod event;
pub mod intake;

pub use error::MalformedEventError;
pub use event::{Event, Phase};
pub use intake::normalize;
