//! # hw-audit
//!
//! Append-only verdict log for hookwarden.
//!
//! Every verdict a pipeline run produces can be recorded as an
//! [`AuditEntry`] in a JSONL file. Entries are chained by SHA-256 hash and
//! numbered contiguously, so [`VerdictLog::verify_chain`] detects edits,
//! insertions, and deletions.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hw_audit::AuditSink;
//! use hw_engine::{HookPipeline, HookRegistry, PipelineConfig};
//!
//! let sink = Arc::new(AuditSink::open(".hookwarden/verdicts.jsonl").unwrap());
//! let pipeline = HookPipeline::new(Arc::new(HookRegistry::new()), PipelineConfig::default())
//!     .with_sink(sink);
//! ```

pub mod entry;
pub mod error;
pub mod hasher;
pub mod log;
pub mod sink;

pub use entry::AuditEntry;
pub use error::AuditError;
pub use log::VerdictLog;
pub use sink::AuditSink;
