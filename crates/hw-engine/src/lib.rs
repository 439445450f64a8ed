//! # hw-engine
//!
//! Hook orchestration for hookwarden: registry, pattern cache, fail-open
//! runner, tiered scheduler, and verdict aggregation.
//!
//! A host hands every file-mutating operation to a [`HookPipeline`] and
//! gets back one [`PipelineResult`] (allow, blocked, warning, or modified).
//! What each hook checks is opaque to the engine: it only sees the
//! [`HookEvaluator`] contract.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hw_engine::{
//!     FnHook, HookDescriptor, HookOutcome, HookPipeline, HookRegistry, PhaseFilter,
//!     PipelineConfig, PriorityTier, RegisteredHook,
//! };
//! use hw_event::{Event, Phase};
//!
//! # async fn demo() {
//! let registry = Arc::new(HookRegistry::new());
//! let descriptor =
//!     HookDescriptor::new("no-env", PhaseFilter::Pre, "glob:**/.env", PriorityTier::Critical, 2_000)
//!         .unwrap();
//! registry
//!     .register(RegisteredHook::new(
//!         descriptor,
//!         Arc::new(FnHook::new(|_: Event| async { Ok(HookOutcome::block("no .env writes")) })),
//!     ))
//!     .unwrap();
//!
//! let pipeline = HookPipeline::new(registry, PipelineConfig::default());
//! let result = pipeline
//!     .process(Event::new(Phase::Pre, "write").with_file_path("app/.env"))
//!     .await;
//! assert!(result.is_blocked());
//! # }
//! ```
//!
//! ## Key invariants
//!
//! - **Fail-open**: a hook that errors, panics, or times out produces an
//!   `error` verdict, which never blocks.
//! - **Atomic reload**: every run works on one immutable registry snapshot.
//! - **Deterministic order**: verdicts and modifications follow priority
//!   tier, then registration order, regardless of completion order.
//! - **Background is advisory**: background verdicts reach the sink only.

pub mod aggregator;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod hook;
pub mod manifest;
pub mod matcher;
pub mod pattern_cache;
pub mod pipeline;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod sink;
pub mod verdict;

pub use aggregator::{aggregate, Aggregate, PipelineStatus};
pub use config::{AuditConfig, EngineConfig, PipelineConfig, ProjectLayout};
pub use descriptor::{HookDescriptor, PhaseFilter, PriorityTier};
pub use error::{ConfigError, EvaluationError, HookFault, PatternError, RegistryError, SinkError};
pub use hook::{FnHook, HookEvaluator, HookOutcome, RegisteredHook};
pub use manifest::{EvaluatorFactory, HookManifest, ManifestEntry};
pub use matcher::HookMatcher;
pub use pattern_cache::{CompiledPattern, PatternCache};
pub use pipeline::{HookPipeline, HostResponse, PipelineResult, PipelineRun};
pub use registry::{HookRegistry, RegistrySnapshot};
pub use runner::run_hook;
pub use scheduler::{BackgroundTasks, ScheduleOutcome, Scheduler};
pub use sink::{CountingSink, Disposition, MemorySink, SinkSet, TracingSink, VerdictRecord, VerdictSink};
pub use verdict::{Verdict, VerdictKind};
