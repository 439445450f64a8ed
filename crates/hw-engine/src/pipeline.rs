// pipeline.rs — One event in, one decision out.
//
// Intake → registry snapshot → scheduler → aggregator → PipelineResult.
//
// The pipeline takes one registry snapshot per run, so a reload that lands
// mid-run is only seen by the next run. A malformed event never reaches the
// scheduler: it becomes an `allow` result carrying the intake error.

use std::sync::Arc;
use std::time::Instant;

use hw_event::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::aggregator::{aggregate, PipelineStatus};
use crate::config::PipelineConfig;
use crate::registry::HookRegistry;
use crate::scheduler::{BackgroundTasks, Scheduler};
use crate::sink::{TracingSink, VerdictSink};
use crate::verdict::Verdict;

/// The aggregate decision for one event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub status: PipelineStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_content: Option<String>,
    /// Critical then high-tier verdicts, in registry order.
    pub per_hook: Vec<Verdict>,
    /// Intake error when the event was malformed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub background_hooks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discarded_hooks: Vec<String>,
    pub duration_ms: u64,
}

impl PipelineResult {
    fn malformed(run_id: Uuid, error: String, started: Instant) -> Self {
        Self {
            run_id,
            status: PipelineStatus::Allow,
            message: None,
            final_content: None,
            per_hook: Vec::new(),
            error: Some(error),
            background_hooks: Vec::new(),
            discarded_hooks: Vec::new(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.status == PipelineStatus::Blocked
    }

    /// The compact response sent back to the host.
    pub fn to_host_response(&self) -> HostResponse {
        HostResponse {
            status: self.status,
            message: self.message.clone(),
            final_content: if self.status == PipelineStatus::Modified {
                self.final_content.clone()
            } else {
                None
            },
        }
    }
}

/// Wire response to the host: `{ status, message?, finalContent? }`.
///
/// `finalContent` is only sent when the content actually changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostResponse {
    pub status: PipelineStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_content: Option<String>,
}

/// A finished run plus the detached work it left behind.
#[derive(Debug)]
pub struct PipelineRun {
    pub result: PipelineResult,
    pub background: BackgroundTasks,
}

/// The hook orchestration pipeline.
pub struct HookPipeline {
    registry: Arc<HookRegistry>,
    scheduler: Scheduler,
}

impl HookPipeline {
    /// Create a pipeline that reports verdicts through `tracing` only.
    pub fn new(registry: Arc<HookRegistry>, config: PipelineConfig) -> Self {
        Self {
            registry,
            scheduler: Scheduler::new(config, Arc::new(TracingSink)),
        }
    }

    /// Replace the verdict sink and return self (builder pattern).
    pub fn with_sink(self, sink: Arc<dyn VerdictSink>) -> Self {
        let config = self.scheduler.config().clone();
        Self {
            registry: self.registry,
            scheduler: Scheduler::new(config, sink),
        }
    }

    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        self.scheduler.config()
    }

    /// Run a validated event. Background work keeps running detached.
    pub async fn process(&self, event: Event) -> PipelineResult {
        self.run(event).await.result
    }

    /// Validate a raw payload, then run it.
    pub async fn process_value(&self, raw: &Value) -> PipelineResult {
        self.run_value(raw).await.result
    }

    /// Parse, validate, and run a JSON payload.
    pub async fn process_str(&self, text: &str) -> PipelineResult {
        self.run_str(text).await.result
    }

    /// Like [`HookPipeline::process_str`] for raw bytes; invalid UTF-8 is a
    /// malformed event.
    pub async fn process_bytes(&self, bytes: &[u8]) -> PipelineResult {
        self.run_bytes(bytes).await.result
    }

    pub async fn run_bytes(&self, bytes: &[u8]) -> PipelineRun {
        match Event::from_json_slice(bytes) {
            Ok(event) => self.run(event).await,
            Err(e) => self.malformed(e),
        }
    }

    pub async fn run_str(&self, text: &str) -> PipelineRun {
        match Event::from_json_str(text) {
            Ok(event) => self.run(event).await,
            Err(e) => self.malformed(e),
        }
    }

    pub async fn run_value(&self, raw: &Value) -> PipelineRun {
        match Event::from_value(raw) {
            Ok(event) => self.run(event).await,
            Err(e) => self.malformed(e),
        }
    }

    /// Run a validated event, returning the handles of detached work.
    pub async fn run(&self, event: Event) -> PipelineRun {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let event = Arc::new(event);

        let snapshot = self.registry.snapshot();
        let hooks = snapshot.hooks_for(&event, self.registry.cache());
        tracing::debug!(
            run_id = %run_id,
            phase = %event.phase(),
            tool = event.tool_name(),
            matched = hooks.len(),
            registry_version = snapshot.version(),
            "pipeline run started"
        );

        let outcome = self
            .scheduler
            .schedule(run_id, Arc::clone(&event), hooks)
            .await;
        let decision = aggregate(event.content(), &outcome.counted);

        let result = PipelineResult {
            run_id,
            status: decision.status,
            message: decision.message,
            final_content: decision.final_content,
            per_hook: outcome.counted,
            error: None,
            background_hooks: outcome.background_hooks,
            discarded_hooks: outcome.discarded_hooks,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        tracing::info!(
            run_id = %run_id,
            status = result.status.as_str(),
            hooks = result.per_hook.len(),
            background = result.background_hooks.len(),
            elapsed_ms = result.duration_ms,
            "pipeline run finished"
        );

        PipelineRun {
            result,
            background: outcome.background,
        }
    }

    fn malformed(&self, error: hw_event::MalformedEventError) -> PipelineRun {
        let run_id = Uuid::new_v4();
        tracing::warn!(run_id = %run_id, "malformed event, allowing: {}", error);
        PipelineRun {
            result: PipelineResult::malformed(run_id, error.to_string(), Instant::now()),
            background: BackgroundTasks::new(),
        }
    }
}
