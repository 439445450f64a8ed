// sink.rs — Observability sinks for verdicts.
//
// Every verdict a pipeline run produces is offered to a VerdictSink, tagged
// with how it was used:
//
//   counted    — critical/high verdict that fed the aggregate decision
//   advisory   — background verdict (never affects the decision)
//   discarded  — high-tier verdict that arrived after a critical block
//
// Sink errors are logged and swallowed; observability never changes a
// decision or fails a run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use hw_event::{Event, Phase};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SinkError;
use crate::verdict::{Verdict, VerdictKind};

/// How a verdict was used by its pipeline run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Counted,
    Advisory,
    Discarded,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Counted => "counted",
            Disposition::Advisory => "advisory",
            Disposition::Discarded => "discarded",
        }
    }
}

/// One verdict plus the context of the run that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerdictRecord {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub phase: Phase,
    pub tool_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub disposition: Disposition,
    pub verdict: Verdict,
}

impl VerdictRecord {
    pub fn new(run_id: Uuid, event: &Event, disposition: Disposition, verdict: Verdict) -> Self {
        Self {
            run_id,
            timestamp: Utc::now(),
            phase: event.phase(),
            tool_name: event.tool_name().to_string(),
            file_path: event.file_path().map(str::to_string),
            disposition,
            verdict,
        }
    }
}

/// Destination for verdict records.
///
/// `record` is synchronous: sinks are called from hook tasks and must not
/// hold the run up for long.
pub trait VerdictSink: Send + Sync {
    fn record(&self, record: &VerdictRecord) -> Result<(), SinkError>;

    /// Name used in error logs.
    fn name(&self) -> &str {
        "sink"
    }
}

/// Record through `sink`, logging and swallowing any error.
pub(crate) fn record_quietly(sink: &dyn VerdictSink, record: &VerdictRecord) {
    if let Err(e) = sink.record(record) {
        tracing::warn!(sink = sink.name(), "verdict sink error: {}", e);
    }
}

/// Emits every record as a structured `tracing` event.
#[derive(Debug, Default)]
pub struct TracingSink;

impl VerdictSink for TracingSink {
    fn record(&self, record: &VerdictRecord) -> Result<(), SinkError> {
        let v = &record.verdict;
        tracing::info!(
            run_id = %record.run_id,
            hook_id = %v.hook_id,
            tier = %v.tier,
            kind = v.kind.as_str(),
            disposition = record.disposition.as_str(),
            elapsed_ms = v.duration_ms,
            message = v.message.as_deref().unwrap_or(""),
            "verdict"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

/// Keeps every record in memory. Useful for tests and `--full` output.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<VerdictRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<VerdictRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records for one disposition, in arrival order.
    pub fn with_disposition(&self, disposition: Disposition) -> Vec<VerdictRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.disposition == disposition)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VerdictSink for MemorySink {
    fn record(&self, record: &VerdictRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Lock-free per-kind counters.
#[derive(Debug, Default)]
pub struct CountingSink {
    allow: AtomicU64,
    block: AtomicU64,
    warn: AtomicU64,
    modify: AtomicU64,
    error: AtomicU64,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, kind: VerdictKind) -> &AtomicU64 {
        match kind {
            VerdictKind::Allow => &self.allow,
            VerdictKind::Block => &self.block,
            VerdictKind::Warn => &self.warn,
            VerdictKind::Modify => &self.modify,
            VerdictKind::Error => &self.error,
        }
    }

    pub fn count(&self, kind: VerdictKind) -> u64 {
        self.counter(kind).load(Ordering::Relaxed)
    }

    /// Snapshot of all counters, keyed by kind name.
    pub fn snapshot(&self) -> HashMap<&'static str, u64> {
        [
            VerdictKind::Allow,
            VerdictKind::Block,
            VerdictKind::Warn,
            VerdictKind::Modify,
            VerdictKind::Error,
        ]
        .into_iter()
        .map(|kind| (kind.as_str(), self.count(kind)))
        .collect()
    }
}

impl VerdictSink for CountingSink {
    fn record(&self, record: &VerdictRecord) -> Result<(), SinkError> {
        self.counter(record.verdict.kind)
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Fans one record out to several sinks. A failing sink does not stop the
/// others.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Arc<dyn VerdictSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink and return self (builder pattern).
    pub fn with_sink(mut self, sink: Arc<dyn VerdictSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn push(&mut self, sink: Arc<dyn VerdictSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl VerdictSink for SinkSet {
    fn record(&self, record: &VerdictRecord) -> Result<(), SinkError> {
        for sink in &self.sinks {
            record_quietly(sink.as_ref(), record);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "set"
    }
}
