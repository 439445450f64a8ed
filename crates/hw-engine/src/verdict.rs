// verdict.rs — Outcome of one hook against one event.
//
// A Verdict is what the runner hands to the scheduler and aggregator. It is
// produced exactly once per hook invocation, whatever happened: a normal
// outcome maps kind-for-kind, every fault maps to kind `error`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::descriptor::PriorityTier;
use crate::error::HookFault;
use crate::hook::HookOutcome;

/// Tagged outcome kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    Allow,
    Block,
    Warn,
    Modify,
    /// The hook timed out or failed. Counts as `allow` for blocking.
    Error,
}

impl VerdictKind {
    /// Only an explicit block from the hook itself can block. `Error` is
    /// never blocking.
    pub fn is_blocking(&self) -> bool {
        matches!(self, VerdictKind::Block)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictKind::Allow => "allow",
            VerdictKind::Block => "block",
            VerdictKind::Warn => "warn",
            VerdictKind::Modify => "modify",
            VerdictKind::Error => "error",
        }
    }
}

/// One hook's verdict for one event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub hook_id: String,
    pub tier: PriorityTier,
    pub kind: VerdictKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Present only when `kind == Modify`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_content: Option<String>,
    pub duration_ms: u64,
}

impl Verdict {
    /// Map a hook's own outcome kind-for-kind.
    pub fn from_outcome(
        hook_id: impl Into<String>,
        tier: PriorityTier,
        outcome: HookOutcome,
        elapsed: Duration,
    ) -> Self {
        let (kind, message, modified_content) = match outcome {
            HookOutcome::Allow { message } => (VerdictKind::Allow, message, None),
            HookOutcome::Block { reason } => (VerdictKind::Block, Some(reason), None),
            HookOutcome::Warn { message } => (VerdictKind::Warn, Some(message), None),
            HookOutcome::Modify { content, message } => {
                (VerdictKind::Modify, message, Some(content))
            }
        };
        Self {
            hook_id: hook_id.into(),
            tier,
            kind,
            message,
            modified_content,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    /// Collapse a fault into a non-blocking `error` verdict.
    pub fn from_fault(
        hook_id: impl Into<String>,
        tier: PriorityTier,
        fault: &HookFault,
        elapsed: Duration,
    ) -> Self {
        Self {
            hook_id: hook_id.into(),
            tier,
            kind: VerdictKind::Error,
            message: Some(fault.to_string()),
            modified_content: None,
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}
