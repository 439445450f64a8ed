// descriptor.rs — Static hook configuration.
//
// A HookDescriptor says *when* a hook runs (phase, matcher), *how* it is
// scheduled (priority tier), and *how long* it may take (timeout). What
// the hook actually checks lives behind the HookEvaluator trait.

use std::fmt;
use std::time::Duration;

use hw_event::Phase;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::matcher::HookMatcher;

/// Which event phases a hook subscribes to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PhaseFilter {
    Pre,
    Post,
    Both,
}

impl PhaseFilter {
    pub fn accepts(&self, phase: Phase) -> bool {
        matches!(
            (self, phase),
            (PhaseFilter::Both, _) | (PhaseFilter::Pre, Phase::Pre) | (PhaseFilter::Post, Phase::Post)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseFilter::Pre => "pre",
            PhaseFilter::Post => "post",
            PhaseFilter::Both => "both",
        }
    }
}

/// Scheduling class.
///
/// The derived `Ord` follows declaration order, which is also execution
/// order: critical < high < background.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    /// Sequential, registry order, a block short-circuits everything after it.
    Critical,
    /// Concurrent; the pipeline waits for all of them (or the global deadline).
    High,
    /// Concurrent and detached; advisory only.
    Background,
}

impl PriorityTier {
    pub const ALL: [PriorityTier; 3] = [
        PriorityTier::Critical,
        PriorityTier::High,
        PriorityTier::Background,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::Critical => "critical",
            PriorityTier::High => "high",
            PriorityTier::Background => "background",
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static configuration for one hook.
///
/// Descriptors are validated on construction and live inside an immutable
/// registry snapshot afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookDescriptor {
    pub id: String,
    pub phase: PhaseFilter,
    pub matcher: HookMatcher,
    pub priority_tier: PriorityTier,
    pub timeout_ms: u64,
    pub enabled: bool,
}

impl HookDescriptor {
    /// Build and validate an enabled descriptor.
    pub fn new(
        id: impl Into<String>,
        phase: PhaseFilter,
        matcher_pattern: &str,
        priority_tier: PriorityTier,
        timeout_ms: u64,
    ) -> Result<Self, RegistryError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RegistryError::invalid(id, "id must not be empty"));
        }
        if timeout_ms == 0 {
            return Err(RegistryError::invalid(id, "timeoutMs must be positive"));
        }
        let matcher = HookMatcher::parse(matcher_pattern)
            .map_err(|e| RegistryError::invalid(id.clone(), e.to_string()))?;

        Ok(Self {
            id,
            phase,
            matcher,
            priority_tier,
            timeout_ms,
            enabled: true,
        })
    }

    /// Set the enabled flag and return self (builder pattern).
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_filter_accepts() {
        assert!(PhaseFilter::Pre.accepts(Phase::Pre));
        assert!(!PhaseFilter::Pre.accepts(Phase::Post));
        assert!(PhaseFilter::Post.accepts(Phase::Post));
        assert!(PhaseFilter::Both.accepts(Phase::Pre));
        assert!(PhaseFilter::Both.accepts(Phase::Post));
    }

    #[test]
    fn tiers_order_by_execution() {
        assert!(PriorityTier::Critical < PriorityTier::High);
        assert!(PriorityTier::High < PriorityTier::Background);
    }

    #[test]
    fn tier_serializes_as_snake_case() {
        let json = serde_json::to_string(&PriorityTier::Background).unwrap();
        assert_eq!(json, "\"background\"");
        let tier: PriorityTier = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(tier, PriorityTier::Critical);
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = HookDescriptor::new("h", PhaseFilter::Pre, "*", PriorityTier::High, 0).unwrap_err();
        assert!(err.to_string().contains("timeoutMs"));
    }

    #[test]
    fn rejects_empty_id() {
        assert!(matches!(
            HookDescriptor::new(" ", PhaseFilter::Pre, "*", PriorityTier::High, 100),
            Err(RegistryError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn rejects_bad_matcher() {
        let err = HookDescriptor::new("h", PhaseFilter::Both, "path:(", PriorityTier::Critical, 100)
            .unwrap_err();
        match err {
            RegistryError::InvalidDescriptor { id, reason } => {
                assert_eq!(id, "h");
                assert!(reason.contains("invalid regex"));
            }
            other => panic!("expected InvalidDescriptor, got {:?}", other),
        }
    }

    #[test]
    fn descriptors_are_enabled_by_default() {
        let d = HookDescriptor::new("h", PhaseFilter::Pre, "*", PriorityTier::High, 250).unwrap();
        assert!(d.enabled);
        assert_eq!(d.timeout(), Duration::from_millis(250));
        assert!(!d.with_enabled(false).enabled);
    }
}
