// aggregator.rs — Merge per-hook verdicts into one pipeline decision.
//
// Precedence: block > modify > warn > allow. `error` verdicts never set the
// status (fail-open); they only appear in the per-hook list.
//
// Modifications
// -------------
// High-tier hooks run concurrently, so every `modifiedContent` was computed
// from the same original text. Applying them "one after another" therefore
// means rebasing: each modification is reduced to a single splice against
// the original (longest common prefix and suffix), and the splices are
// applied together in registry order.
//
//   original "x", A returns "xA", B returns "xB"
//   splices  A: [1,1) → "A"    B: [1,1) → "B"
//   result   "xAB"
//
// A splice that overlaps one accepted earlier is a conflict and is
// dropped, with a message naming the hook. An identical splice from a
// second hook is applied once.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::verdict::{Verdict, VerdictKind};

/// The aggregate status returned to the host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Allow,
    Blocked,
    Warning,
    Modified,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Allow => "allow",
            PipelineStatus::Blocked => "blocked",
            PipelineStatus::Warning => "warning",
            PipelineStatus::Modified => "modified",
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of aggregation, before the pipeline adds run metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub status: PipelineStatus,
    pub message: Option<String>,
    /// Content after modifications; the original content otherwise.
    pub final_content: Option<String>,
}

/// Aggregate `verdicts` (critical then high, each in registry order) for an
/// event whose content was `original`.
pub fn aggregate(original: Option<&str>, verdicts: &[Verdict]) -> Aggregate {
    if let Some(block) = verdicts.iter().find(|v| v.kind.is_blocking()) {
        let message = block
            .message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("blocked by hook {}", block.hook_id));
        return Aggregate {
            status: PipelineStatus::Blocked,
            message: Some(message),
            final_content: original.map(str::to_string),
        };
    }

    let warnings: Vec<&str> = verdicts
        .iter()
        .filter(|v| v.kind == VerdictKind::Warn)
        .filter_map(|v| v.message.as_deref())
        .collect();

    if verdicts.iter().any(|v| v.kind == VerdictKind::Modify) {
        let base = original.unwrap_or("");
        let (content, conflicts) = apply_modifications(base, verdicts);

        let mut messages: Vec<String> = verdicts
            .iter()
            .filter(|v| matches!(v.kind, VerdictKind::Modify | VerdictKind::Warn))
            .filter_map(|v| v.message.clone())
            .collect();
        messages.extend(conflicts);

        return Aggregate {
            status: PipelineStatus::Modified,
            message: join(messages),
            final_content: Some(content),
        };
    }

    if !warnings.is_empty() {
        return Aggregate {
            status: PipelineStatus::Warning,
            message: Some(warnings.join("\n")),
            final_content: original.map(str::to_string),
        };
    }

    Aggregate {
        status: PipelineStatus::Allow,
        message: None,
        final_content: original.map(str::to_string),
    }
}

fn join(messages: Vec<String>) -> Option<String> {
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("\n"))
    }
}

/// A replacement of `base[start..end]`, positioned in original coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Splice {
    start: usize,
    end: usize,
    replacement: String,
}

impl Splice {
    /// Reduce `modified` to the smallest single splice that turns `base`
    /// into it. Boundaries always fall on char boundaries.
    fn between(base: &str, modified: &str) -> Self {
        let prefix: usize = base
            .chars()
            .zip(modified.chars())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.len_utf8())
            .sum();
        let suffix: usize = base[prefix..]
            .chars()
            .rev()
            .zip(modified[prefix..].chars().rev())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.len_utf8())
            .sum();

        Self {
            start: prefix,
            end: base.len() - suffix,
            replacement: modified[prefix..modified.len() - suffix].to_string(),
        }
    }

    fn is_noop(&self) -> bool {
        self.start == self.end && self.replacement.is_empty()
    }

    fn is_insertion(&self) -> bool {
        self.start == self.end
    }

    /// Two splices conflict when their replaced ranges overlap, or when one
    /// inserts strictly inside the range the other replaces. Insertions at
    /// the same point, or at a range edge, do not conflict.
    fn conflicts_with(&self, other: &Splice) -> bool {
        if self.start.max(other.start) < self.end.min(other.end) {
            return true;
        }
        let inside = |point: usize, range: &Splice| range.start < point && point < range.end;
        (self.is_insertion() && inside(self.start, other))
            || (other.is_insertion() && inside(other.start, self))
    }
}

/// Apply every `modify` verdict to `base`. Returns the new content and one
/// message per conflicting modification.
fn apply_modifications(base: &str, verdicts: &[Verdict]) -> (String, Vec<String>) {
    let mut accepted: Vec<(usize, Splice)> = Vec::new();
    let mut conflicts = Vec::new();

    let modifications = verdicts
        .iter()
        .filter(|v| v.kind == VerdictKind::Modify)
        .filter_map(|v| v.modified_content.as_deref().map(|c| (v, c)));

    for (order, (verdict, modified)) in modifications.enumerate() {
        let splice = Splice::between(base, modified);
        if splice.is_noop() || accepted.iter().any(|(_, s)| *s == splice) {
            continue;
        }
        if accepted.iter().any(|(_, s)| s.conflicts_with(&splice)) {
            tracing::warn!(hook_id = %verdict.hook_id, "conflicting modification dropped");
            conflicts.push(format!(
                "modification from hook {} conflicts with an earlier modification",
                verdict.hook_id
            ));
            continue;
        }
        accepted.push((order, splice));
    }

    // Same start: insertions before replacements, then registry order.
    accepted.sort_by_key(|(order, s)| (s.start, s.end, *order));

    let mut out = String::with_capacity(base.len());
    let mut cursor = 0;
    for (_, splice) in &accepted {
        out.push_str(&base[cursor..splice.start]);
        out.push_str(&splice.replacement);
        cursor = splice.end;
    }
    out.push_str(&base[cursor..]);

    (out, conflicts)
}
