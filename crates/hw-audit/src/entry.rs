// entry.rs — One line of the verdict log.
//
// An AuditEntry wraps a VerdictRecord with its position in the log and the
// hash of the previous line. The hash covers the raw JSON line as written,
// so any edit to an earlier entry breaks every link after it.

use hw_engine::VerdictRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// 0-based position in the log.
    pub sequence: u64,
    /// Hash of the previous line; `None` for the first entry.
    #[serde(default)]
    pub previous_hash: Option<String>,
    pub record: VerdictRecord,
}
