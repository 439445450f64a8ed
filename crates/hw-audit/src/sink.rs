// sink.rs — VerdictSink adapter that writes to a VerdictLog.
//
// Hook tasks record concurrently, so the log sits behind a Mutex. A
// poisoned lock is recovered: the log itself is still consistent because
// every append flushes a whole line.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use hw_engine::{SinkError, VerdictRecord, VerdictSink};

use crate::error::AuditError;
use crate::log::VerdictLog;

pub struct AuditSink {
    log: Mutex<VerdictLog>,
}

impl AuditSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        Ok(Self::new(VerdictLog::open(path)?))
    }

    pub fn new(log: VerdictLog) -> Self {
        Self {
            log: Mutex::new(log),
        }
    }
}

impl VerdictSink for AuditSink {
    fn record(&self, record: &VerdictRecord) -> Result<(), SinkError> {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.append(record).map_err(|e| SinkError::Failed {
            sink: "audit".to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn name(&self) -> &str {
        "audit"
    }
}
