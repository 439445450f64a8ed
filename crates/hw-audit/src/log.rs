// log.rs — Append-only JSONL verdict log.
//
// One AuditEntry per line. Each entry carries the SHA-256 of the previous
// line and a contiguous sequence number, so insertion, deletion, and edits
// are all detectable with `verify_chain`.
//
// Several processes may append to the same file (one `hookwarden check` per
// tool call). Every append holds an exclusive fs2 lock on the file and first
// catches up with whatever other writers added since this handle last wrote,
// so the chain stays linear. A trailing line without its newline is a write
// that died midway; it is cut off (under the lock) before the next append.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use hw_engine::VerdictRecord;

use crate::entry::AuditEntry;
use crate::error::AuditError;
use crate::hasher;

/// An append-only verdict log backed by a JSONL file.
pub struct VerdictLog {
    file: File,
    path: PathBuf,
    last_hash: Option<String>,
    next_sequence: u64,
    /// File length as of the last sync or append by this handle.
    synced_len: u64,
}

impl VerdictLog {
    /// Open (or create) a log at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| AuditError::OpenFailed {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        let mut log = Self {
            file,
            path,
            last_hash: None,
            next_sequence: 0,
            synced_len: 0,
        };
        log.locked(Self::sync_tail)?;
        Ok(log)
    }

    /// Append one record and return the entry as written.
    pub fn append(&mut self, record: &VerdictRecord) -> Result<AuditEntry, AuditError> {
        self.locked(|log| {
            log.sync_tail()?;
            let entry = AuditEntry {
                sequence: log.next_sequence,
                previous_hash: log.last_hash.clone(),
                record: record.clone(),
            };
            let line = serde_json::to_string(&entry)?;

            log.file.write_all(format!("{}\n", line).as_bytes())?;
            log.file.flush()?;

            log.synced_len += line.len() as u64 + 1;
            log.last_hash = Some(hasher::hash_line(&line));
            log.next_sequence += 1;
            Ok(entry)
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries in the log as of this handle's last open or append,
    /// including ones written by other processes.
    pub fn len(&self) -> u64 {
        self.next_sequence
    }

    pub fn is_empty(&self) -> bool {
        self.next_sequence == 0
    }

    /// Read every entry, oldest first. Blank lines are skipped.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<AuditEntry>, AuditError> {
        let mut entries = Vec::new();
        for line in Self::lines(path.as_ref())? {
            entries.push(serde_json::from_str(&line?.1)?);
        }
        Ok(entries)
    }

    /// The last `n` entries, oldest first.
    pub fn tail(path: impl AsRef<Path>, n: usize) -> Result<Vec<AuditEntry>, AuditError> {
        let mut entries = Self::read_all(path)?;
        let skip = entries.len().saturating_sub(n);
        Ok(entries.split_off(skip))
    }

    /// Verify hash links and sequence numbers. Returns the number of entries
    /// checked.
    pub fn verify_chain(path: impl AsRef<Path>) -> Result<u64, AuditError> {
        let mut previous_hash: Option<String> = None;
        let mut expected_sequence = 0u64;

        for line in Self::lines(path.as_ref())? {
            let (line_num, line) = line?;
            let entry: AuditEntry = serde_json::from_str(&line)?;

            if entry.previous_hash != previous_hash {
                return Err(AuditError::IntegrityViolation {
                    line: line_num,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: entry.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }
            if entry.sequence != expected_sequence {
                return Err(AuditError::SequenceGap {
                    line: line_num,
                    expected: expected_sequence,
                    actual: entry.sequence,
                });
            }

            // Hash the raw line, not a re-serialization.
            previous_hash = Some(hasher::hash_line(&line));
            expected_sequence += 1;
        }

        Ok(expected_sequence)
    }

    /// Non-blank lines with their 1-based line numbers.
    fn lines(
        path: &Path,
    ) -> Result<impl Iterator<Item = Result<(usize, String), AuditError>>, AuditError> {
        let file = File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(BufReader::new(file)
            .lines()
            .enumerate()
            .filter_map(|(i, line)| match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some(Ok((i + 1, line))),
                Err(e) => Some(Err(AuditError::from(e))),
            }))
    }

    /// Run `f` while holding the exclusive lock on the log file.
    fn locked<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, AuditError>,
    ) -> Result<T, AuditError> {
        FileExt::lock_exclusive(&self.file).map_err(|source| AuditError::LockFailed {
            path: self.path.clone(),
            source,
        })?;
        let result = f(self);
        let unlocked = FileExt::unlock(&self.file).map_err(|source| AuditError::LockFailed {
            path: self.path.clone(),
            source,
        });
        let value = result?;
        unlocked?;
        Ok(value)
    }

    /// Catch up with lines appended since `synced_len` and recover the last
    /// hash and sequence number. Must be called with the lock held.
    fn sync_tail(&mut self) -> Result<(), AuditError> {
        let len = self.file.metadata()?.len();
        if len == self.synced_len {
            return Ok(());
        }
        let start = if len < self.synced_len {
            // Shrunk underneath us: rescan from the top.
            self.last_hash = None;
            self.next_sequence = 0;
            0
        } else {
            self.synced_len
        };

        let mut reader = BufReader::new(&self.file);
        reader.seek(SeekFrom::Start(start))?;

        let mut complete_end = start;
        let mut last: Option<Vec<u8>> = None;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf)?;
            if read == 0 || buf.last() != Some(&b'\n') {
                break;
            }
            complete_end += read as u64;
            if !buf.iter().all(u8::is_ascii_whitespace) {
                last = Some(std::mem::take(&mut buf));
            }
        }

        if complete_end < len {
            tracing::warn!(
                path = %self.path.display(),
                bytes = len - complete_end,
                "dropping partial trailing line from verdict log"
            );
            self.file.set_len(complete_end)?;
        }
        self.synced_len = complete_end;

        if let Some(mut line) = last {
            while matches!(line.last(), Some(b'\n' | b'\r')) {
                line.pop();
            }
            let line = String::from_utf8(line)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let entry: AuditEntry = serde_json::from_str(&line)?;
            self.last_hash = Some(hasher::hash_line(&line));
            self.next_sequence = entry.sequence + 1;
        }
        Ok(())
    }
}
