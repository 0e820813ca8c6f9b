//! Append-only JSON-lines file store.
//!
//! One serialized `AuditEntry` per line, flushed and synced on every
//! append. Reading back is tolerant: a line that does not decode becomes a
//! `StoredRecord::Malformed` so the validator can report it in place.
//!
//! Every append starts on a line boundary. `open` terminates a trailing
//! partial line left by an interrupted process, and a failed write is
//! truncated back to the previous length.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use tessera_contracts::{
    entry::{AuditEntry, ChainTip},
    error::{AuditError, AuditResult, StoreError},
    validation::StoredRecord,
};
use tessera_core::traits::AuditStore;

/// `AuditStore` backed by a `.jsonl` file.
#[derive(Debug)]
pub struct JsonlAuditStore {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditStore {
    /// Open (or create) the log at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> AuditResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| AuditError::Config {
                reason: format!("failed to create log directory '{}': {}", parent.display(), e),
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| AuditError::Config {
                reason: format!("failed to open audit log '{}': {}", path.display(), e),
            })?;

        let unterminated = ends_mid_line(&mut file).map_err(|e| AuditError::Config {
            reason: format!("failed to inspect audit log '{}': {}", path.display(), e),
        })?;
        if unterminated {
            warn!(path = %path.display(), "audit log ends mid-line; terminating it");
            file.write_all(b"\n")
                .and_then(|()| file.sync_data())
                .map_err(|e| AuditError::Config {
                    reason: format!("failed to terminate audit log '{}': {}", path.display(), e),
                })?;
        }

        info!(path = %path.display(), "audit log opened");

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record in the file, malformed lines included.
    pub fn records(&self) -> AuditResult<Vec<StoredRecord>> {
        load_records(&self.path)
    }
}

/// Read every record from a JSON-lines audit log. Blank lines are skipped.
///
/// I/O failures are errors; undecodable lines are returned as
/// `StoredRecord::Malformed`.
pub fn load_records(path: &Path) -> AuditResult<Vec<StoredRecord>> {
    let file = File::open(path).map_err(|e| AuditError::StoreRead {
        reason: format!("failed to open audit log '{}': {}", path.display(), e),
    })?;

    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| AuditError::StoreRead {
            reason: format!("failed to read line {}: {}", line_no, e),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<AuditEntry>(&line) {
            Ok(entry) => records.push(StoredRecord::Entry(entry)),
            Err(e) => records.push(StoredRecord::Malformed {
                line: line_no,
                reason: e.to_string(),
            }),
        }
    }

    debug!(path = %path.display(), records = records.len(), "audit log loaded");
    Ok(records)
}

/// True if the file is non-empty and its last byte is not a newline.
fn ends_mid_line(file: &mut File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn read_err(e: AuditError) -> StoreError {
    StoreError::Read {
        reason: e.to_string(),
    }
}

impl AuditStore for JsonlAuditStore {
    fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(entry).map_err(|e| StoreError::Write {
            reason: format!("failed to serialize entry: {}", e),
        })?;
        line.push('\n');

        let mut file = self.file.lock().map_err(|e| StoreError::Write {
            reason: format!("log file lock poisoned: {}", e),
        })?;
        let len = file
            .metadata()
            .map_err(|e| StoreError::Write {
                reason: format!("failed to stat audit log: {}", e),
            })?
            .len();
        if let Err(e) = file.write_all(line.as_bytes()) {
            if let Err(trunc) = file.set_len(len) {
                warn!(
                    path = %self.path.display(),
                    error = %trunc,
                    "partial audit line could not be truncated"
                );
            }
            return Err(StoreError::Write {
                reason: format!("failed to write to audit log: {}", e),
            });
        }
        file.flush().map_err(|e| StoreError::Write {
            reason: format!("failed to flush audit log: {}", e),
        })?;
        file.sync_data().map_err(|e| StoreError::Write {
            reason: format!("failed to sync audit log: {}", e),
        })?;
        Ok(())
    }

    /// Fails if any record in the file is malformed; use `records()` for a
    /// damage-tolerant read.
    fn read_range(&self, from: u64, to: u64) -> Result<Vec<AuditEntry>, StoreError> {
        let mut out = Vec::new();
        for record in self.records().map_err(read_err)? {
            match record {
                StoredRecord::Entry(e) if (from..=to).contains(&e.sequence_number) => out.push(e),
                StoredRecord::Entry(_) => {}
                StoredRecord::Malformed { line, reason } => {
                    return Err(StoreError::Read {
                        reason: format!("malformed record on line {}: {}", line, reason),
                    })
                }
            }
        }
        Ok(out)
    }

    /// The tip of the last line. A malformed last line is an error: the
    /// true tip is unknown and guessing would fork the chain.
    fn load_tip(&self) -> Result<Option<ChainTip>, StoreError> {
        match self.records().map_err(read_err)?.pop() {
            None => Ok(None),
            Some(StoredRecord::Entry(e)) => Ok(Some(e.tip())),
            Some(StoredRecord::Malformed { line, reason }) => Err(StoreError::Read {
                reason: format!("last record (line {}) is malformed: {}", line, reason),
            }),
        }
    }
}
