//! Optional durable-store capability.
//!
//! The record store writes every mutation through a [`RecordJournal`] before
//! applying it in memory, and replays the journal on startup. Sessions are
//! never journaled; losing them only forces a re-login.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crmdesk_core::CrmError;

use crate::kind::{RecordId, RecordKind};
use crate::record::Record;

/// One journaled mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalEntry {
    Created { record: Record },
    Updated { record: Record },
    Deleted { kind: RecordKind, id: RecordId },
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal io: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal encoding: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("journal corrupt at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("journal lock poisoned")]
    Poisoned,
}

impl From<JournalError> for CrmError {
    fn from(value: JournalError) -> Self {
        CrmError::storage(value.to_string())
    }
}

/// Append-only log of record mutations.
pub trait RecordJournal: Send + Sync {
    fn append(&self, entry: &JournalEntry) -> Result<(), JournalError>;

    /// All entries in append order.
    fn replay(&self) -> Result<Vec<JournalEntry>, JournalError>;
}

/// Memory-only operation: nothing is written, nothing is replayed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullJournal;

impl RecordJournal for NullJournal {
    fn append(&self, _entry: &JournalEntry) -> Result<(), JournalError> {
        Ok(())
    }

    fn replay(&self) -> Result<Vec<JournalEntry>, JournalError> {
        Ok(Vec::new())
    }
}

/// JSON-lines file journal: one entry per line, flushed on every append.
///
/// Every complete entry ends with `\n`. An unterminated tail is the remains
/// of an interrupted write: `append` cuts it off before writing, and `replay`
/// ignores it.
#[derive(Debug)]
pub struct JsonLinesJournal {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesJournal {
    /// Open (or create) the journal at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordJournal for JsonLinesJournal {
    fn append(&self, entry: &JournalEntry) -> Result<(), JournalError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = self.file.lock().map_err(|_| JournalError::Poisoned)?;
        let committed = truncate_torn_tail(&mut file)?;

        let written = file.write_all(&line).and_then(|()| file.flush());
        if let Err(e) = written {
            // Leave no fragment behind for the next append to be glued onto.
            if let Err(rollback) = file.set_len(committed) {
                tracing::error!(error = %rollback, path = %self.path.display(), "journal rollback failed");
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn replay(&self) -> Result<Vec<JournalEntry>, JournalError> {
        let mut contents = String::new();
        File::open(&self.path)?.read_to_string(&mut contents)?;

        let mut entries: Vec<JournalEntry> = Vec::new();
        for (idx, line) in contents.split_inclusive('\n').enumerate() {
            let terminated = line.ends_with('\n');
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(entry) => entries.push(entry),
                Err(e) if !terminated => {
                    tracing::warn!(line = idx + 1, error = %e, "ignoring torn journal tail");
                }
                Err(e) => {
                    return Err(JournalError::Corrupt {
                        line: idx + 1,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(entries)
    }
}

/// Cut the file back to its last `\n` if it ends mid-line; returns the
/// resulting length.
fn truncate_torn_tail(file: &mut File) -> std::io::Result<u64> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(0);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(len);
    }

    let mut contents = Vec::with_capacity(len as usize);
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut contents)?;
    let keep = contents
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |pos| pos as u64 + 1);
    file.set_len(keep)?;
    tracing::warn!(dropped_bytes = len - keep, "truncated torn journal tail");
    Ok(keep)
}
