//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::Result;
use super::reader::Frame;
use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries skipped
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

struct Scan {
    entries: Vec<WalEntry>,
    valid_len: u64,
    result: RecoveryResult,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Stop at the first torn or corrupted frame
    /// 3. Truncate the file to the valid prefix
    /// 4. Return all valid entries in order
    ///
    /// A missing file recovers as empty.
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        if !path.exists() {
            return Ok((Vec::new(), RecoveryResult::default()));
        }

        let scan = Self::scan(path)?;

        if scan.result.was_truncated {
            tracing::warn!(
                path = %path.display(),
                valid_bytes = scan.valid_len,
                last_lsn = scan.result.last_lsn,
                "Truncating invalid WAL tail"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(scan.valid_len)?;
            file.sync_all()?;
        }

        Ok((scan.entries, scan.result))
    }

    fn scan(path: &Path) -> Result<Scan> {
        let mut reader = WalReader::open(path)?;
        let total_len = reader.len();
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();
        let mut valid_len = 0u64;

        loop {
            match reader.read_frame() {
                Ok(Frame::Entry(entry)) => {
                    // LSNs only move forward; a step back means stale bytes
                    if entry.lsn <= result.last_lsn {
                        result.entries_corrupted += 1;
                        break;
                    }
                    result.last_lsn = entry.lsn;
                    result.entries_recovered += 1;
                    entries.push(entry);
                    valid_len = reader.position();
                }
                Ok(Frame::End) | Ok(Frame::Torn) => break,
                Err(e) => {
                    tracing::debug!(error = %e, offset = valid_len, "WAL scan hit corrupt entry");
                    result.entries_corrupted += 1;
                    break;
                }
            }
        }

        result.was_truncated = valid_len < total_len;

        Ok(Scan {
            entries,
            valid_len,
            result,
        })
    }
}
