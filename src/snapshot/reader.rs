//! Snapshot Reader
//!
//! Loads and validates a snapshot file.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Result, StoreError};
use crate::model::WordCount;

use super::{Snapshot, FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION};

/// Reads snapshot files
pub struct SnapshotReader;

impl SnapshotReader {
    /// Load a snapshot, rejecting anything malformed
    pub fn load(path: &Path) -> Result<Snapshot> {
        let data = fs::read(path)?;

        if data.len() < HEADER_SIZE + FOOTER_SIZE {
            return Err(StoreError::Snapshot(format!(
                "file too short: {} bytes",
                data.len()
            )));
        }

        if &data[0..4] != MAGIC {
            return Err(StoreError::Snapshot(format!(
                "Invalid snapshot magic: expected WCSN, got {:?}",
                &data[0..4]
            )));
        }

        let version = u16::from_le_bytes([data[4], data[5]]);
        if version != VERSION {
            return Err(StoreError::Snapshot(format!(
                "Unsupported snapshot version: {}",
                version
            )));
        }

        let lsn = read_u64(&data[6..14]);
        let entry_count = read_u64(&data[14..22]);
        let declared_len = read_u64(&data[22..30]);

        // Length check above guarantees this cannot underflow
        let available = (data.len() - HEADER_SIZE - FOOTER_SIZE) as u64;
        if declared_len != available {
            return Err(StoreError::Snapshot(format!(
                "length mismatch: header declares {} payload bytes, file holds {}",
                declared_len, available
            )));
        }
        let payload_len = declared_len as usize;

        let payload = &data[HEADER_SIZE..HEADER_SIZE + payload_len];
        let footer = &data[HEADER_SIZE + payload_len..];
        let stored_crc = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
        let actual_crc = crc32fast::hash(payload);
        if stored_crc != actual_crc {
            return Err(StoreError::Snapshot(format!(
                "CRC mismatch: stored {:#010x}, computed {:#010x}",
                stored_crc, actual_crc
            )));
        }

        let entries: Vec<WordCount> = bincode::deserialize(payload)
            .map_err(|e| StoreError::Snapshot(format!("undecodable payload: {}", e)))?;

        if entries.len() as u64 != entry_count {
            return Err(StoreError::Snapshot(format!(
                "entry count mismatch: header says {}, payload has {}",
                entry_count,
                entries.len()
            )));
        }

        validate_entries(&entries)?;

        Ok(Snapshot { lsn, entries })
    }

    /// Load the snapshot at `path`, or `None` if there is no file
    pub fn load_if_exists(path: &Path) -> Result<Option<Snapshot>> {
        match Self::load(path) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(StoreError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn validate_entries(entries: &[WordCount]) -> Result<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if entry.word.is_empty() {
            return Err(StoreError::Snapshot("entry with empty word".into()));
        }
        if entry.count == 0 {
            return Err(StoreError::Snapshot(format!(
                "entry {:?} has zero count",
                entry.word
            )));
        }
        if !seen.insert(entry.word.as_str()) {
            return Err(StoreError::Snapshot(format!(
                "duplicate entry for {:?}",
                entry.word
            )));
        }
    }
    Ok(())
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}
