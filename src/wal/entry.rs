//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their on-disk frame.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Frame header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest payload a frame may declare; anything bigger is treated as corruption
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// One observation of a word
    Increment { word: String },
}

impl Operation {
    /// The word this operation applies to
    pub fn word(&self) -> &str {
        match self {
            Operation::Increment { word } => word,
        }
    }
}

impl WalEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Encode as a complete frame: header followed by payload
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(StoreError::WalWrite(format!(
                "entry payload of {} bytes exceeds limit of {}",
                payload.len(),
                MAX_PAYLOAD_SIZE
            )));
        }

        let len = payload.len() as u32;
        let crc = compute_crc(self.lsn, len, &payload);

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.extend_from_slice(&self.lsn.to_le_bytes());
        frame.extend_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }

    /// Decode a complete frame
    ///
    /// Incomplete input is reported as corruption.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        match Self::decode_frame(bytes)? {
            Some((entry, _)) => Ok(entry),
            None => Err(StoreError::WalCorruption(format!(
                "incomplete frame ({} bytes)",
                bytes.len()
            ))),
        }
    }

    /// Decode the frame at the start of `bytes`
    ///
    /// Returns:
    /// - `Ok(Some((entry, consumed)))` for a valid frame
    /// - `Ok(None)` if `bytes` ends before the frame does (torn write)
    /// - `Err(WalCorruption)` if the frame is present but invalid
    pub(crate) fn decode_frame(bytes: &[u8]) -> Result<Option<(Self, usize)>> {
        if bytes.len() < HEADER_SIZE {
            return Ok(None);
        }

        let lsn = u64::from_le_bytes(read_array(&bytes[0..8]));
        let stored_crc = u32::from_le_bytes(read_array(&bytes[8..12]));
        let len = u32::from_le_bytes(read_array(&bytes[12..16]));

        if len as usize > MAX_PAYLOAD_SIZE {
            return Err(StoreError::WalCorruption(format!(
                "frame at lsn {} declares {} byte payload",
                lsn, len
            )));
        }

        let end = HEADER_SIZE + len as usize;
        if bytes.len() < end {
            return Ok(None);
        }

        let payload = &bytes[HEADER_SIZE..end];
        let actual_crc = compute_crc(lsn, len, payload);
        if actual_crc != stored_crc {
            return Err(StoreError::WalCorruption(format!(
                "CRC mismatch at lsn {}: stored {:#010x}, computed {:#010x}",
                lsn, stored_crc, actual_crc
            )));
        }

        let entry: WalEntry = bincode::deserialize(payload)
            .map_err(|e| StoreError::WalCorruption(format!("undecodable payload: {}", e)))?;

        if entry.lsn != lsn {
            return Err(StoreError::WalCorruption(format!(
                "header lsn {} does not match entry lsn {}",
                lsn, entry.lsn
            )));
        }

        Ok(Some((entry, end)))
    }
}

fn compute_crc(lsn: u64, len: u32, payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&lsn.to_le_bytes());
    hasher.update(&len.to_le_bytes());
    hasher.update(payload);
    hasher.finalize()
}

fn read_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(slice);
    buf
}
