//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs;
use std::path::Path;

use crate::error::{Result, StoreError};
use super::WalEntry;

/// Outcome of reading one frame
pub(crate) enum Frame {
    Entry(WalEntry),
    /// Clean end of file
    End,
    /// File ends part way through a frame
    Torn,
}

/// Reads entries from the WAL file
///
/// The whole log is loaded up front; it is bounded by the checkpoint interval.
pub struct WalReader {
    data: Vec<u8>,
    position: usize,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Ok(Self { data, position: 0 })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at a clean end of file. A torn or corrupt frame is
    /// an error; the reader does not advance past it.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        match self.read_frame()? {
            Frame::Entry(entry) => Ok(Some(entry)),
            Frame::End => Ok(None),
            Frame::Torn => Err(StoreError::WalCorruption(format!(
                "incomplete entry at offset {} ({} trailing bytes)",
                self.position,
                self.data.len() - self.position
            ))),
        }
    }

    pub(crate) fn read_frame(&mut self) -> Result<Frame> {
        if self.position >= self.data.len() {
            return Ok(Frame::End);
        }

        match WalEntry::decode_frame(&self.data[self.position..])? {
            Some((entry, consumed)) => {
                self.position += consumed;
                Ok(Frame::Entry(entry))
            }
            None => Ok(Frame::Torn),
        }
    }

    /// Byte offset just past the last entry read
    pub fn position(&self) -> u64 {
        self.position as u64
    }

    /// Total size of the log in bytes
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
