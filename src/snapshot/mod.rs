//! Snapshot Module
//!
//! Point-in-time image of the count table, written at each checkpoint so the
//! WAL can be truncated.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (30 bytes)                                            │
//! │   Magic: "WCSN" (4) | Version: u16 (2) | LSN: u64 (8)        │
//! │   Count: u64 (8) | PayloadLen: u64 (8)                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Payload (variable)                                           │
//! │   bincode(Vec<WordCount>)                                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                             │
//! │   PayloadCRC: u32                                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! LSN is the last WAL entry the snapshot includes. Files are written to a
//! temporary name and renamed into place, so a reader sees either the old
//! snapshot or the new one.

mod builder;
mod reader;

use std::path::PathBuf;

pub use builder::SnapshotBuilder;
pub use reader::SnapshotReader;

use crate::model::WordCount;

// =============================================================================
// Shared Constants (used by builder and reader)
// =============================================================================

/// Magic bytes identifying a snapshot file
pub(crate) const MAGIC: &[u8; 4] = b"WCSN";

/// Current snapshot format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + LSN (8) + Count (8) + PayloadLen (8)
pub(crate) const HEADER_SIZE: usize = 30;

/// Footer size: PayloadCRC (4)
pub(crate) const FOOTER_SIZE: usize = 4;

// =============================================================================
// Snapshot Contents
// =============================================================================

/// A loaded snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Last WAL LSN folded into `entries`
    pub lsn: u64,
    pub entries: Vec<WordCount>,
}

/// Metadata for a snapshot that was just written
#[derive(Debug, Clone)]
pub struct SnapshotMeta {
    pub path: PathBuf,
    pub lsn: u64,
    pub entry_count: u64,
    pub file_size: u64,
}
