//! Snapshot Builder
//!
//! Writes the full set of counts to a new snapshot file.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::model::WordCount;

use super::{SnapshotMeta, MAGIC, VERSION};

/// Writes snapshot files
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    /// Write `entries` as the snapshot at `path`, covering WAL up to `lsn`
    ///
    /// The previous snapshot (if any) stays intact until the new one is
    /// fully on disk.
    pub fn write(path: &Path, lsn: u64, entries: &[WordCount]) -> Result<SnapshotMeta> {
        let payload = bincode::serialize(entries)?;
        let crc = crc32fast::hash(&payload);

        let tmp_path = temp_path(path);
        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            let mut writer = BufWriter::new(file);

            writer.write_all(MAGIC)?;
            writer.write_all(&VERSION.to_le_bytes())?;
            writer.write_all(&lsn.to_le_bytes())?;
            writer.write_all(&(entries.len() as u64).to_le_bytes())?;
            writer.write_all(&(payload.len() as u64).to_le_bytes())?;
            writer.write_all(&payload)?;
            writer.write_all(&crc.to_le_bytes())?;
            writer.flush()?;

            let file = writer.into_inner().map_err(|e| {
                StoreError::Snapshot(format!("Failed to flush snapshot: {}", e))
            })?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, path)?;
        sync_parent_dir(path)?;

        let file_size = fs::metadata(path)?.len();

        Ok(SnapshotMeta {
            path: path.to_path_buf(),
            lsn,
            entry_count: entries.len() as u64,
            file_size,
        })
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::File::open(dir)?.sync_all()?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}
