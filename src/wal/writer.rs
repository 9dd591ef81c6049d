//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{Result, StoreError};
use super::{Operation, WalEntry};

/// Writes entries to the WAL file
///
/// Not internally synchronized; the store keeps it behind a mutex.
pub struct WalWriter {
    path: PathBuf,
    file: File,
    /// LSN the next append will receive
    next_lsn: u64,
    /// End of the last fully written frame
    offset: u64,
    sync_strategy: WalSyncStrategy,
    /// Appends since the last fsync
    unsynced: usize,
    #[cfg(test)]
    fail_next_sync: bool,
}

impl WalWriter {
    /// Open or create a WAL that has already been through `WalRecovery::recover`
    ///
    /// Existing entries are kept and the file is not scanned again; appends
    /// continue after `last_lsn`.
    pub fn open_after_recovery(
        path: &Path,
        sync_strategy: WalSyncStrategy,
        last_lsn: u64,
    ) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let offset = file.seek(SeekFrom::End(0))?;

        Ok(Self::from_parts(path, file, last_lsn + 1, offset, sync_strategy))
    }

    /// Create an empty WAL, discarding whatever the file held
    pub fn create(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.sync_all()?;

        Ok(Self::from_parts(path, file, 1, 0, sync_strategy))
    }

    fn from_parts(
        path: &Path,
        file: File,
        next_lsn: u64,
        offset: u64,
        sync_strategy: WalSyncStrategy,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            file,
            next_lsn,
            offset,
            sync_strategy,
            unsynced: 0,
            #[cfg(test)]
            fail_next_sync: false,
        }
    }

    /// Append an entry to the WAL
    ///
    /// Returns the LSN assigned to the entry. If the write or its fsync
    /// fails, the frame is cut off again and the writer's state is as it was
    /// before the call, so a failed append never replays on recovery.
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        let lsn = self.next_lsn;
        let frame = WalEntry::new(lsn, operation).serialize()?;

        if let Err(e) = self.file.write_all(&frame) {
            self.rollback();
            return Err(StoreError::WalWrite(format!("append at lsn {}: {}", lsn, e)));
        }

        let should_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced + 1 >= count,
        };
        if should_sync {
            if let Err(e) = self.sync_file() {
                self.rollback();
                return Err(StoreError::WalWrite(format!("fsync at lsn {}: {}", lsn, e)));
            }
            self.unsynced = 0;
        } else {
            self.unsynced += 1;
        }

        self.offset += frame.len() as u64;
        self.next_lsn += 1;

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        if self.unsynced == 0 {
            return Ok(());
        }
        self.sync_file()
            .map_err(|e| StoreError::WalWrite(format!("fsync {}: {}", self.path.display(), e)))?;
        self.unsynced = 0;
        Ok(())
    }

    /// Drop every entry from the file
    ///
    /// LSNs keep counting from where they were.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.sync_all()?;
        self.offset = 0;
        self.unsynced = 0;
        Ok(())
    }

    /// Get the current LSN (the one the next append will receive)
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Size of the log in bytes
    pub fn size(&self) -> u64 {
        self.offset
    }

    fn sync_file(&mut self) -> io::Result<()> {
        #[cfg(test)]
        {
            if std::mem::take(&mut self.fail_next_sync) {
                return Err(io::Error::new(io::ErrorKind::Other, "injected fsync failure"));
            }
        }
        self.file.sync_data()
    }

    /// Cut the file back to the end of the last complete frame
    fn rollback(&mut self) {
        let restored = self
            .file
            .set_len(self.offset)
            .and_then(|_| self.file.seek(SeekFrom::Start(self.offset)).map(|_| ()));
        if let Err(e) = restored {
            tracing::error!(
                path = %self.path.display(),
                offset = self.offset,
                error = %e,
                "Failed to roll back partial WAL frame"
            );
        }
    }
}
