//! Store Module
//!
//! The word count store that coordinates all components.
//!
//! ## Responsibilities
//! - Bring up storage, either fresh (`initialize`) or from disk (`open`)
//! - Log every observation to the WAL before counting it
//! - Serve lookups from the count table
//! - Checkpoint the table into a snapshot and truncate the WAL

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::model::{WordCount, WordCounts};
use crate::snapshot::{SnapshotBuilder, SnapshotReader};
use crate::table::CountTable;
use crate::wal::{Operation, WalRecovery, WalWriter};

/// Persistent word → count store
///
/// ## Concurrency Model
///
/// - **record**: holds `gate` shared, appends to the WAL under `wal`, then
///   increments the word inside its shard's write lock. Records for
///   different words only meet at the WAL append.
/// - **fetch_one**: shard read lock only.
/// - **fetch_all / checkpoint**: hold `gate` exclusively, so they see every
///   logged increment applied and none half-done.
///
/// Lock order is always `gate` → `wal` → shard.
pub struct WordStore {
    config: Config,

    wal_path: PathBuf,
    snapshot_path: PathBuf,

    /// Write-ahead log (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// In-memory counts (internal per-shard RwLock)
    table: CountTable,

    /// Shared by in-flight records, exclusive for whole-table operations
    gate: RwLock<()>,

    /// WAL entries written since the last checkpoint
    pending: AtomicU64,
}

impl WordStore {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "words.wal";
    const SNAPSHOT_FILENAME: &'static str = "words.snapshot";

    /// Create a fresh, empty store
    ///
    /// Any data already under `config.data_dir` is discarded: the snapshot is
    /// deleted and the WAL truncated before this returns. Errors come back as
    /// `StoreError::Initialization`; aborting startup is up to the caller.
    pub fn initialize(config: Config) -> Result<Self> {
        let data_dir = config.data_dir.clone();
        Self::initialize_inner(config).map_err(|e| StoreError::initialization(data_dir, e))
    }

    fn initialize_inner(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let snapshot_path = config.data_dir.join(Self::SNAPSHOT_FILENAME);

        remove_if_exists(&snapshot_path)?;
        let wal = WalWriter::create(&wal_path, config.wal_sync_strategy)?;
        let table = CountTable::new(config.shard_count);

        tracing::info!(
            data_dir = %config.data_dir.display(),
            shards = table.shard_count(),
            "Initialized empty word store"
        );

        Ok(Self::assemble(config, wal_path, snapshot_path, wal, table))
    }

    /// Open an existing store, keeping its data
    ///
    /// On startup:
    /// 1. Load the snapshot if there is one
    /// 2. Replay WAL entries newer than the snapshot
    /// 3. Checkpoint so the replayed entries live in the snapshot
    pub fn open(config: Config) -> Result<Self> {
        let data_dir = config.data_dir.clone();
        Self::open_inner(config).map_err(|e| StoreError::initialization(data_dir, e))
    }

    fn open_inner(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let snapshot_path = config.data_dir.join(Self::SNAPSHOT_FILENAME);
        let table = CountTable::new(config.shard_count);

        // Step 1: Snapshot
        let snapshot_lsn = match SnapshotReader::load_if_exists(&snapshot_path)? {
            Some(snapshot) => {
                let words = snapshot.entries.len();
                for entry in snapshot.entries {
                    table.insert(entry.word, entry.count);
                }
                tracing::info!(words, lsn = snapshot.lsn, "Loaded snapshot");
                snapshot.lsn
            }
            None => 0,
        };

        // Step 2: WAL replay
        let (entries, recovery) = WalRecovery::recover(&wal_path)?;
        let mut replayed = 0u64;
        for entry in entries {
            if entry.lsn <= snapshot_lsn {
                continue;
            }
            table.increment(entry.operation.word());
            replayed += 1;
        }

        if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
            tracing::info!(
                recovered = recovery.entries_recovered,
                corrupted = recovery.entries_corrupted,
                replayed,
                last_lsn = recovery.last_lsn,
                "WAL recovery complete"
            );
        }

        // Recovery already cut the WAL back to its valid prefix
        let wal = WalWriter::open_after_recovery(
            &wal_path,
            config.wal_sync_strategy,
            snapshot_lsn.max(recovery.last_lsn),
        )?;
        let wal_has_entries = wal.size() > 0;

        let store = Self::assemble(config, wal_path, snapshot_path, wal, table);

        // Step 3: Fold the replayed log into a snapshot
        if wal_has_entries {
            store.checkpoint()?;
        }

        tracing::info!(
            data_dir = %store.config.data_dir.display(),
            words = store.len(),
            "Opened word store"
        );

        Ok(store)
    }

    fn assemble(
        config: Config,
        wal_path: PathBuf,
        snapshot_path: PathBuf,
        wal: WalWriter,
        table: CountTable,
    ) -> Self {
        Self {
            config,
            wal_path,
            snapshot_path,
            wal: Mutex::new(wal),
            table,
            gate: RwLock::new(()),
            pending: AtomicU64::new(0),
        }
    }

    /// Record one observation of `word`
    ///
    /// Creates the word with count 1 or adds 1 to its count, and returns the
    /// new count. If the WAL append fails the count is left untouched.
    pub fn record(&self, word: &str) -> Result<u64> {
        if word.is_empty() {
            return Err(StoreError::EmptyWord);
        }

        let count = {
            let _gate = self.gate.read();

            // Step 1: Write to WAL first (durability guarantee)
            self.wal.lock().append(Operation::Increment {
                word: word.to_owned(),
            })?;

            // Step 2: Apply to the table
            self.table.increment(word)
        };

        self.pending.fetch_add(1, Ordering::Relaxed);
        self.maybe_checkpoint();

        Ok(count)
    }

    /// Look up one word
    ///
    /// `Ok(None)` means the word was never observed; errors are reserved for
    /// storage failures.
    pub fn fetch_one(&self, word: &str) -> Result<Option<WordCount>> {
        Ok(self
            .table
            .get(word)
            .map(|count| WordCount::new(word, count)))
    }

    /// Every stored word with its count, in no particular order
    pub fn fetch_all(&self) -> Result<WordCounts> {
        let _gate = self.gate.write();
        Ok(WordCounts::new(self.table.entries()))
    }

    /// Write a snapshot of all counts and truncate the WAL
    pub fn checkpoint(&self) -> Result<()> {
        let _gate = self.gate.write();
        self.checkpoint_locked()
    }

    /// Checkpoint body; caller holds `gate` exclusively
    fn checkpoint_locked(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        wal.sync()?;

        let lsn = wal.current_lsn() - 1;
        let entries = self.table.entries();
        let meta = SnapshotBuilder::write(&self.snapshot_path, lsn, &entries)?;

        // Snapshot is durable; the log up to `lsn` is no longer needed
        wal.truncate()?;
        self.pending.store(0, Ordering::Relaxed);

        tracing::debug!(
            lsn = meta.lsn,
            words = meta.entry_count,
            bytes = meta.file_size,
            "Checkpoint written"
        );
        Ok(())
    }

    /// Checkpoint once enough WAL entries have piled up
    ///
    /// The observation that triggered this is already durable, so a failed
    /// checkpoint is logged rather than reported to the recorder.
    fn maybe_checkpoint(&self) {
        let Some(interval) = self.config.checkpoint_interval else {
            return;
        };
        if self.pending.load(Ordering::Relaxed) < interval {
            return;
        }

        let _gate = self.gate.write();
        // Another caller may have checkpointed while we waited
        if self.pending.load(Ordering::Relaxed) < interval {
            return;
        }
        if let Err(e) = self.checkpoint_locked() {
            tracing::warn!(error = %e, "Automatic checkpoint failed");
        }
    }

    /// Close the store gracefully
    ///
    /// Checkpoints so the next `open` starts from a snapshot alone.
    pub fn close(self) -> Result<()> {
        self.checkpoint()?;
        tracing::info!(data_dir = %self.config.data_dir.display(), "Word store closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Number of distinct words
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// LSN the next observation will be logged under
    pub fn current_lsn(&self) -> u64 {
        self.wal.lock().current_lsn()
    }

    /// WAL entries not yet folded into a snapshot
    pub fn pending_entries(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
