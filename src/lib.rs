//! # wordcount
//!
//! A persistent word-frequency store with:
//! - Atomic create-or-increment per word, safe under any number of callers
//! - Write-Ahead Logging (WAL) for durability
//! - Snapshot checkpoints and crash recovery with partial write handling
//! - Explicit start-fresh initialization
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Callers (API layer, CLI)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ record / fetch_one / fetch_all
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      WordStore                               │
//! │        (shared gate: records ∥, checkpoints exclusive)       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │ CountTable  │
//!   │  (Append)   │          │ (sharded)   │
//!   └─────────────┘          └──────┬──────┘
//!                                   │ checkpoint
//!                                   ▼
//!                           ┌─────────────┐
//!                           │  Snapshot   │
//!                           └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use wordcount::{Config, WordStore};
//!
//! let config = Config::builder().data_dir("/tmp/words").build();
//! let store = WordStore::initialize(config)?;
//!
//! store.record("apple")?;
//! store.record("apple")?;
//!
//! let apple = store.fetch_one("apple")?.expect("recorded above");
//! assert_eq!(apple.count, 2);
//! assert!(store.fetch_one("pear")?.is_none());
//! # Ok::<(), wordcount::StoreError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod model;

pub mod wal;
pub mod table;
pub mod snapshot;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::{Config, WalSyncStrategy};
pub use model::{WordCount, WordCounts};
pub use store::WordStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
