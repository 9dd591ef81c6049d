//! Count Table Module
//!
//! In-memory word → count map that serves every read and absorbs every
//! increment.
//!
//! ## Responsibilities
//! - Atomic create-or-increment per word
//! - Concurrent reads
//! - Point-in-time copies for snapshots and `fetch_all`
//!
//! ## Data Structure Choice
//! A fixed set of shards, each a `HashMap` behind its own `parking_lot::RwLock`.
//! A word always hashes to the same shard, so the read-modify-write of its
//! count happens entirely under one write guard. Words in different shards
//! never contend.

mod table;

pub use table::CountTable;
