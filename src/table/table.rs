//! CountTable implementation
//!
//! Sharded HashMap with one RwLock per shard.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;

use parking_lot::RwLock;

use crate::model::WordCount;

type Shard = RwLock<HashMap<String, u64>>;

/// In-memory table of word counts
pub struct CountTable {
    shards: Box<[Shard]>,
    hasher: RandomState,
}

impl CountTable {
    /// Create an empty table with `shard_count` shards (at least one)
    pub fn new(shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    /// Add one observation of `word`, returning its new count
    ///
    /// Absent words start at 1. The lookup and the update share a single
    /// write guard, so concurrent calls for the same word never lose an
    /// increment.
    pub fn increment(&self, word: &str) -> u64 {
        let mut shard = self.shard_for(word).write();
        match shard.get_mut(word) {
            Some(count) => {
                *count += 1;
                *count
            }
            None => {
                shard.insert(word.to_owned(), 1);
                1
            }
        }
    }

    /// Get the count for a word (read lock)
    pub fn get(&self, word: &str) -> Option<u64> {
        self.shard_for(word).read().get(word).copied()
    }

    /// Set a word's count outright (used when loading a snapshot)
    ///
    /// Zero counts are ignored; a stored word always has count >= 1.
    pub fn insert(&self, word: String, count: u64) {
        if count == 0 {
            return;
        }
        self.shard_for(&word).write().insert(word, count);
    }

    /// Number of distinct words
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    /// Copy every entry out of the table
    ///
    /// Shards are read one at a time. Callers that need a single consistent
    /// cut must hold off writers themselves.
    pub fn entries(&self) -> Vec<WordCount> {
        let mut out = Vec::with_capacity(self.len());
        for shard in self.shards.iter() {
            let guard = shard.read();
            out.extend(
                guard
                    .iter()
                    .map(|(word, &count)| WordCount::new(word.clone(), count)),
            );
        }
        out
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_for(&self, word: &str) -> &Shard {
        let index = self.hasher.hash_one(word) as usize % self.shards.len();
        &self.shards[index]
    }
}

impl Default for CountTable {
    fn default() -> Self {
        Self::new(16)
    }
}
