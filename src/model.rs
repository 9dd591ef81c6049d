//! WordCount record

use serde::{Deserialize, Serialize};

/// A word and the number of times it has been observed
///
/// A stored record always has `count >= 1`; words that were never observed
/// have no record at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

impl WordCount {
    pub fn new(word: impl Into<String>, count: u64) -> Self {
        Self {
            word: word.into(),
            count,
        }
    }
}

/// All entries of the store at one point in time
///
/// Consuming iterator; order is unspecified.
#[derive(Debug)]
pub struct WordCounts {
    inner: std::vec::IntoIter<WordCount>,
}

impl WordCounts {
    pub(crate) fn new(entries: Vec<WordCount>) -> Self {
        Self {
            inner: entries.into_iter(),
        }
    }
}

impl Iterator for WordCounts {
    type Item = WordCount;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for WordCounts {}
