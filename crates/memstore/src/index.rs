//! Primary index with an asynchronous-indexer model.
//!
//! The index keeps its own copy of the documents it has seen, tagged with the
//! bucket write sequence it last caught up to. Writes do not reach the index
//! until [`PrimaryIndex::catch_up`] runs, which is what makes `NotBounded`
//! scans observe stale data and `RequestPlus` scans (which catch up first)
//! observe every completed write.

use docfix_core::JsonObject;
use std::collections::BTreeMap;

/// When the indexer applies pending writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexerMode {
    /// Only on `RequestPlus` scans or an explicit indexer run
    #[default]
    Lagging,
    /// Before every scan
    Immediate,
}

/// Build state of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// Created with `defer`, not yet built
    Deferred,
    /// Built and serving scans
    Online,
}

/// The primary index of one bucket.
#[derive(Debug)]
pub struct PrimaryIndex {
    state: IndexState,
    entries: BTreeMap<String, JsonObject>,
    indexed_seqno: u64,
}

impl PrimaryIndex {
    /// Create an index, deferred or online.
    pub fn new(defer: bool) -> Self {
        Self {
            state: if defer {
                IndexState::Deferred
            } else {
                IndexState::Online
            },
            entries: BTreeMap::new(),
            indexed_seqno: 0,
        }
    }

    /// Current build state.
    pub fn state(&self) -> IndexState {
        self.state
    }

    /// Move a deferred index online.
    pub fn build(&mut self) {
        self.state = IndexState::Online;
    }

    /// Sequence the index has caught up to.
    pub fn indexed_seqno(&self) -> u64 {
        self.indexed_seqno
    }

    /// Whether the index covers every write up to `seqno`.
    pub fn is_current(&self, seqno: u64) -> bool {
        self.indexed_seqno >= seqno
    }

    /// Apply all writes up to `seqno` from the live document set.
    pub fn catch_up<'a, I>(&mut self, live: I, seqno: u64)
    where
        I: IntoIterator<Item = (&'a String, &'a JsonObject)>,
    {
        if self.state != IndexState::Online || self.is_current(seqno) {
            return;
        }
        self.entries = live
            .into_iter()
            .map(|(id, content)| (id.clone(), content.clone()))
            .collect();
        self.indexed_seqno = seqno;
    }

    /// Drop every entry (bucket flush).
    pub fn clear(&mut self, seqno: u64) {
        self.entries.clear();
        self.indexed_seqno = seqno;
    }

    /// Indexed documents in key order.
    pub fn scan(&self) -> impl Iterator<Item = (&String, &JsonObject)> {
        self.entries.iter()
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no documents.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
