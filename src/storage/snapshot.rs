//! # Snapshots and Version Chains
//!
//! The page store keeps a short chain of committed versions per key so that
//! readers holding an older snapshot keep seeing the values they started
//! with while a writer commits new ones.
//!
//! ## Visibility
//!
//! A reader at snapshot `s` sees, for each key, the newest version whose
//! `txn_id <= s`. Snapshots are taken at the latest committed transaction,
//! so uncommitted writes are never visible.
//!
//! ```text
//! key "page_85":   (txn 3) -> (txn 7) -> (txn 12)
//!
//! snapshot 5   sees txn 3
//! snapshot 7   sees txn 7
//! snapshot 12  sees txn 12
//! ```
//!
//! ## Watermark
//!
//! The watermark is the oldest snapshot still registered, or the latest
//! committed transaction when no reader is active. For every key, the newest
//! version at or below the watermark is still needed; anything older can be
//! dropped.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use smallvec::SmallVec;

pub type TxnId = u64;

/// Active reader snapshots, counted per transaction id.
#[derive(Debug, Default)]
pub struct SnapshotRegistry {
    active: Mutex<BTreeMap<TxnId, usize>>,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, snapshot: TxnId) {
        *self.active.lock().entry(snapshot).or_insert(0) += 1;
    }

    pub fn release(&self, snapshot: TxnId) {
        let mut active = self.active.lock();
        if let Some(count) = active.get_mut(&snapshot) {
            *count -= 1;
            if *count == 0 {
                active.remove(&snapshot);
            }
        }
    }

    pub fn watermark(&self, committed: TxnId) -> TxnId {
        self.active
            .lock()
            .keys()
            .next()
            .map_or(committed, |&oldest| oldest.min(committed))
    }

    pub fn active_readers(&self) -> usize {
        self.active.lock().values().sum()
    }
}

/// Committed versions of one key, oldest first.
#[derive(Debug, Clone)]
pub struct VersionChain<T> {
    versions: SmallVec<[(TxnId, T); 2]>,
}

impl<T> VersionChain<T> {
    pub fn new(txn_id: TxnId, value: T) -> Self {
        let mut versions = SmallVec::new();
        versions.push((txn_id, value));
        Self { versions }
    }

    /// Adds a newer version. A second write by the same transaction replaces
    /// the first.
    pub fn push(&mut self, txn_id: TxnId, value: T) {
        match self.versions.last_mut() {
            Some((last, slot)) if *last == txn_id => *slot = value,
            _ => self.versions.push((txn_id, value)),
        }
    }

    pub fn latest(&self) -> Option<&T> {
        self.versions.last().map(|(_, v)| v)
    }

    pub fn latest_mut(&mut self) -> Option<&mut T> {
        self.versions.last_mut().map(|(_, v)| v)
    }

    pub fn latest_txn(&self) -> Option<TxnId> {
        self.versions.last().map(|(txn, _)| *txn)
    }

    pub fn visible(&self, snapshot: TxnId) -> Option<&T> {
        self.versions
            .iter()
            .rev()
            .find(|(txn, _)| *txn <= snapshot)
            .map(|(_, v)| v)
    }

    /// Drops versions no snapshot at or above `watermark` can see.
    pub fn prune(&mut self, watermark: TxnId) -> usize {
        let Some(keep_from) = self.versions.iter().rposition(|(txn, _)| *txn <= watermark) else {
            return 0;
        };
        self.versions.drain(..keep_from);
        keep_from
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_picks_newest_at_or_below_snapshot() {
        let mut chain = VersionChain::new(3, "a");
        chain.push(7, "b");
        chain.push(12, "c");

        assert_eq!(chain.visible(2), None);
        assert_eq!(chain.visible(5), Some(&"a"));
        assert_eq!(chain.visible(7), Some(&"b"));
        assert_eq!(chain.visible(100), Some(&"c"));
        assert_eq!(chain.latest_txn(), Some(12));
    }

    #[test]
    fn same_txn_replaces_value() {
        let mut chain = VersionChain::new(1, "a");
        chain.push(2, "b");
        chain.push(2, "c");

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.latest(), Some(&"c"));
    }

    #[test]
    fn prune_keeps_version_at_watermark() {
        let mut chain = VersionChain::new(3, "a");
        chain.push(7, "b");
        chain.push(12, "c");

        assert_eq!(chain.prune(8), 1);
        assert_eq!(chain.visible(8), Some(&"b"));
        assert_eq!(chain.len(), 2);

        assert_eq!(chain.prune(12), 1);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.prune(12), 0);
    }

    #[test]
    fn prune_below_oldest_is_noop() {
        let mut chain = VersionChain::new(5, "a");
        chain.push(6, "b");

        assert_eq!(chain.prune(1), 0);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn watermark_tracks_oldest_reader() {
        let registry = SnapshotRegistry::new();
        assert_eq!(registry.watermark(10), 10);

        registry.register(4);
        registry.register(4);
        registry.register(8);
        assert_eq!(registry.watermark(10), 4);
        assert_eq!(registry.active_readers(), 3);

        registry.release(4);
        assert_eq!(registry.watermark(10), 4);

        registry.release(4);
        assert_eq!(registry.watermark(10), 8);

        registry.release(8);
        assert_eq!(registry.watermark(10), 10);
        assert_eq!(registry.active_readers(), 0);
    }
}
