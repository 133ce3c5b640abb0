use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use super::node::NodeKind;

/// Snapshot of B-tree statistics at a point in time.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTreeStatsSnapshot {
    /// Number of keys added to a leaf
    pub inserts: u64,
    /// Number of existing keys whose value was replaced
    pub updates: u64,
    /// Number of leaf nodes split into two or three pages
    pub leaf_splits: u64,
    /// Number of internal nodes split into two or three pages
    pub internal_splits: u64,
    /// Number of splits that needed three pages
    pub three_way_splits: u64,
    /// Number of times the tree grew a level
    pub root_promotions: u64,
}

/// Thread-safe statistics tracking for B-tree operations.
#[derive(Default, Debug)]
pub struct BTreeStats {
    inserts: AtomicU64,
    updates: AtomicU64,
    leaf_splits: AtomicU64,
    internal_splits: AtomicU64,
    three_way_splits: AtomicU64,
    root_promotions: AtomicU64,
}

impl BTreeStats {
    /// Returns the current count of inserted keys.
    pub fn inserts(&self) -> u64 {
        self.inserts.load(AtomicOrdering::Relaxed)
    }

    /// Returns the current count of in-place value updates.
    pub fn updates(&self) -> u64 {
        self.updates.load(AtomicOrdering::Relaxed)
    }

    /// Returns the current count of leaf splits.
    pub fn leaf_splits(&self) -> u64 {
        self.leaf_splits.load(AtomicOrdering::Relaxed)
    }

    /// Returns the current count of internal node splits.
    pub fn internal_splits(&self) -> u64 {
        self.internal_splits.load(AtomicOrdering::Relaxed)
    }

    /// Returns the number of splits that produced three nodes.
    pub fn three_way_splits(&self) -> u64 {
        self.three_way_splits.load(AtomicOrdering::Relaxed)
    }

    /// Returns the number of root promotions.
    pub fn root_promotions(&self) -> u64 {
        self.root_promotions.load(AtomicOrdering::Relaxed)
    }

    pub(crate) fn inc_inserts(&self) {
        self.inserts.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_updates(&self) {
        self.updates.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub(crate) fn inc_root_promotions(&self) {
        self.root_promotions.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Records the outcome of one split; single-piece results are not splits.
    pub(crate) fn record_split(&self, kind: NodeKind, pieces: usize) {
        if pieces < 2 {
            return;
        }
        match kind {
            NodeKind::Leaf => self.leaf_splits.fetch_add(1, AtomicOrdering::Relaxed),
            NodeKind::Internal => self.internal_splits.fetch_add(1, AtomicOrdering::Relaxed),
        };
        if pieces == 3 {
            self.three_way_splits.fetch_add(1, AtomicOrdering::Relaxed);
        }
    }

    /// Creates a snapshot of all current statistics.
    pub fn snapshot(&self) -> BTreeStatsSnapshot {
        BTreeStatsSnapshot {
            inserts: self.inserts(),
            updates: self.updates(),
            leaf_splits: self.leaf_splits(),
            internal_splits: self.internal_splits(),
            three_way_splits: self.three_way_splits(),
            root_promotions: self.root_promotions(),
        }
    }

    /// Emits current statistics to the tracing infrastructure.
    pub fn emit_tracing(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            target: "kvtree::stats",
            inserts = snapshot.inserts,
            updates = snapshot.updates,
            leaf_splits = snapshot.leaf_splits,
            internal_splits = snapshot.internal_splits,
            three_way_splits = snapshot.three_way_splits,
            root_promotions = snapshot.root_promotions,
            "btree stats snapshot"
        );
    }
}
