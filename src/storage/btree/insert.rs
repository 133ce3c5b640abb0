//! Recursive copy-on-write insert.
//!
//! Every step reads an immutable node and returns a freshly built one that
//! may span up to two pages. Children are split and persisted on the way
//! back up; the top-level result is left to the caller.

use std::cmp::Ordering;

use smallvec::SmallVec;

use super::append::{append_entry, append_range};
use super::leaf::{leaf_insert, leaf_update};
use super::lookup::lookup_floor;
use super::node::{Node, NodeBuf, NodeKind, NodeRead};
use super::split::split;
use super::stats::BTreeStats;
use crate::primitives::pager::PageStore;
use crate::types::{KvError, PageId, Result};

/// Runs inserts against one page store.
pub struct TreeWriter<'a, S: PageStore + ?Sized> {
    store: &'a S,
    stats: &'a BTreeStats,
    verify_on_read: bool,
}

impl<'a, S: PageStore + ?Sized> TreeWriter<'a, S> {
    /// Creates a writer recording into `stats`.
    pub fn new(store: &'a S, stats: &'a BTreeStats) -> Self {
        Self {
            store,
            stats,
            verify_on_read: false,
        }
    }

    /// Validates every node fetched from the store when enabled.
    pub fn verify_on_read(mut self, enabled: bool) -> Self {
        self.verify_on_read = enabled;
        self
    }

    /// Fetches a node from the store.
    pub fn fetch(&self, id: PageId) -> Result<Node> {
        let node = self.store.get_page(id)?;
        if self.verify_on_read {
            node.validate()?;
        }
        Ok(node)
    }

    /// Inserts or updates `key` below `node`, returning the rewritten node.
    pub fn tree_insert<N: NodeRead + ?Sized>(
        &self,
        node: &N,
        key: &[u8],
        val: &[u8],
    ) -> Result<NodeBuf> {
        let idx = lookup_floor(node, key)?;
        match node.kind()? {
            NodeKind::Leaf => {
                if node.key_count() == 0 {
                    self.stats.inc_inserts();
                    return leaf_insert(node, 0, key, val);
                }
                match node.key(idx)?.cmp(key) {
                    Ordering::Equal => {
                        self.stats.inc_updates();
                        leaf_update(node, idx, key, val)
                    }
                    Ordering::Less => {
                        self.stats.inc_inserts();
                        leaf_insert(node, idx + 1, key, val)
                    }
                    // Only entry 0 can sort after the key: it becomes the new lower bound.
                    Ordering::Greater => {
                        self.stats.inc_inserts();
                        leaf_insert(node, idx, key, val)
                    }
                }
            }
            NodeKind::Internal => self.node_insert(node, idx, key, val),
        }
    }

    fn node_insert<N: NodeRead + ?Sized>(
        &self,
        node: &N,
        idx: usize,
        key: &[u8],
        val: &[u8],
    ) -> Result<NodeBuf> {
        if node.key_count() == 0 {
            return Err(KvError::Corruption("internal node without children"));
        }
        let child_id = node.pointer(idx)?;
        let child = self.fetch(child_id)?;
        self.store.free_page(child_id)?;
        tracing::trace!(
            target: "kvtree::insert",
            child = child_id.0,
            slot = idx,
            "descending into child"
        );

        let updated = self.tree_insert(&child, key, val)?;
        let pieces = split(updated)?;
        self.stats.record_split(child.kind()?, pieces.len());
        self.replace_child(node, idx, &pieces)
    }

    /// Rebuilds `parent` with slot `idx` replaced by one entry per node in `children`.
    ///
    /// Each child is persisted first; the new entries point at the allocated
    /// ids and carry the child's first key as separator.
    pub fn replace_child<N: NodeRead + ?Sized>(
        &self,
        parent: &N,
        idx: usize,
        children: &[Node],
    ) -> Result<NodeBuf> {
        let n = parent.key_count();
        if idx >= n {
            return Err(KvError::OutOfRange {
                field: "child slot",
                index: idx,
                bound: n,
            });
        }
        if children.is_empty() || children.len() > 3 {
            return Err(KvError::Invalid("child replacement takes one to three nodes"));
        }

        let mut ids: SmallVec<[PageId; 3]> = SmallVec::new();
        for child in children {
            ids.push(self.store.alloc_page(child)?);
        }

        let k = children.len();
        let mut new = NodeBuf::new(NodeKind::Internal, n - 1 + k)?;
        append_range(&mut new, parent, 0, 0, idx)?;
        for (i, (child, id)) in children.iter().zip(ids.iter()).enumerate() {
            append_entry(&mut new, idx + i, *id, child.key(0)?, &[])?;
        }
        append_range(&mut new, parent, idx + k, idx + 1, n - idx - 1)?;
        Ok(new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::pager::MemPageStore;
    use crate::storage::btree::node::PAGE_SIZE;

    fn leaf_of(entries: &[(&str, &str)]) -> Node {
        let mut buf = NodeBuf::new(NodeKind::Leaf, entries.len()).unwrap();
        for (idx, (key, val)) in entries.iter().enumerate() {
            append_entry(&mut buf, idx, PageId(0), key.as_bytes(), val.as_bytes()).unwrap();
        }
        buf.freeze().unwrap()
    }

    fn parent_of(store: &MemPageStore, children: &[Node]) -> Node {
        let mut buf = NodeBuf::new(NodeKind::Internal, children.len()).unwrap();
        for (idx, child) in children.iter().enumerate() {
            let id = store.alloc_page(child).unwrap();
            append_entry(&mut buf, idx, id, child.key(0).unwrap(), b"").unwrap();
        }
        buf.freeze().unwrap()
    }

    #[test]
    fn leaf_insert_then_update_keeps_one_entry() {
        let store = MemPageStore::default();
        let stats = BTreeStats::default();
        let writer = TreeWriter::new(&store, &stats);
        let once = writer.tree_insert(&Node::empty_leaf(), b"k", b"v1").unwrap();
        let twice = writer.tree_insert(&once, b"k", b"v2").unwrap();
        assert_eq!(twice.key_count(), 1);
        assert_eq!(twice.value(0).unwrap(), b"v2");
        assert_eq!(stats.inserts(), 1);
        assert_eq!(stats.updates(), 1);
    }

    #[test]
    fn smaller_key_becomes_first_entry() {
        let store = MemPageStore::default();
        let stats = BTreeStats::default();
        let writer = TreeWriter::new(&store, &stats);
        let leaf = leaf_of(&[("m", "1"), ("p", "2")]);
        let out = writer.tree_insert(&leaf, b"c", b"0").unwrap();
        assert_eq!(out.key(0).unwrap(), b"c");
        assert_eq!(out.key(1).unwrap(), b"m");
        out.validate().unwrap();
    }

    #[test]
    fn internal_insert_releases_child_and_allocates_replacement() {
        let store = MemPageStore::default();
        let stats = BTreeStats::default();
        let left = leaf_of(&[("a", "1"), ("b", "2")]);
        let right = leaf_of(&[("m", "3"), ("n", "4")]);
        let parent = parent_of(&store, &[left, right]);
        let old_right = parent.pointer(1).unwrap();

        let writer = TreeWriter::new(&store, &stats);
        let out = writer.tree_insert(&parent, b"o", b"5").unwrap();

        assert_eq!(out.key_count(), 2);
        assert_eq!(out.pointer(0).unwrap(), parent.pointer(0).unwrap());
        let new_right = out.pointer(1).unwrap();
        assert_ne!(new_right, old_right);
        assert_eq!(store.released_pages(), 1);
        let child = store.get_page(new_right).unwrap();
        assert_eq!(child.key_count(), 3);
        assert_eq!(child.key(2).unwrap(), b"o");
    }

    #[test]
    fn separator_tracks_new_lower_bound() {
        let store = MemPageStore::default();
        let stats = BTreeStats::default();
        let left = leaf_of(&[("d", "1")]);
        let right = leaf_of(&[("m", "2")]);
        let parent = parent_of(&store, &[left, right]);
        let writer = TreeWriter::new(&store, &stats);
        let out = writer.tree_insert(&parent, b"a", b"0").unwrap();
        assert_eq!(out.key(0).unwrap(), b"a");
        assert_eq!(out.key(1).unwrap(), b"m");
    }

    #[test]
    fn child_split_widens_parent() {
        let store = MemPageStore::default();
        let stats = BTreeStats::default();
        let payload = "x".repeat(1300);
        let left = leaf_of(&[
            ("a", payload.as_str()),
            ("b", payload.as_str()),
            ("c", payload.as_str()),
        ]);
        let right = leaf_of(&[("z", "")]);
        let parent = parent_of(&store, &[left, right]);
        let writer = TreeWriter::new(&store, &stats);
        let out = writer.tree_insert(&parent, b"d", payload.as_bytes()).unwrap();

        assert_eq!(out.key_count(), 3);
        assert_eq!(stats.leaf_splits(), 1);
        let mut keys = Vec::new();
        for i in 0..2 {
            let child = store.get_page(out.pointer(i).unwrap()).unwrap();
            assert!(child.encoded_size().unwrap() <= PAGE_SIZE);
            assert_eq!(child.key(0).unwrap(), out.key(i).unwrap());
            for j in 0..child.key_count() {
                keys.push(child.key(j).unwrap().to_vec());
            }
        }
        assert_eq!(
            keys,
            vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]
        );
    }

    #[test]
    fn replace_child_rejects_bad_arguments() {
        let store = MemPageStore::default();
        let stats = BTreeStats::default();
        let parent = parent_of(&store, &[leaf_of(&[("a", "")])]);
        let writer = TreeWriter::new(&store, &stats);
        assert!(matches!(
            writer.replace_child(&parent, 1, &[leaf_of(&[("a", "")])]),
            Err(KvError::OutOfRange { .. })
        ));
        assert!(matches!(
            writer.replace_child(&parent, 0, &[]),
            Err(KvError::Invalid(_))
        ));
    }

    #[test]
    fn missing_child_page_surfaces_error() {
        let store = MemPageStore::default();
        let stats = BTreeStats::default();
        let mut buf = NodeBuf::new(NodeKind::Internal, 1).unwrap();
        append_entry(&mut buf, 0, PageId(42), b"a", b"").unwrap();
        let parent = buf.freeze().unwrap();
        let writer = TreeWriter::new(&store, &stats);
        assert!(matches!(
            writer.tree_insert(&parent, b"b", b""),
            Err(KvError::PageNotFound(PageId(42)))
        ));
    }
}
