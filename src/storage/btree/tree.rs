use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::append::append_entry;
use super::insert::TreeWriter;
use super::lookup::lookup_floor;
use super::node::{Node, NodeBuf, NodeKind, NodeRead, MAX_KEY_SIZE, MAX_VAL_SIZE};
use super::split::split;
use super::stats::BTreeStats;
use crate::primitives::pager::PageStore;
use crate::types::{KvError, PageId, Result};

/// Configuration knobs for the B-tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BTreeOptions {
    /// Optional root page ID for an existing tree
    pub root_page: Option<PageId>,
    /// Whether to run full structural validation on every fetched node
    pub verify_on_read: bool,
}

/// Shape of a tree as observed by [`BTree::verify`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeReport {
    /// Number of levels, leaves included; 0 for an empty tree.
    pub depth: usize,
    /// Total nodes reachable from the root.
    pub nodes: usize,
    /// Leaf nodes reachable from the root.
    pub leaves: usize,
    /// Key/value pairs stored across all leaves.
    pub entries: usize,
}

/// Handle to one copy-on-write tree.
///
/// Only the root id is held here; node contents live in the page store.
/// Every insert produces a new root id, and trees rooted at earlier ids stay
/// readable for as long as the store retains their pages.
pub struct BTree {
    root: Option<PageId>,
    options: BTreeOptions,
    stats: Arc<BTreeStats>,
}

fn check_limits(key: &[u8], val: &[u8]) -> Result<()> {
    if key.len() > MAX_KEY_SIZE {
        return Err(KvError::KeyTooLarge {
            len: key.len(),
            max: MAX_KEY_SIZE,
        });
    }
    if val.len() > MAX_VAL_SIZE {
        return Err(KvError::ValueTooLarge {
            len: val.len(),
            max: MAX_VAL_SIZE,
        });
    }
    Ok(())
}

impl BTree {
    /// Opens a handle on `options.root_page`, or an empty tree when unset.
    pub fn new(options: BTreeOptions) -> Self {
        Self {
            root: options.root_page,
            options,
            stats: Arc::new(BTreeStats::default()),
        }
    }

    /// Current root page, `None` while the tree is empty.
    pub fn root_page(&self) -> Option<PageId> {
        self.root
    }

    /// Options the handle was opened with.
    pub fn options(&self) -> &BTreeOptions {
        &self.options
    }

    /// Shared statistics for this tree.
    pub fn stats(&self) -> Arc<BTreeStats> {
        Arc::clone(&self.stats)
    }

    fn writer<'a, S: PageStore + ?Sized>(&'a self, store: &'a S) -> TreeWriter<'a, S> {
        TreeWriter::new(store, &self.stats).verify_on_read(self.options.verify_on_read)
    }

    /// Inserts `key` or replaces its value.
    ///
    /// Keys above [`MAX_KEY_SIZE`] and values above [`MAX_VAL_SIZE`] are
    /// rejected before any page is touched. The superseded root is released
    /// once the new root is persisted.
    pub fn insert<S: PageStore + ?Sized>(
        &mut self,
        store: &S,
        key: &[u8],
        val: &[u8],
    ) -> Result<()> {
        check_limits(key, val)?;
        let writer = self.writer(store);
        let updated = match self.root {
            None => writer.tree_insert(&Node::empty_leaf(), key, val)?,
            Some(root_id) => {
                let root = writer.fetch(root_id)?;
                writer.tree_insert(&root, key, val)?
            }
        };
        let new_root = self.install_root(store, updated)?;
        if let Some(old_root) = self.root.replace(new_root) {
            store.free_page(old_root)?;
        }
        Ok(())
    }

    /// Splits the rewritten root and persists it, growing a level when needed.
    fn install_root<S: PageStore + ?Sized>(
        &self,
        store: &S,
        updated: NodeBuf,
    ) -> Result<PageId> {
        let kind = updated.kind()?;
        let pieces = split(updated)?;
        self.stats.record_split(kind, pieces.len());
        if pieces.len() == 1 {
            return store.alloc_page(&pieces[0]);
        }

        let mut root = NodeBuf::new(NodeKind::Internal, pieces.len())?;
        for (idx, piece) in pieces.iter().enumerate() {
            let id = store.alloc_page(piece)?;
            append_entry(&mut root, idx, id, piece.key(0)?, &[])?;
        }
        let root_id = store.alloc_page(&root.freeze()?)?;
        self.stats.inc_root_promotions();
        tracing::debug!(
            target: "kvtree::root",
            root = root_id.0,
            children = pieces.len(),
            "promoted new root"
        );
        Ok(root_id)
    }

    /// Looks up the value stored for `key`.
    pub fn get<S: PageStore + ?Sized>(&self, store: &S, key: &[u8]) -> Result<Option<Bytes>> {
        let Some(mut current) = self.root else {
            return Ok(None);
        };
        let writer = self.writer(store);
        loop {
            let node = writer.fetch(current)?;
            if node.key_count() == 0 {
                return Ok(None);
            }
            let idx = lookup_floor(&node, key)?;
            match node.kind()? {
                NodeKind::Leaf => {
                    return if node.key(idx)? == key {
                        Ok(Some(node.value_bytes(idx)?))
                    } else {
                        Ok(None)
                    };
                }
                NodeKind::Internal => current = node.pointer(idx)?,
            }
        }
    }

    /// Walks the whole tree checking structure, ordering and separators.
    pub fn verify<S: PageStore + ?Sized>(&self, store: &S) -> Result<TreeReport> {
        let mut report = TreeReport::default();
        let Some(root) = self.root else {
            return Ok(report);
        };
        let mut leaf_depth = None;
        verify_node(store, root, None, None, 1, &mut leaf_depth, &mut report)?;
        report.depth = leaf_depth.unwrap_or(0);
        tracing::debug!(
            target: "kvtree::verify",
            depth = report.depth,
            nodes = report.nodes,
            entries = report.entries,
            "verified tree"
        );
        Ok(report)
    }
}

fn verify_node<S: PageStore + ?Sized>(
    store: &S,
    id: PageId,
    lower: Option<&[u8]>,
    upper: Option<&[u8]>,
    depth: usize,
    leaf_depth: &mut Option<usize>,
    report: &mut TreeReport,
) -> Result<()> {
    let node = store.get_page(id)?;
    node.validate()?;
    let n = node.key_count();
    if n == 0 {
        return Err(KvError::Corruption("tree node without entries"));
    }
    if let Some(lower) = lower {
        if node.key(0)? != lower {
            return Err(KvError::Corruption("separator differs from child first key"));
        }
    }
    if let Some(upper) = upper {
        if node.key(n - 1)? >= upper {
            return Err(KvError::Corruption("child key reaches next separator"));
        }
    }
    report.nodes += 1;

    match node.kind()? {
        NodeKind::Leaf => {
            match *leaf_depth {
                Some(expected) if expected != depth => {
                    return Err(KvError::Corruption("leaves at different depths"));
                }
                Some(_) => {}
                None => *leaf_depth = Some(depth),
            }
            report.leaves += 1;
            report.entries += n;
        }
        NodeKind::Internal => {
            for idx in 0..n {
                let next = if idx + 1 < n {
                    Some(node.key(idx + 1)?)
                } else {
                    upper
                };
                verify_node(
                    store,
                    node.pointer(idx)?,
                    Some(node.key(idx)?),
                    next,
                    depth + 1,
                    leaf_depth,
                    report,
                )?;
            }
        }
    }
    Ok(())
}
