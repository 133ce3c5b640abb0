use super::append::{append_entry, append_range};
use super::node::{NodeBuf, NodeKind, NodeRead};
use crate::types::{KvError, PageId, Result};

fn ensure_leaf<N: NodeRead + ?Sized>(node: &N) -> Result<()> {
    match node.kind()? {
        NodeKind::Leaf => Ok(()),
        NodeKind::Internal => Err(KvError::Invalid("leaf rewrite applied to an internal node")),
    }
}

/// Builds a copy of `old` with `(key, val)` inserted as entry `idx`.
///
/// The result may exceed one page; the caller hands it to the split engine.
pub fn leaf_insert<N: NodeRead + ?Sized>(
    old: &N,
    idx: usize,
    key: &[u8],
    val: &[u8],
) -> Result<NodeBuf> {
    ensure_leaf(old)?;
    let n = old.key_count();
    if idx > n {
        return Err(KvError::OutOfRange {
            field: "insert position",
            index: idx,
            bound: n + 1,
        });
    }
    let mut new = NodeBuf::new(NodeKind::Leaf, n + 1)?;
    append_range(&mut new, old, 0, 0, idx)?;
    append_entry(&mut new, idx, PageId(0), key, val)?;
    append_range(&mut new, old, idx + 1, idx, n - idx)?;
    Ok(new)
}

/// Builds a copy of `old` with entry `idx` replaced by `(key, val)`.
pub fn leaf_update<N: NodeRead + ?Sized>(
    old: &N,
    idx: usize,
    key: &[u8],
    val: &[u8],
) -> Result<NodeBuf> {
    ensure_leaf(old)?;
    let n = old.key_count();
    if idx >= n {
        return Err(KvError::OutOfRange {
            field: "update position",
            index: idx,
            bound: n,
        });
    }
    let mut new = NodeBuf::new(NodeKind::Leaf, n)?;
    append_range(&mut new, old, 0, 0, idx)?;
    append_entry(&mut new, idx, PageId(0), key, val)?;
    append_range(&mut new, old, idx + 1, idx + 1, n - idx - 1)?;
    Ok(new)
}
