//! Cuts an oversized node into at most three page-sized siblings.
//!
//! Nodes reaching this module hold at most one page of entries plus one
//! inserted or updated entry, and every single entry fits a page on its own.
//! Under that bound a balanced two-way cut succeeds unless the new entry is
//! large and lands in the middle, in which case a greedy three-way partition
//! always fits.

use smallvec::{smallvec, SmallVec};

use super::append::append_range;
use super::node::{
    Node, NodeBuf, NodeKind, NodeRead, HEADER_LEN, OFFSET_LEN, PAGE_SIZE, POINTER_LEN,
};
use crate::types::{KvError, Result};

/// Pieces produced by [`split`], in key order.
pub type SplitNodes = SmallVec<[Node; 3]>;

/// Encoded size of a node holding entries `start..end` of `node`.
fn span_size<N: NodeRead + ?Sized>(node: &N, start: usize, end: usize) -> Result<usize> {
    let kv = node
        .offset(end)?
        .checked_sub(node.offset(start)?)
        .ok_or(KvError::Corruption("offsets not monotonic"))?;
    Ok(HEADER_LEN + (POINTER_LEN + OFFSET_LEN) * (end - start) + kv)
}

fn carve<N: NodeRead + ?Sized>(
    node: &N,
    kind: NodeKind,
    start: usize,
    end: usize,
) -> Result<Node> {
    let mut piece = NodeBuf::new(kind, end - start)?;
    append_range(&mut piece, node, 0, start, end - start)?;
    piece.freeze()
}

/// Split point minimizing the larger half, if some point makes both halves fit.
fn balanced_cut<N: NodeRead + ?Sized>(node: &N, n: usize) -> Result<Option<usize>> {
    let mut best: Option<(usize, usize)> = None;
    for at in 1..n {
        let larger = span_size(node, 0, at)?.max(span_size(node, at, n)?);
        if larger > PAGE_SIZE {
            continue;
        }
        if best.map_or(true, |(_, size)| larger < size) {
            best = Some((at, larger));
        }
    }
    Ok(best.map(|(at, _)| at))
}

/// Fewest page-sized runs, filling each run as far as it goes.
fn greedy_runs<N: NodeRead + ?Sized>(node: &N, n: usize) -> Result<Vec<(usize, usize)>> {
    let mut runs = Vec::with_capacity(3);
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        if span_size(node, start, end)? > PAGE_SIZE {
            return Err(KvError::Corruption("single entry exceeds page size"));
        }
        while end < n && span_size(node, start, end + 1)? <= PAGE_SIZE {
            end += 1;
        }
        runs.push((start, end));
        start = end;
    }
    Ok(runs)
}

/// Normalizes a freshly built node into 1–3 nodes that each fit a page.
///
/// Kind, key set and key order are preserved across the returned nodes.
pub fn split(node: NodeBuf) -> Result<SplitNodes> {
    let size = node.encoded_size()?;
    if size <= PAGE_SIZE {
        return Ok(smallvec![node.freeze()?]);
    }

    let kind = node.kind()?;
    let n = node.key_count();
    if n < 2 {
        return Err(KvError::Corruption("oversized node holds a single entry"));
    }

    if let Some(at) = balanced_cut(&node, n)? {
        tracing::trace!(
            target: "kvtree::split",
            size,
            keys = n,
            at,
            "split node in two"
        );
        return Ok(smallvec![
            carve(&node, kind, 0, at)?,
            carve(&node, kind, at, n)?
        ]);
    }

    let runs = greedy_runs(&node, n)?;
    if runs.len() > 3 {
        return Err(KvError::Corruption("node does not fit in three pages"));
    }
    tracing::trace!(
        target: "kvtree::split",
        size,
        keys = n,
        pieces = runs.len(),
        "split node in three"
    );
    runs.into_iter()
        .map(|(start, end)| carve(&node, kind, start, end))
        .collect()
}
