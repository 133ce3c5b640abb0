use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::store::PageStore;
use crate::storage::btree::{Node, NodeRead};
use crate::types::{KvError, PageId, Result};

/// Tuning knobs for [`MemPageStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemStoreOptions {
    /// Keep released pages readable until [`MemPageStore::reclaim`], so
    /// trees rooted at older root ids stay intact.
    pub retain_released: bool,
    /// Maximum number of live pages; `None` means unbounded.
    pub max_pages: Option<usize>,
}

impl Default for MemStoreOptions {
    fn default() -> Self {
        Self {
            retain_released: true,
            max_pages: None,
        }
    }
}

/// Counters reported by [`MemPageStore::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemStoreStats {
    /// Pages returned by `get_page`.
    pub reads: u64,
    /// Pages persisted by `alloc_page`.
    pub allocations: u64,
    /// Pages marked superseded by `free_page`.
    pub releases: u64,
    /// Released pages dropped by `reclaim`.
    pub reclaimed: u64,
}

struct Inner {
    live: FxHashMap<PageId, Node>,
    released: FxHashMap<PageId, Node>,
    next_page: PageId,
    stats: MemStoreStats,
}

/// Page store keeping every node in memory.
///
/// Ids are handed out monotonically starting at 1 and never reused.
pub struct MemPageStore {
    options: MemStoreOptions,
    inner: Mutex<Inner>,
}

impl MemPageStore {
    /// Creates an empty store.
    pub fn new(options: MemStoreOptions) -> Self {
        Self {
            options,
            inner: Mutex::new(Inner {
                live: FxHashMap::default(),
                released: FxHashMap::default(),
                next_page: PageId(1),
                stats: MemStoreStats::default(),
            }),
        }
    }

    /// Options the store was created with.
    pub fn options(&self) -> &MemStoreOptions {
        &self.options
    }

    /// Number of pages allocated and not yet released.
    pub fn live_pages(&self) -> usize {
        self.inner.lock().live.len()
    }

    /// Number of released pages still held for older snapshots.
    pub fn released_pages(&self) -> usize {
        self.inner.lock().released.len()
    }

    /// Ids of all live pages in ascending order.
    pub fn live_page_ids(&self) -> Vec<PageId> {
        let mut ids: Vec<PageId> = self.inner.lock().live.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Drops every released page, returning how many were dropped.
    pub fn reclaim(&self) -> usize {
        let mut inner = self.inner.lock();
        let count = inner.released.len();
        inner.released.clear();
        inner.stats.reclaimed += count as u64;
        tracing::trace!(target: "kvtree::pager", count, "reclaimed released pages");
        count
    }

    /// Returns a snapshot of the store counters.
    pub fn stats(&self) -> MemStoreStats {
        self.inner.lock().stats
    }
}

impl Default for MemPageStore {
    fn default() -> Self {
        Self::new(MemStoreOptions::default())
    }
}

impl PageStore for MemPageStore {
    fn get_page(&self, id: PageId) -> Result<Node> {
        let mut inner = self.inner.lock();
        let node = match inner.live.get(&id) {
            Some(node) => node.clone(),
            None => inner
                .released
                .get(&id)
                .cloned()
                .ok_or(KvError::PageNotFound(id))?,
        };
        inner.stats.reads += 1;
        Ok(node)
    }

    fn alloc_page(&self, node: &Node) -> Result<PageId> {
        let mut inner = self.inner.lock();
        if let Some(limit) = self.options.max_pages {
            if inner.live.len() >= limit {
                return Err(KvError::StoreFull { limit });
            }
        }
        let id = inner.next_page;
        inner.next_page = PageId(id.0 + 1);
        inner.live.insert(id, node.clone());
        inner.stats.allocations += 1;
        tracing::trace!(
            target: "kvtree::pager",
            page = id.0,
            keys = node.key_count(),
            "allocated page"
        );
        Ok(id)
    }

    fn free_page(&self, id: PageId) -> Result<()> {
        let mut inner = self.inner.lock();
        let node = inner.live.remove(&id).ok_or(KvError::PageNotFound(id))?;
        if self.options.retain_released {
            inner.released.insert(id, node);
        }
        inner.stats.releases += 1;
        tracing::trace!(target: "kvtree::pager", page = id.0, "released page");
        Ok(())
    }
}
