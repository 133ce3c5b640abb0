use std::sync::Arc;

use crate::storage::btree::Node;
use crate::types::{PageId, Result};

/// Page storage the tree core reads from and writes to.
///
/// A page's bytes never change after it is allocated. Implementations decide
/// when a released id may be reclaimed; the core only promises never to touch
/// an id again after releasing it.
pub trait PageStore {
    /// Returns the node previously persisted under `id`.
    fn get_page(&self, id: PageId) -> Result<Node>;
    /// Persists `node` under a fresh, never before assigned id.
    fn alloc_page(&self, node: &Node) -> Result<PageId>;
    /// Marks `id` as superseded.
    fn free_page(&self, id: PageId) -> Result<()>;
}

impl<T: PageStore + ?Sized> PageStore for Arc<T> {
    fn get_page(&self, id: PageId) -> Result<Node> {
        (**self).get_page(id)
    }

    fn alloc_page(&self, node: &Node) -> Result<PageId> {
        (**self).alloc_page(node)
    }

    fn free_page(&self, id: PageId) -> Result<()> {
        (**self).free_page(id)
    }
}
