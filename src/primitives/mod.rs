//! Low-level primitives the tree core builds on.

/// Page storage contract and the in-memory store.
///
/// The tree core reaches durable storage only through the [`pager::PageStore`] trait.
pub mod pager;
