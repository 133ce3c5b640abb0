//! Storage engine data structures.

/// B-tree data structure implementation.
///
/// Copy-on-write index mapping byte keys to byte values, one node per page.
pub mod btree;
