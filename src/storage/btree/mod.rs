#![forbid(unsafe_code)]

//! Copy-on-write B-tree over fixed-size pages.

/// On-disk node layout and accessors.
pub mod node;

mod append;
mod insert;
mod leaf;
mod lookup;
mod split;
mod stats;
mod tree;

pub use append::{append_entry, append_range};
pub use insert::TreeWriter;
pub use leaf::{leaf_insert, leaf_update};
pub use lookup::lookup_floor;
pub use node::{
    Node, NodeBuf, NodeKind, NodeRead, HEADER_LEN, MAX_KEY_SIZE, MAX_VAL_SIZE, PAGE_SIZE,
};
pub use split::{split, SplitNodes};
pub use stats::{BTreeStats, BTreeStatsSnapshot};
pub use tree::{BTree, BTreeOptions, TreeReport};
