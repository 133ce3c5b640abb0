//! Shared identifiers and the crate-wide error type.

#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a persisted page. Id `0` is never assigned by a page store.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub u64);

impl PageId {
    /// Returns true for the reserved null id.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PageId {
    fn from(value: u64) -> Self {
        PageId(value)
    }
}

impl From<PageId> for u64 {
    fn from(value: PageId) -> Self {
        value.0
    }
}

/// Errors raised by the tree core and its page stores.
#[derive(Debug, Error)]
pub enum KvError {
    /// A node buffer does not decode per the on-disk layout.
    #[error("corruption: {0}")]
    Corruption(&'static str),
    /// An accessor was called with an index past the node's key count.
    #[error("{field} index {index} out of range (bound {bound})")]
    OutOfRange {
        /// Which array was addressed.
        field: &'static str,
        /// Requested index.
        index: usize,
        /// Exclusive upper bound for the index.
        bound: usize,
    },
    /// A node larger than one page was about to be persisted.
    #[error("node of {size} bytes exceeds page limit of {limit} bytes")]
    Oversized {
        /// Encoded size of the node.
        size: usize,
        /// Maximum persisted size.
        limit: usize,
    },
    /// Key longer than the on-disk maximum.
    #[error("key of {len} bytes exceeds maximum of {max}")]
    KeyTooLarge {
        /// Length of the rejected key.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },
    /// Value longer than the on-disk maximum.
    #[error("value of {len} bytes exceeds maximum of {max}")]
    ValueTooLarge {
        /// Length of the rejected value.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },
    /// The page store has no page with this id.
    #[error("page {0} not found")]
    PageNotFound(PageId),
    /// The page store refused to allocate another page.
    #[error("page store full ({limit} pages)")]
    StoreFull {
        /// Configured page limit.
        limit: usize,
    },
    /// Caller misuse that is neither corruption nor a capacity violation.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KvError>;
