//! Copy-on-write B-tree core for a single-file key-value store.

#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod primitives;
pub mod storage;
pub mod types;
