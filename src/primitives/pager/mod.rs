#![forbid(unsafe_code)]

mod memory;
mod store;

pub use memory::{MemPageStore, MemStoreOptions, MemStoreStats};
pub use store::PageStore;
