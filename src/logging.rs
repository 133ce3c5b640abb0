//! Tracing subscriber setup.
//!
//! Events are emitted under the `kvtree::insert`, `kvtree::split`,
//! `kvtree::root`, `kvtree::pager`, `kvtree::verify` and `kvtree::stats`
//! targets.

use tracing_subscriber::{fmt, EnvFilter};

use crate::types::{KvError, Result};

/// Installs a global `fmt` subscriber filtered by `filter` (e.g. `"kvtree=debug"`).
pub fn init_logging(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(filter).map_err(|_| KvError::Invalid("invalid log filter"))?;
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| KvError::Invalid("logging already initialized"))
}
