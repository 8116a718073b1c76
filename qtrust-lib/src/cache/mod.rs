//! Path-addressed configuration cache with double-buffered reload.
//!
//! Objects live under slash-joined paths rooted at `Configuration`. A full
//! reload fills an auxiliary snapshot while readers keep using the
//! principal one, then swaps the two with a single pointer replacement.
//! Every operation names the snapshot it targets with an explicit
//! `in_aux` flag.
//!
//! Layers, bottom-up:
//!
//! - [`PathCache`]: the generic double-buffered path store.
//! - [`TslCache`]: typed access to the TSL object family.
//! - [`TslCacheFacade`]: what the validator and reload trigger use,
//!   falling back to a [`DurableStore`] on cache misses.

mod facade;
mod objects;
mod path_cache;
mod store;
mod tsl_cache;

pub use facade::TslCacheFacade;
pub use objects::{
    AssociationType, TslCacheObject, TslCountryRegion, TslCountryRegionMapping, TslData,
    TslDataRecord, TslLocationIndex,
};
pub use path_cache::{CacheEntry, PathCache, ROOT, SEPARATOR};
pub use store::{DurableStore, MemoryStore};
pub use tsl_cache::TslCache;

use crate::codes;

/// Errors raised by the cache layers and the durable store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Empty, unrooted or malformed path.
    #[error("[{}] bad cache path: {0}", codes::COD_155)]
    BadPath(String),

    #[error("[{code}] cache backend error: {source}")]
    Backend {
        code: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The durable store could not serve a request.
    #[error("[{}] durable store error: {0}", codes::COD_191)]
    Store(String),

    #[error("[{}] cache not initialized: {0}", codes::COD_191)]
    NotInitialized(String),
}

impl CacheError {
    pub fn code(&self) -> &'static str {
        match self {
            CacheError::BadPath(_) => codes::COD_155,
            CacheError::Backend { code, .. } => code,
            CacheError::Store(_) | CacheError::NotInitialized(_) => codes::COD_191,
        }
    }

    pub(crate) fn backend(message: impl Into<String>) -> Self {
        CacheError::Backend {
            code: codes::COD_154,
            source: message.into().into(),
        }
    }
}
