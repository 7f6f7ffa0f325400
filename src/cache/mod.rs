//! Client-side caching and local persistence.
//!
//! This module provides:
//! - The page index stitched together from successive feed windows
//! - A transport layer replaying remembered bodies when the server answers 304
//! - A small key-value store for state that outlives the process

mod layer;
mod pagination;
mod storage;
mod traits;

pub use layer::ResponseCacheLayer;
pub use pagination::{FeedMetadata, PaginationCache, PaginationState, DEFAULT_PAGE_SIZE};
pub use storage::SqliteStore;
#[cfg(test)]
pub use storage::MemoryStore;
pub use traits::KeyValueStore;

#[cfg(test)]
pub(crate) use pagination::tests::job;
