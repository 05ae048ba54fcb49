//! Generic in-memory caching layer with lazy time-to-live expiry.
//!
//! This module provides a Monday-agnostic caching mechanism that:
//! - Stores one serialized payload per query key
//! - Serves a payload while it is younger than the configured TTL
//! - Refetches on the first read after expiry and overwrites the entry
//! - Reads time through an injected [`Clock`] so expiry is testable

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::MemoryStorage;
pub use traits::{CacheSource, Cacheable, Clock, QueryKey, SystemClock};
#[cfg(test)]
pub use traits::ManualClock;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("cache serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
  #[error("cache lock poisoned")]
  Poisoned,
}
