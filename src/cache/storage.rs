//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::traits::Cacheable;
use super::CacheError;

/// A single cached payload.
#[derive(Debug, Clone)]
pub struct CachedEntry<T> {
  /// The cached payload
  pub payload: T,
  /// When the payload was fetched
  pub fetched_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Store a payload under `key`, replacing whatever was there.
  fn store<T: Cacheable>(&self, key: &str, payload: &T, fetched_at: DateTime<Utc>)
    -> Result<(), CacheError>;

  /// Get the payload stored under `key`, regardless of age.
  fn get<T: Cacheable>(&self, key: &str) -> Result<Option<CachedEntry<T>>, CacheError>;

  /// Drop the payload stored under `key`.
  fn remove(&self, key: &str);
}

#[derive(Debug, Clone)]
struct StoredRow {
  entity_type: &'static str,
  data: String,
  fetched_at: DateTime<Utc>,
}

/// Process-local storage. Payloads are kept as serialized JSON rows keyed by
/// query hash; at most one row exists per key.
#[derive(Default)]
pub struct MemoryStorage {
  rows: Mutex<HashMap<String, StoredRow>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
  }
}

impl CacheStorage for MemoryStorage {
  fn store<T: Cacheable>(
    &self,
    key: &str,
    payload: &T,
    fetched_at: DateTime<Utc>,
  ) -> Result<(), CacheError> {
    let row = StoredRow {
      entity_type: T::entity_type(),
      data: serde_json::to_string(payload)?,
      fetched_at,
    };

    let mut rows = self.rows.lock().map_err(|_| CacheError::Poisoned)?;
    rows.insert(key.to_string(), row);
    Ok(())
  }

  fn get<T: Cacheable>(&self, key: &str) -> Result<Option<CachedEntry<T>>, CacheError> {
    let row = {
      let rows = self.rows.lock().map_err(|_| CacheError::Poisoned)?;
      match rows.get(key) {
        Some(row) if row.entity_type == T::entity_type() => row.clone(),
        _ => return Ok(None),
      }
    };

    Ok(Some(CachedEntry {
      payload: serde_json::from_str(&row.data)?,
      fetched_at: row.fetched_at,
    }))
  }

  fn remove(&self, key: &str) {
    if let Ok(mut rows) = self.rows.lock() {
      rows.remove(key);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::{Deserialize, Serialize};

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Widget {
    name: String,
  }

  impl Cacheable for Widget {
    fn entity_type() -> &'static str {
      "widget"
    }
  }

  #[derive(Debug, Clone, Serialize, Deserialize)]
  struct Gadget {
    name: String,
  }

  impl Cacheable for Gadget {
    fn entity_type() -> &'static str {
      "gadget"
    }
  }

  #[test]
  fn test_store_overwrites_existing_key() {
    let storage = MemoryStorage::new();
    let t0 = Utc::now();
    let t1 = t0 + chrono::Duration::seconds(10);

    storage.store("k", &Widget { name: "old".into() }, t0).unwrap();
    storage.store("k", &Widget { name: "new".into() }, t1).unwrap();

    let entry = storage.get::<Widget>("k").unwrap().unwrap();
    assert_eq!(entry.payload.name, "new");
    assert_eq!(entry.fetched_at, t1);
    assert_eq!(storage.len(), 1);
  }

  #[test]
  fn test_get_with_other_entity_type_misses() {
    let storage = MemoryStorage::new();
    storage
      .store("k", &Widget { name: "w".into() }, Utc::now())
      .unwrap();

    assert!(storage.get::<Gadget>("k").unwrap().is_none());
  }

  #[test]
  fn test_remove() {
    let storage = MemoryStorage::new();
    storage
      .store("k", &Widget { name: "w".into() }, Utc::now())
      .unwrap();
    storage.remove("k");
    assert!(storage.get::<Widget>("k").unwrap().is_none());
  }
}
