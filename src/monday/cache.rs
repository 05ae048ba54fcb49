//! Cache keys for Monday queries.

use sha2::{Digest, Sha256};

use crate::cache::QueryKey;

/// Query key types for cached Monday calls.
#[derive(Clone, Debug)]
pub enum MondayQueryKey {
  /// Full `{id, name}` listing of a board
  BoardItems { board_id: String },
}

impl QueryKey for MondayQueryKey {
  fn cache_hash(&self) -> String {
    let input = match self {
      Self::BoardItems { board_id } => format!("board_{}", board_id),
    };

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    match self {
      Self::BoardItems { board_id } => format!("board {} items", board_id),
    }
  }
}
