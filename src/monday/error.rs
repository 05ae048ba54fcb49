use thiserror::Error;

use crate::cache::CacheError;

/// Failures talking to Monday.com
#[derive(Debug, Error)]
pub enum MondayError {
  /// Non-2xx HTTP status
  #[error("Monday API Error: Status {status} - {detail}")]
  Status { status: u16, detail: String },
  /// Network or protocol failure before a response body was read
  #[error("Monday API request failed: {0}")]
  Http(#[from] reqwest::Error),
  /// Structured GraphQL errors in an otherwise successful response
  #[error("{0}")]
  GraphQl(String),
  #[error("Failed to decode Monday response: {0}")]
  Decode(#[from] serde_json::Error),
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  InvalidInput(String),
  #[error(transparent)]
  Cache(#[from] CacheError),
  /// A later listing page failed after the board name was known
  #[error("{source}")]
  PartialListing {
    board_name: String,
    source: Box<MondayError>,
  },
}

impl MondayError {
  /// Board name captured before the failure, if any
  pub fn board_name(&self) -> Option<&str> {
    match self {
      Self::PartialListing { board_name, .. } => Some(board_name),
      _ => None,
    }
  }
}
