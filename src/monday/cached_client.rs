//! Monday client with a time-to-live cache in front of board listings.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{CacheLayer, CacheSource, Clock, MemoryStorage};
use crate::config::Config;

use super::cache::MondayQueryKey;
use super::client::MondayClient;
use super::error::MondayError;
use super::types::{BoardListing, ItemDetails, ItemUpdate, UpdateOutcome};

/// Monday client with transparent caching of board listings.
///
/// Listings are cached per board id; item details and email scans always go
/// to the remote. Successful updates drop the cached listing of their board.
#[derive(Clone)]
pub struct CachedMondayClient {
  inner: MondayClient,
  cache: CacheLayer<MemoryStorage>,
  listing_page_size: u32,
}

impl CachedMondayClient {
  pub fn new(inner: MondayClient, config: &Config, clock: Arc<dyn Clock>) -> Self {
    let cache = CacheLayer::new(MemoryStorage::new())
      .with_ttl(config.cache.ttl())
      .with_clock(clock);

    Self {
      inner,
      cache,
      listing_page_size: config.monday.listing_page_size,
    }
  }

  /// Get every item of a board, served from cache while fresh.
  ///
  /// A board the remote does not know comes back as a listing with `error`
  /// set; that result is not cached.
  pub async fn get_board_items(&self, board_id: &str) -> Result<BoardListing, MondayError> {
    let query_key = MondayQueryKey::BoardItems {
      board_id: board_id.to_string(),
    };

    let result = self
      .cache
      .fetch(&query_key, || {
        let inner = self.inner.clone();
        let page_size = self.listing_page_size;
        async move { inner.get_board_listing(board_id, page_size).await }
      })
      .await?;

    if result.source == CacheSource::Cache {
      debug!(
        board_id,
        items = result.data.items.len(),
        "serving cached board items"
      );
    }

    Ok(result.data)
  }

  /// Get item details (not cached).
  pub async fn get_item_details(&self, item_id: &str) -> Result<ItemDetails, MondayError> {
    self.inner.get_item_details(item_id).await
  }

  /// Apply a name change and/or column changes to an item (not cached - write operation).
  ///
  /// Each part is a separate mutation. Any confirmed mutation makes the whole
  /// update a success.
  pub async fn update_item_details(
    &self,
    item_id: &str,
    board_id: &str,
    update: &ItemUpdate,
  ) -> Result<UpdateOutcome, MondayError> {
    if update.is_empty() {
      return Ok(UpdateOutcome::NoChanges);
    }

    // Column mutations need numeric ids; reject bad ones before anything is sent.
    let column_ids = if update.column_values.is_empty() {
      None
    } else {
      Some((parse_id("item", item_id)?, parse_id("board", board_id)?))
    };

    let mut last_confirmed = None;

    if let Some(name) = &update.item_name {
      match self.inner.change_item_name(item_id, board_id, name).await? {
        Some(item) => {
          info!(item_id, "item name updated");
          self.invalidate_board(board_id);
          last_confirmed = Some(item);
        }
        None => warn!(item_id, "name update ran but was not confirmed"),
      }
    }

    if let Some((numeric_item, numeric_board)) = column_ids {
      match self
        .inner
        .change_column_values(numeric_item, numeric_board, &update.column_values)
        .await?
      {
        Some(item) => {
          info!(item_id, columns = update.column_values.len(), "column values updated");
          self.invalidate_board(board_id);
          last_confirmed = Some(item);
        }
        None => warn!(item_id, "column update ran but was not confirmed"),
      }
    }

    Ok(match last_confirmed {
      Some(item) => UpdateOutcome::Updated(item),
      None => UpdateOutcome::Unconfirmed,
    })
  }

  /// Forget the cached listing for a board.
  pub fn invalidate_board(&self, board_id: &str) {
    self.cache.invalidate(&MondayQueryKey::BoardItems {
      board_id: board_id.to_string(),
    });
  }
}

fn parse_id(kind: &str, id: &str) -> Result<i64, MondayError> {
  id.trim()
    .parse()
    .map_err(|_| MondayError::InvalidInput(format!("Invalid {} id: {:?}", kind, id)))
}
