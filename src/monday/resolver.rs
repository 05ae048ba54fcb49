//! Email-to-item resolution against the configured board.

use tracing::{debug, info};

use crate::config::MondayConfig;

use super::client::MondayClient;
use super::column::ColumnPayload;
use super::error::MondayError;
use super::types::{BoardItem, BoardItemWithColumns};

/// Outcome of an email lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailMatch {
  Found(BoardItem),
  NotFound { message: String },
}

/// Finds the board item whose email column holds a given address.
///
/// Every lookup pages through the board from the start; nothing is cached
/// between calls. Scanning stops at the first match.
#[derive(Clone)]
pub struct EmailResolver {
  client: MondayClient,
  board_id: String,
  column_id: String,
  page_size: u32,
}

impl EmailResolver {
  pub fn new(client: MondayClient, config: &MondayConfig) -> Self {
    Self {
      client,
      board_id: config.board_id.clone(),
      column_id: config.email_column_id.clone(),
      page_size: config.email_page_size,
    }
  }

  /// Look up `email` (trimmed, case-insensitive).
  ///
  /// A blank address is rejected before any remote call. A failure on any
  /// page aborts the lookup.
  pub async fn find_item_by_email(&self, email: &str) -> Result<EmailMatch, MondayError> {
    let target = normalize_email(email);
    if target.is_empty() {
      return Err(MondayError::InvalidInput(
        "Email query parameter is required.".to_string(),
      ));
    }

    info!(
      email = %target,
      board_id = %self.board_id,
      column_id = %self.column_id,
      "searching board for email"
    );

    let mut cursor: Option<String> = None;
    let mut scanned = 0usize;

    loop {
      let Some(page) = self
        .client
        .get_column_page(
          &self.board_id,
          &self.column_id,
          self.page_size,
          cursor.as_deref(),
        )
        .await?
      else {
        break;
      };

      let Some(items) = page.items else {
        break;
      };

      for item in &items {
        scanned += 1;
        if item_matches(item, &self.column_id, &target) {
          info!(email = %target, item_id = %item.id, "email matched item");
          return Ok(EmailMatch::Found(item.to_item()));
        }
      }

      debug!(scanned, "email not on page");
      cursor = page.cursor;
      if cursor.is_none() {
        break;
      }
    }

    info!(email = %target, scanned, "no item found for email");
    Ok(EmailMatch::NotFound {
      message: format!("No item found for {}.", target),
    })
  }
}

pub fn normalize_email(email: &str) -> String {
  email.trim().to_lowercase()
}

/// Whether `item`'s `column_id` column holds `target` (already normalized).
///
/// The plain-text rendering is checked first, then the structured value;
/// either one matching is enough.
pub fn item_matches(item: &BoardItemWithColumns, column_id: &str, target: &str) -> bool {
  let Some(column) = item.column(column_id) else {
    return false;
  };

  if column
    .text
    .as_deref()
    .is_some_and(|text| normalize_email(text) == target)
  {
    return true;
  }

  ColumnPayload::from_column(column)
    .as_ref()
    .and_then(ColumnPayload::email_candidate)
    .is_some_and(|email| normalize_email(email) == target)
}
