use serde::{Deserialize, Serialize};

use crate::cache::Cacheable;

/// Board item as listed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardItem {
  pub id: String,
  pub name: String,
}

/// One column's value on an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnValue {
  pub id: String,
  pub text: Option<String>,
  #[serde(rename = "type")]
  pub column_type: String,
  /// JSON-encoded payload whose shape depends on `column_type`
  pub value: Option<String>,
}

/// Board item with a projection of its column values
#[derive(Debug, Clone, Deserialize)]
pub struct BoardItemWithColumns {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub column_values: Vec<ColumnValue>,
}

impl BoardItemWithColumns {
  pub fn column(&self, column_id: &str) -> Option<&ColumnValue> {
    self.column_values.iter().find(|cv| cv.id == column_id)
  }

  pub fn to_item(&self) -> BoardItem {
    BoardItem {
      id: self.id.clone(),
      name: self.name.clone(),
    }
  }
}

/// Full listing of a board, as cached and as returned by the listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardListing {
  pub items: Vec<BoardItem>,
  #[serde(rename = "boardName")]
  pub board_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl BoardListing {
  pub const UNKNOWN_NAME: &'static str = "N/A";
  pub const NOT_FOUND_MESSAGE: &'static str = "Board not found or no data returned.";

  /// Terminal result for a board the remote does not know about
  pub fn not_found(message: Option<String>) -> Self {
    Self {
      items: Vec::new(),
      board_name: Self::UNKNOWN_NAME.to_string(),
      error: Some(message.unwrap_or_else(|| Self::NOT_FOUND_MESSAGE.to_string())),
    }
  }
}

impl Cacheable for BoardListing {
  fn entity_type() -> &'static str {
    "board_listing"
  }

  fn is_cacheable(&self) -> bool {
    self.error.is_none()
  }
}

/// Column schema entry of a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardColumn {
  pub id: String,
  pub title: String,
  #[serde(rename = "type")]
  pub column_type: String,
  pub settings_str: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemBoard {
  pub id: String,
  #[serde(default)]
  pub columns: Vec<BoardColumn>,
}

/// Item with every column value and its parent board's schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDetail {
  pub id: String,
  pub name: String,
  pub board: Option<ItemBoard>,
  #[serde(default)]
  pub column_values: Vec<ColumnValue>,
}

/// Item details response payload
#[derive(Debug, Clone, Serialize)]
pub struct ItemDetails {
  pub item: ItemDetail,
  #[serde(rename = "boardColumns")]
  pub board_columns: Vec<BoardColumn>,
}

impl From<ItemDetail> for ItemDetails {
  fn from(item: ItemDetail) -> Self {
    let board_columns = item
      .board
      .as_ref()
      .map(|b| b.columns.clone())
      .unwrap_or_default();
    Self {
      item,
      board_columns,
    }
  }
}

/// Requested changes to an item
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
  pub item_name: Option<String>,
  /// Column id to remote-encoded value, e.g. `{"date": "2024-01-31"}`
  pub column_values: serde_json::Map<String, serde_json::Value>,
}

impl ItemUpdate {
  pub fn is_empty(&self) -> bool {
    self.item_name.is_none() && self.column_values.is_empty()
  }
}

/// Result of applying an [`ItemUpdate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
  /// At least one mutation was confirmed; holds the last confirmation
  Updated(BoardItem),
  /// Nothing was requested, nothing was sent
  NoChanges,
  /// Mutations ran but none came back confirmed
  Unconfirmed,
}
