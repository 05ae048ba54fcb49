//! Serde types matching Monday.com GraphQL request and response shapes.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{BoardItem, BoardItemWithColumns, ItemDetail};

// ============================================================================
// Envelope
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct GraphqlRequest {
  pub query: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub variables: Option<Value>,
}

impl GraphqlRequest {
  /// Build a request; empty variable objects are left out of the body.
  pub fn new(query: impl Into<String>, variables: Value) -> Self {
    let empty = match &variables {
      Value::Null => true,
      Value::Object(map) => map.is_empty(),
      _ => false,
    };
    Self {
      query: query.into(),
      variables: (!empty).then_some(variables),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphqlError {
  #[serde(default)]
  pub message: String,
  pub locations: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphqlResponse {
  pub data: Option<Value>,
  pub errors: Option<Vec<GraphqlError>>,
  pub error_message: Option<String>,
}

impl GraphqlResponse {
  pub fn with_data(data: Value) -> Self {
    Self {
      data: Some(data),
      ..Default::default()
    }
  }

  /// Joined GraphQL error messages plus the first error's first location.
  pub fn error_summary(&self) -> Option<String> {
    let errors = self.errors.as_ref().filter(|e| !e.is_empty())?;

    let mut message = errors
      .iter()
      .map(|e| e.message.as_str())
      .collect::<Vec<_>>()
      .join("; ");

    if let Some(location) = errors[0].locations.as_ref().and_then(|l| l.first()) {
      message.push_str(&format!(" (Location: {})", location));
    }

    Some(message)
  }
}

/// Best human-readable detail from a non-2xx body: GraphQL messages, then
/// `error_message`, then the raw text.
pub fn error_detail(body: &str) -> String {
  match serde_json::from_str::<GraphqlResponse>(body) {
    Ok(parsed) => {
      if let Some(errors) = parsed.errors.filter(|e| !e.is_empty()) {
        errors
          .iter()
          .map(|e| e.message.as_str())
          .collect::<Vec<_>>()
          .join("; ")
      } else if let Some(message) = parsed.error_message {
        message
      } else {
        body.to_string()
      }
    }
    Err(_) => body.to_string(),
  }
}

// ============================================================================
// Board pages
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiBoardsData<B> {
  pub boards: Option<Vec<B>>,
}

impl<B> ApiBoardsData<B> {
  pub fn into_first(self) -> Option<B> {
    self.boards.and_then(|b| b.into_iter().next())
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiItemsPage<I> {
  pub cursor: Option<String>,
  pub items: Option<Vec<I>>,
}

#[derive(Debug, Deserialize)]
pub struct ApiListingBoard {
  pub name: Option<String>,
  pub items_page: Option<ApiItemsPage<BoardItem>>,
}

#[derive(Debug, Deserialize)]
pub struct ApiEmailBoard {
  pub items_page: Option<ApiItemsPage<BoardItemWithColumns>>,
}

// ============================================================================
// Items
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiItemsData {
  pub items: Option<Vec<ItemDetail>>,
}

#[derive(Debug, Deserialize)]
pub struct ApiChangeNameData {
  pub change_simple_column_value: Option<BoardItem>,
}

#[derive(Debug, Deserialize)]
pub struct ApiChangeColumnsData {
  pub change_multiple_column_values: Option<BoardItem>,
}
