use crate::config::{Config, MondayConfig};
use crate::monday::api_types::{
  error_detail, ApiBoardsData, ApiChangeColumnsData, ApiChangeNameData, ApiEmailBoard,
  ApiItemsData, ApiItemsPage, ApiListingBoard, GraphqlRequest, GraphqlResponse,
};
use crate::monday::error::MondayError;
use crate::monday::types::{BoardItem, BoardItemWithColumns, BoardListing, ItemDetails};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sends one GraphQL request and returns the decoded envelope.
///
/// Implementations report HTTP-level failures as errors; GraphQL `errors` in
/// the envelope are left for [`MondayClient`] to interpret.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
  async fn send(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, MondayError>;
}

/// reqwest-backed transport for the Monday.com v2 endpoint
pub struct HttpTransport {
  http: reqwest::Client,
  url: String,
  api_key: Option<String>,
  api_version: String,
}

impl HttpTransport {
  pub fn new(config: &MondayConfig, api_key: Option<String>) -> Result<Self, MondayError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.request_timeout() {
      builder = builder.timeout(timeout);
    }

    Ok(Self {
      http: builder.build()?,
      url: config.api_url.clone(),
      api_key,
      api_version: config.api_version.clone(),
    })
  }
}

#[async_trait]
impl GraphqlTransport for HttpTransport {
  async fn send(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, MondayError> {
    let response = self
      .http
      .post(&self.url)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, self.api_key.as_deref().unwrap_or_default())
      .header("API-Version", &self.api_version)
      .json(request)
      .send()
      .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
      return Err(MondayError::Status {
        status: status.as_u16(),
        detail: error_detail(&body),
      });
    }

    Ok(serde_json::from_str(&body)?)
  }
}

/// Monday.com GraphQL client
#[derive(Clone)]
pub struct MondayClient {
  transport: Arc<dyn GraphqlTransport>,
}

impl MondayClient {
  pub fn new(config: &Config) -> Result<Self, MondayError> {
    let api_key = Config::get_api_key();
    if api_key.is_none() {
      warn!("MONDAY_API_KEY is not set; Monday requests will be rejected");
    }
    let transport = HttpTransport::new(&config.monday, api_key)?;
    Ok(Self::with_transport(Arc::new(transport)))
  }

  pub fn with_transport(transport: Arc<dyn GraphqlTransport>) -> Self {
    Self { transport }
  }

  /// Run a query and decode its `data`. `Ok(None)` when the response has no data.
  pub async fn query<T: DeserializeOwned>(
    &self,
    query: &str,
    variables: Value,
  ) -> Result<Option<T>, MondayError> {
    let request = GraphqlRequest::new(query, variables);
    let response = self.transport.send(&request).await?;

    if let Some(message) = response.error_summary() {
      warn!(error = %message, "Monday GraphQL errors");
      return Err(MondayError::GraphQl(message));
    }

    match response.data {
      None | Some(Value::Null) => {
        warn!("Monday response missing data field");
        Ok(None)
      }
      Some(data) => Ok(Some(serde_json::from_value(data)?)),
    }
  }

  /// Get every item of a board, following the page cursor until it runs out
  pub async fn get_board_listing(
    &self,
    board_id: &str,
    page_size: u32,
  ) -> Result<BoardListing, MondayError> {
    let query = format!(
      r#"query GetBoardItems($boardIdArray: [ID!]!, $cursor: String) {{
  boards(ids: $boardIdArray) {{
    name
    items_page(limit: {page_size}, cursor: $cursor) {{
      cursor
      items {{ id name }}
    }}
  }}
}}"#
    );

    let mut items = Vec::new();
    let mut board_name: Option<String> = None;
    let mut cursor: Option<String> = None;

    loop {
      let mut variables = json!({ "boardIdArray": [board_id] });
      if let Some(c) = &cursor {
        variables["cursor"] = json!(c);
      }

      let data: Option<ApiBoardsData<ApiListingBoard>> =
        match self.query(&query, variables).await {
          Ok(data) => data,
          Err(e) => {
            return Err(match board_name {
              Some(board_name) => MondayError::PartialListing {
                board_name,
                source: Box::new(e),
              },
              None => e,
            })
          }
        };
      let Some(board) = data.and_then(ApiBoardsData::into_first) else {
        warn!(board_id, "Board not found or no data when querying for items");
        return Ok(BoardListing::not_found(None));
      };

      if board_name.is_none() {
        board_name = board.name.filter(|n| !n.is_empty());
      }

      cursor = match board.items_page {
        Some(ApiItemsPage {
          cursor,
          items: Some(page),
        }) => {
          items.extend(page);
          cursor
        }
        _ => None,
      };

      debug!(board_id, fetched = items.len(), "fetched board page");
      if cursor.is_none() {
        break;
      }
    }

    info!(board_id, total = items.len(), "fetched board items");

    Ok(BoardListing {
      items,
      board_name: board_name.unwrap_or_else(|| BoardListing::UNKNOWN_NAME.to_string()),
      error: None,
    })
  }

  /// Get one page of a board's items with only `column_id` projected
  pub async fn get_column_page(
    &self,
    board_id: &str,
    column_id: &str,
    page_size: u32,
    cursor: Option<&str>,
  ) -> Result<Option<ApiItemsPage<BoardItemWithColumns>>, MondayError> {
    let query = format!(
      r#"query GetBoardItemsWithColumn($boardIdArray: [ID!]!, $cursor: String, $columnIds: [String!]) {{
  boards(ids: $boardIdArray) {{
    items_page(limit: {page_size}, cursor: $cursor) {{
      cursor
      items {{
        id
        name
        column_values(ids: $columnIds) {{ id text value type }}
      }}
    }}
  }}
}}"#
    );

    let mut variables = json!({
      "boardIdArray": [board_id],
      "columnIds": [column_id],
    });
    if let Some(c) = cursor {
      variables["cursor"] = json!(c);
    }

    let data: Option<ApiBoardsData<ApiEmailBoard>> = self.query(&query, variables).await?;
    Ok(
      data
        .and_then(ApiBoardsData::into_first)
        .and_then(|board| board.items_page),
    )
  }

  /// Get one item with all column values and its board's column schema
  pub async fn get_item_details(&self, item_id: &str) -> Result<ItemDetails, MondayError> {
    const QUERY: &str = r#"query GetItemDetailsById($itemIdArray: [ID!]!) {
  items(ids: $itemIdArray) {
    id
    name
    board {
      id
      columns { id title type settings_str }
    }
    column_values { id text type value }
  }
}"#;

    let data: Option<ApiItemsData> = self
      .query(QUERY, json!({ "itemIdArray": [item_id] }))
      .await?;

    let item = data
      .and_then(|d| d.items)
      .and_then(|items| items.into_iter().next())
      .ok_or_else(|| MondayError::NotFound(format!("Item with ID {} not found.", item_id)))?;

    Ok(item.into())
  }

  /// Rename an item. `Ok(None)` when the mutation ran without confirming.
  pub async fn change_item_name(
    &self,
    item_id: &str,
    board_id: &str,
    item_name: &str,
  ) -> Result<Option<BoardItem>, MondayError> {
    const MUTATION: &str = r#"mutation ($itemId: ID!, $boardId: ID!, $itemName: String!) {
  change_simple_column_value(item_id: $itemId, board_id: $boardId, column_id: "name", value: $itemName) {
    id
    name
  }
}"#;

    let data: Option<ApiChangeNameData> = self
      .query(
        MUTATION,
        json!({ "itemId": item_id, "boardId": board_id, "itemName": item_name }),
      )
      .await?;

    Ok(data.and_then(|d| d.change_simple_column_value))
  }

  /// Set several column values at once. `column_values` is sent as a JSON
  /// string in the remote's per-type encoding.
  pub async fn change_column_values(
    &self,
    item_id: i64,
    board_id: i64,
    column_values: &serde_json::Map<String, Value>,
  ) -> Result<Option<BoardItem>, MondayError> {
    const MUTATION: &str = r#"mutation ($itemId: ID!, $boardId: ID!, $columnValuesJson: JSON!) {
  change_multiple_column_values(
    item_id: $itemId,
    board_id: $boardId,
    column_values: $columnValuesJson,
    create_labels_if_missing: true
  ) {
    id
    name
  }
}"#;

    let column_values_json = serde_json::to_string(column_values)?;
    let data: Option<ApiChangeColumnsData> = self
      .query(
        MUTATION,
        json!({
          "itemId": item_id,
          "boardId": board_id,
          "columnValuesJson": column_values_json,
        }),
      )
      .await?;

    Ok(data.and_then(|d| d.change_multiple_column_values))
  }
}


#[cfg(test)]
mod tests {
  use super::testing::*;
  use super::*;
  use crate::monday::api_types::GraphqlError;

  #[tokio::test]
  async fn test_listing_collects_all_pages_in_order() {
    let stub = StubTransport::new();
    stub.push_data(listing_page("Tenants", 0..3, Some("c1")));
    stub.push_data(listing_page("Tenants", 3..5, Some("c2")));
    stub.push_data(listing_page("Tenants", 5..7, None));

    let listing = stub.client().get_board_listing("42", 3).await.unwrap();

    let ids: Vec<String> = listing.items.iter().map(|i| i.id.clone()).collect();
    let expected: Vec<String> = (0..7).map(|i| i.to_string()).collect();
    assert_eq!(ids, expected);
    assert_eq!(listing.board_name, "Tenants");
    assert_eq!(listing.error, None);
    assert_eq!(stub.call_count(), 3);

    let requests = stub.requests();
    assert!(requests[0].query.contains("limit: 3"));
    assert_eq!(requests[0].variables.as_ref().unwrap().get("cursor"), None);
    assert_eq!(
      requests[1].variables.as_ref().unwrap()["cursor"],
      json!("c1")
    );
    assert_eq!(
      requests[2].variables.as_ref().unwrap()["cursor"],
      json!("c2")
    );
  }

  #[tokio::test]
  async fn test_listing_empty_last_page_terminates_on_cursor() {
    let stub = StubTransport::new();
    stub.push_data(listing_page("B", 0..2, Some("c1")));
    stub.push_data(listing_page("B", 0..0, None));

    let listing = stub.client().get_board_listing("1", 2).await.unwrap();
    assert_eq!(listing.items.len(), 2);
    assert_eq!(stub.call_count(), 2);
  }

  #[tokio::test]
  async fn test_listing_name_taken_from_first_page_that_has_one() {
    let stub = StubTransport::new();
    stub.push_data(json!({
      "boards": [{ "name": null, "items_page": { "cursor": "c1", "items": [] } }]
    }));
    stub.push_data(listing_page("Later", 0..1, None));

    let listing = stub.client().get_board_listing("1", 25).await.unwrap();
    assert_eq!(listing.board_name, "Later");
  }

  #[tokio::test]
  async fn test_listing_failure_after_first_page_keeps_board_name() {
    let stub = StubTransport::new();
    stub.push_data(listing_page("Tenants", 0..2, Some("c1")));
    stub.push_response(Err(MondayError::GraphQl("Rate limit".into())));

    let err = stub.client().get_board_listing("1", 2).await.unwrap_err();
    assert_eq!(err.board_name(), Some("Tenants"));
    assert_eq!(err.to_string(), "Rate limit");
  }

  #[tokio::test]
  async fn test_listing_failure_on_first_page_has_no_board_name() {
    let stub = StubTransport::new();
    stub.push_response(Err(MondayError::GraphQl("Not Authenticated".into())));

    let err = stub.client().get_board_listing("1", 2).await.unwrap_err();
    assert!(matches!(err, MondayError::GraphQl(_)));
    assert_eq!(err.board_name(), None);
  }

  #[tokio::test]
  async fn test_listing_missing_board_is_terminal_not_found() {
    let stub = StubTransport::new();
    stub.push_data(json!({ "boards": [] }));

    let listing = stub.client().get_board_listing("404", 25).await.unwrap();
    assert!(listing.items.is_empty());
    assert_eq!(listing.board_name, "N/A");
    assert_eq!(
      listing.error.as_deref(),
      Some("Board not found or no data returned.")
    );
  }

  #[tokio::test]
  async fn test_listing_missing_data_is_not_found() {
    let stub = StubTransport::new();
    stub.push_response(Ok(GraphqlResponse::default()));

    let listing = stub.client().get_board_listing("1", 25).await.unwrap();
    assert!(listing.error.is_some());
  }

  #[tokio::test]
  async fn test_graphql_errors_become_error() {
    let stub = StubTransport::new();
    stub.push_response(Ok(GraphqlResponse {
      data: Some(json!({ "boards": [] })),
      errors: Some(vec![GraphqlError {
        message: "Complexity budget exhausted".into(),
        locations: None,
      }]),
      error_message: None,
    }));

    let err = stub.client().get_board_listing("1", 25).await.unwrap_err();
    assert!(matches!(err, MondayError::GraphQl(ref m) if m == "Complexity budget exhausted"));
  }

  #[tokio::test]
  async fn test_transport_error_mid_pagination_propagates() {
    let stub = StubTransport::new();
    stub.push_data(listing_page("B", 0..2, Some("c1")));
    stub.push_response(Err(MondayError::Status {
      status: 502,
      detail: "Bad Gateway".into(),
    }));

    let err = stub.client().get_board_listing("1", 2).await.unwrap_err();
    assert_eq!(err.to_string(), "Monday API Error: Status 502 - Bad Gateway");
  }

  #[tokio::test]
  async fn test_item_details_not_found() {
    let stub = StubTransport::new();
    stub.push_data(json!({ "items": [] }));

    let err = stub.client().get_item_details("7").await.unwrap_err();
    assert!(matches!(err, MondayError::NotFound(_)));
  }

  #[tokio::test]
  async fn test_item_details_includes_board_columns() {
    let stub = StubTransport::new();
    stub.push_data(json!({
      "items": [{
        "id": "7",
        "name": "Unit 4B",
        "board": {
          "id": "42",
          "columns": [
            { "id": "email", "title": "Tenant Email", "type": "email", "settings_str": "{}" },
            { "id": "date4", "title": "Move In", "type": "date", "settings_str": "{}" }
          ]
        },
        "column_values": [
          { "id": "email", "text": "jane@example.com", "type": "email", "value": "{\"email\":\"jane@example.com\"}" },
          { "id": "date4", "text": null, "type": "date", "value": "{\"date\":\"2024-02-01\"}" },
          { "id": "people", "text": "", "type": "people", "value": "{\"personsAndTeams\":[]}" },
          { "id": "status", "text": null, "type": "status", "value": "{\"index\":5}" }
        ]
      }]
    }));

    let details = stub.client().get_item_details("7").await.unwrap();
    assert_eq!(details.item.name, "Unit 4B");
    assert_eq!(details.board_columns.len(), 2);
    assert_eq!(details.board_columns[1].title, "Move In");

    // Column text and value come back exactly as the remote sent them
    let columns = &details.item.column_values;
    assert_eq!(columns[1].text, None);
    assert_eq!(columns[2].text.as_deref(), Some(""));
    assert_eq!(columns[2].value.as_deref(), Some("{\"personsAndTeams\":[]}"));
    assert_eq!(columns[3].text, None);
    assert_eq!(columns[3].value.as_deref(), Some("{\"index\":5}"));
    assert_eq!(
      stub.requests()[0].variables,
      Some(json!({ "itemIdArray": ["7"] }))
    );
  }

  #[tokio::test]
  async fn test_change_column_values_sends_json_string_and_numeric_ids() {
    let stub = StubTransport::new();
    stub.push_data(json!({ "change_multiple_column_values": { "id": "7", "name": "Unit 4B" } }));

    let mut columns = serde_json::Map::new();
    columns.insert("date4".into(), json!({ "date": "2024-02-01" }));

    let updated = stub
      .client()
      .change_column_values(7, 42, &columns)
      .await
      .unwrap();
    assert_eq!(updated.unwrap().id, "7");

    let variables = stub.requests()[0].variables.clone().unwrap();
    assert_eq!(variables["itemId"], json!(7));
    assert_eq!(variables["boardId"], json!(42));
    assert_eq!(
      variables["columnValuesJson"],
      json!(r#"{"date4":{"date":"2024-02-01"}}"#)
    );
  }
}
