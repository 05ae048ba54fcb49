use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  routing::{get, post},
  Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::missive::panel::{Conversation, PanelState};
use crate::monday::resolver::EmailMatch;
use crate::monday::types::{BoardItem, BoardListing, ItemDetails, ItemUpdate, UpdateOutcome};
use crate::search::search_items;

use super::error::{ApiError, ApiResult};
use super::AppState;

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/api/get-items-for-board/{board_id}", get(get_items_for_board))
    .route("/api/get-item-details/{item_id}", get(get_item_details))
    .route("/api/update-item-details/{item_id}", post(update_item_details))
    .route("/api/find-item-by-email", get(find_item_by_email))
    .route("/api/missive/panel", post(panel_event))
    .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
  status: &'static str,
}

async fn health() -> Json<HealthResponse> {
  Json(HealthResponse { status: "ok" })
}

#[derive(Debug, Deserialize)]
struct ListingQuery {
  q: Option<String>,
}

async fn get_items_for_board(
  Path(board_id): Path<String>,
  Query(query): Query<ListingQuery>,
  State(state): State<AppState>,
) -> (StatusCode, Json<BoardListing>) {
  match state.monday.get_board_items(&board_id).await {
    Ok(mut listing) => {
      if let Some(term) = query.q.as_deref() {
        listing.items = search_items(&listing.items, term)
          .into_iter()
          .cloned()
          .collect();
      }
      (StatusCode::OK, Json(listing))
    }
    Err(e) => {
      error!(board_id = %board_id, error = %e, "failed to fetch board items");
      let listing = BoardListing {
        items: Vec::new(),
        board_name: e
          .board_name()
          .unwrap_or(BoardListing::UNKNOWN_NAME)
          .to_string(),
        error: Some(format!(
          "Server error while fetching items for board {}: {}",
          board_id, e
        )),
      };
      (StatusCode::INTERNAL_SERVER_ERROR, Json(listing))
    }
  }
}

async fn get_item_details(
  Path(item_id): Path<String>,
  State(state): State<AppState>,
) -> ApiResult<Json<ItemDetails>> {
  let details = state
    .monday
    .get_item_details(&item_id)
    .await
    .map_err(|e| {
      ApiError::from_monday(
        e,
        &format!("Server error while fetching details for item {}", item_id),
      )
    })?;

  Ok(Json(details))
}

#[derive(Debug, Deserialize)]
struct UpdateItemRequest {
  #[serde(rename = "boardId", default, deserialize_with = "deserialize_opt_id")]
  board_id: Option<String>,
  #[serde(rename = "itemName")]
  item_name: Option<String>,
  column_values: Option<Map<String, Value>>,
}

/// Ids arrive as strings or numbers depending on the caller
fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let v: Option<Value> = Option::deserialize(deserializer)?;
  Ok(match v {
    Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
    Some(Value::Number(n)) => Some(n.to_string()),
    _ => None,
  })
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
  success: bool,
  message: String,
  #[serde(rename = "updatedItem", skip_serializing_if = "Option::is_none")]
  updated_item: Option<BoardItem>,
}

async fn update_item_details(
  Path(item_id): Path<String>,
  State(state): State<AppState>,
  Json(body): Json<UpdateItemRequest>,
) -> ApiResult<Json<UpdateResponse>> {
  let board_id = body
    .board_id
    .ok_or_else(|| ApiError::BadRequest("Missing boardId in request body.".to_string()))?;

  let update = ItemUpdate {
    item_name: body.item_name,
    column_values: body.column_values.unwrap_or_default(),
  };

  info!(
    item_id = %item_id,
    board_id = %board_id,
    rename = update.item_name.is_some(),
    columns = update.column_values.len(),
    "updating item"
  );

  let outcome = state
    .monday
    .update_item_details(&item_id, &board_id, &update)
    .await
    .map_err(|e| {
      error!(item_id = %item_id, error = %e, "item update failed");
      ApiError::from_monday(e, "Server error while updating item details")
    })?;

  match outcome {
    UpdateOutcome::Updated(item) => Ok(Json(UpdateResponse {
      success: true,
      message: "Item details updated successfully.".to_string(),
      updated_item: Some(item),
    })),
    UpdateOutcome::NoChanges => Ok(Json(UpdateResponse {
      success: true,
      message: "No changes were requested.".to_string(),
      updated_item: None,
    })),
    UpdateOutcome::Unconfirmed => Err(ApiError::Unconfirmed {
      message: "Update sent, but confirmation from Monday.com was missing or indicated an issue."
        .to_string(),
      details: None,
    }),
  }
}

#[derive(Debug, Deserialize)]
struct EmailQuery {
  email: Option<String>,
}

#[derive(Debug, Serialize)]
struct FindItemResponse {
  item: Option<BoardItem>,
  #[serde(skip_serializing_if = "Option::is_none")]
  message: Option<String>,
}

async fn find_item_by_email(
  Query(query): Query<EmailQuery>,
  State(state): State<AppState>,
) -> ApiResult<Json<FindItemResponse>> {
  let email = query.email.unwrap_or_default();

  let found = state
    .resolver
    .find_item_by_email(&email)
    .await
    .map_err(|e| ApiError::from_monday(e, "Server error while searching for item by email"))?;

  Ok(Json(match found {
    EmailMatch::Found(item) => FindItemResponse {
      item: Some(item),
      message: None,
    },
    EmailMatch::NotFound { message } => FindItemResponse {
      item: None,
      message: Some(message),
    },
  }))
}

/// Event posted by the browser-side panel script
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum PanelEventRequest {
  ConversationsChanged {
    ids: Vec<String>,
    #[serde(default)]
    conversations: Vec<Conversation>,
  },
  EmailSelected {
    email: String,
  },
}

async fn panel_event(
  State(state): State<AppState>,
  Json(body): Json<PanelEventRequest>,
) -> Json<PanelState> {
  let panel_state = match body {
    PanelEventRequest::ConversationsChanged { ids, conversations } => {
      state.panel.conversations_changed(ids, conversations).await
    }
    PanelEventRequest::EmailSelected { email } => state.panel.email_selected(email).await,
  };
  Json(panel_state)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::ManualClock;
  use crate::config::Config;
  use crate::monday::cached_client::CachedMondayClient;
  use crate::monday::client::testing::{listing_page, StubTransport};
  use crate::missive::panel::PanelHandle;
  use crate::monday::resolver::EmailResolver;
  use axum::body::Body;
  use axum::http::Request;
  use chrono::Utc;
  use serde_json::json;
  use std::sync::Arc;
  use tower::ServiceExt;

  fn app(stub: &Arc<StubTransport>) -> Router {
    let config = Config::default();
    let client = stub.client();
    let resolver = EmailResolver::new(client.clone(), &config.monday);
    let state = AppState {
      monday: CachedMondayClient::new(client, &config, Arc::new(ManualClock::new(Utc::now()))),
      panel: PanelHandle::spawn(resolver.clone()),
      resolver,
    };
    router(state)
  }

  async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
  }

  fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
      .method("POST")
      .uri(uri)
      .header("content-type", "application/json")
      .body(Body::from(body.to_string()))
      .unwrap()
  }

  #[tokio::test]
  async fn test_health() {
    let stub = StubTransport::new();
    let (status, body) = call(app(&stub), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
  }

  #[tokio::test]
  async fn test_listing_ok_and_filtered() {
    let stub = StubTransport::new();
    stub.push_data(listing_page("Tenants", 0..12, None));
    let app = app(&stub);

    let (status, body) = call(app.clone(), get("/api/get-items-for-board/42")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["boardName"], json!("Tenants"));
    assert_eq!(body["items"].as_array().unwrap().len(), 12);
    assert!(body.get("error").is_none());

    let (_, body) = call(app, get("/api/get-items-for-board/42?q=item%201")).await;
    let names: Vec<&str> = body["items"]
      .as_array()
      .unwrap()
      .iter()
      .map(|i| i["name"].as_str().unwrap())
      .collect();
    assert_eq!(names, vec!["Item 1", "Item 10", "Item 11"]);
    assert_eq!(stub.call_count(), 1);
  }

  #[tokio::test]
  async fn test_listing_board_not_found_is_200_with_error() {
    let stub = StubTransport::new();
    stub.push_data(json!({ "boards": [] }));

    let (status, body) = call(app(&stub), get("/api/get-items-for-board/404")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      body,
      json!({ "items": [], "boardName": "N/A", "error": "Board not found or no data returned." })
    );
  }

  #[tokio::test]
  async fn test_listing_remote_failure_is_500() {
    let stub = StubTransport::new();
    stub.push_response(Err(crate::monday::error::MondayError::GraphQl(
      "Not Authenticated".into(),
    )));

    let (status, body) = call(app(&stub), get("/api/get-items-for-board/42")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
      body["error"],
      json!("Server error while fetching items for board 42: Not Authenticated")
    );
    assert_eq!(body["items"], json!([]));
  }

  #[tokio::test]
  async fn test_listing_later_page_failure_reports_board_name() {
    let stub = StubTransport::new();
    stub.push_data(listing_page("Tenants", 0..2, Some("c1")));
    stub.push_response(Err(crate::monday::error::MondayError::GraphQl(
      "Complexity budget exhausted".into(),
    )));

    let (status, body) = call(app(&stub), get("/api/get-items-for-board/42")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["boardName"], json!("Tenants"));
    assert_eq!(body["items"], json!([]));
    assert_eq!(
      body["error"],
      json!("Server error while fetching items for board 42: Complexity budget exhausted")
    );
  }

  #[tokio::test]
  async fn test_item_details_404() {
    let stub = StubTransport::new();
    stub.push_data(json!({ "items": [] }));

    let (status, body) = call(app(&stub), get("/api/get-item-details/7")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Item with ID 7 not found."));
  }

  #[tokio::test]
  async fn test_update_requires_board_id() {
    let stub = StubTransport::new();
    let (status, body) = call(
      app(&stub),
      post_json("/api/update-item-details/7", json!({ "itemName": "x" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Missing boardId in request body."));
    assert_eq!(stub.call_count(), 0);
  }

  #[tokio::test]
  async fn test_update_no_changes() {
    let stub = StubTransport::new();
    let (status, body) = call(
      app(&stub),
      post_json("/api/update-item-details/7", json!({ "boardId": 42 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      body,
      json!({ "success": true, "message": "No changes were requested." })
    );
    assert_eq!(stub.call_count(), 0);
  }

  #[tokio::test]
  async fn test_update_columns_confirmed() {
    let stub = StubTransport::new();
    stub.push_data(json!({ "change_multiple_column_values": { "id": "7", "name": "Unit 7" } }));

    let (status, body) = call(
      app(&stub),
      post_json(
        "/api/update-item-details/7",
        json!({ "boardId": "42", "column_values": { "date4": { "date": "2024-03-01" } } }),
      ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["updatedItem"], json!({ "id": "7", "name": "Unit 7" }));
  }

  #[tokio::test]
  async fn test_update_unconfirmed_is_500() {
    let stub = StubTransport::new();
    stub.push_data(json!({ "change_simple_column_value": null }));

    let (status, body) = call(
      app(&stub),
      post_json(
        "/api/update-item-details/7",
        json!({ "boardId": "42", "itemName": "New" }),
      ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
      .as_str()
      .unwrap()
      .starts_with("Update sent, but confirmation"));
    assert_eq!(body["details"], Value::Null);
  }

  #[tokio::test]
  async fn test_find_by_email_requires_email() {
    let stub = StubTransport::new();
    let (status, body) = call(app(&stub), get("/api/find-item-by-email")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Email query parameter is required."));
    assert_eq!(stub.call_count(), 0);
  }

  #[tokio::test]
  async fn test_find_by_email_match_and_miss() {
    let stub = StubTransport::new();
    let page = json!({
      "boards": [{ "items_page": { "cursor": null, "items": [{
        "id": "9",
        "name": "Unit 9",
        "column_values": [{ "id": "email", "text": null, "value": "{\"email\":\"jane@example.com\"}", "type": "email" }]
      }] } }]
    });
    stub.push_data(page.clone());
    stub.push_data(page);
    let app = app(&stub);

    let (status, body) = call(
      app.clone(),
      get("/api/find-item-by-email?email=JANE%40example.com%20"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "item": { "id": "9", "name": "Unit 9" } }));

    let (_, body) = call(app, get("/api/find-item-by-email?email=bob%40example.com")).await;
    assert_eq!(
      body,
      json!({ "item": null, "message": "No item found for bob@example.com." })
    );
  }

  #[tokio::test]
  async fn test_panel_event_lists_addresses() {
    let stub = StubTransport::new();
    let (status, body) = call(
      app(&stub),
      post_json(
        "/api/missive/panel",
        json!({
          "event": "conversations_changed",
          "ids": ["c1"],
          "conversations": [{
            "id": "c1",
            "email_addresses": ["a@x.com", { "address": "b@x.com" }, "a@x.com"],
            "latest_message": { "subject": "Hello" }
          }]
        }),
      ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      body,
      json!({ "state": "email_options", "emails": ["a@x.com", "b@x.com"], "subject": "Hello" })
    );
  }

  #[tokio::test]
  async fn test_panel_email_selection_resolves_item() {
    let stub = StubTransport::new();
    stub.push_data(json!({
      "boards": [{ "items_page": { "cursor": null, "items": [] } }]
    }));

    let (status, body) = call(
      app(&stub),
      post_json(
        "/api/missive/panel",
        json!({ "event": "email_selected", "email": "nobody@x.com" }),
      ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      body,
      json!({ "state": "unmatched", "message": "No item found for nobody@x.com." })
    );
  }
}
