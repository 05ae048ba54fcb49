use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::monday::error::MondayError;

#[derive(Error, Debug)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  Remote(String),
  /// Mutations ran but the remote never confirmed any of them
  #[error("{message}")]
  Unconfirmed {
    message: String,
    details: Option<Value>,
  },
}

impl ApiError {
  /// Map a remote failure, prefixing server-side errors with `context`.
  pub fn from_monday(err: MondayError, context: &str) -> Self {
    match err {
      MondayError::InvalidInput(message) => ApiError::BadRequest(message),
      MondayError::NotFound(message) => ApiError::NotFound(message),
      other => ApiError::Remote(format!("{}: {}", context, other)),
    }
  }
}

#[derive(Serialize)]
struct ErrorBody {
  error: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  details: Option<Value>,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Remote(_) | ApiError::Unconfirmed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let error = self.to_string();
    let details = match self {
      ApiError::Unconfirmed { details, .. } => Some(details.unwrap_or(Value::Null)),
      _ => None,
    };

    (status, Json(ErrorBody { error, details })).into_response()
  }
}

pub type ApiResult<T> = Result<T, ApiError>;
