//! Typed view over a column's JSON-encoded `value`.
//!
//! Monday stores a per-type JSON payload in `value` alongside a plain-text
//! rendering in `text`. The two can disagree; callers decide which to trust.

use serde::Deserialize;
use serde_json::Value;

use super::types::ColumnValue;

/// Decoded column `value`, keyed by column type
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnPayload {
  /// `email` and `integration` columns: `{"email": ..., "text": ...}`
  Email { email: String, text: Option<String> },
  /// `date` columns: `{"date": "YYYY-MM-DD", "time": ...}`
  Date {
    date: Option<String>,
    time: Option<String>,
  },
  /// `status`/`color` columns: `{"index": n}` or `{"label": ...}`
  Status {
    index: Option<u64>,
    label: Option<String>,
  },
  /// Value stored as a bare JSON string
  Text(String),
  /// Anything else, kept as parsed
  Other(Value),
}

#[derive(Deserialize)]
struct RawDate {
  date: Option<String>,
  time: Option<String>,
}

#[derive(Deserialize)]
struct RawStatus {
  index: Option<u64>,
  label: Option<String>,
}

impl ColumnPayload {
  /// Parse `raw` for a column of `column_type`. Returns None when `raw` is not JSON.
  pub fn parse(column_type: &str, raw: &str) -> Option<Self> {
    let value: Value = serde_json::from_str(raw).ok()?;

    if let Value::String(s) = value {
      return Some(Self::Text(s));
    }

    let payload = match column_type {
      "email" | "integration" => match value.get("email").and_then(Value::as_str) {
        Some(email) if !email.is_empty() => Self::Email {
          email: email.to_string(),
          text: value.get("text").and_then(Value::as_str).map(String::from),
        },
        _ => Self::Other(value),
      },
      "date" => match serde_json::from_value::<RawDate>(value.clone()) {
        Ok(raw) => Self::Date {
          date: raw.date,
          time: raw.time,
        },
        Err(_) => Self::Other(value),
      },
      "status" | "color" => match serde_json::from_value::<RawStatus>(value.clone()) {
        Ok(raw) if raw.index.is_some() || raw.label.is_some() => Self::Status {
          index: raw.index,
          label: raw.label,
        },
        _ => Self::Other(value),
      },
      _ => Self::Other(value),
    };

    Some(payload)
  }

  /// Parse the `value` of a fetched column, if any
  pub fn from_column(column: &ColumnValue) -> Option<Self> {
    column
      .value
      .as_deref()
      .and_then(|raw| Self::parse(&column.column_type, raw))
  }

  /// Address carried by this payload: the structured email, or a bare string
  pub fn email_candidate(&self) -> Option<&str> {
    match self {
      Self::Email { email, .. } => Some(email),
      Self::Text(s) => Some(s),
      _ => None,
    }
  }
}
