use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Instant;

use crate::api::ApiError;

/// Lifecycle of one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
  /// Nothing has been fetched yet
  #[default]
  Idle,
  /// First fetch in progress, no data yet
  Loading,
  /// Last fetch succeeded
  Success,
  /// Last fetch failed (earlier data, if any, is kept)
  Error,
}

/// Untyped view of an entry, as broadcast to observers.
#[derive(Debug, Clone, Default)]
pub struct QuerySnapshot {
  pub status: QueryStatus,
  pub data: Option<Value>,
  pub error: Option<ApiError>,
  pub is_fetching: bool,
  pub is_invalidated: bool,
  pub updated_at: Option<Instant>,
}

/// What a consumer renders from: typed data plus loading/error flags.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
  pub status: QueryStatus,
  pub data: Option<T>,
  pub error: Option<ApiError>,
  pub is_fetching: bool,
}

impl<T> Default for QueryState<T> {
  fn default() -> Self {
    Self {
      status: QueryStatus::Idle,
      data: None,
      error: None,
      is_fetching: false,
    }
  }
}

impl<T> QueryState<T> {
  /// True only while the first fetch for the key runs.
  pub fn is_loading(&self) -> bool {
    self.status == QueryStatus::Loading
  }

  pub fn is_success(&self) -> bool {
    self.status == QueryStatus::Success
  }

  pub fn is_error(&self) -> bool {
    self.status == QueryStatus::Error
  }

  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.error.as_ref()
  }
}

impl<T: DeserializeOwned> QueryState<T> {
  pub(crate) fn decode(snapshot: &QuerySnapshot) -> Self {
    let mut state = Self {
      status: snapshot.status,
      data: None,
      error: snapshot.error.clone(),
      is_fetching: snapshot.is_fetching,
    };

    if let Some(value) = &snapshot.data {
      match serde_json::from_value(value.clone()) {
        Ok(data) => state.data = Some(data),
        Err(e) => {
          state.status = QueryStatus::Error;
          state.error = Some(ApiError::Decode(e.to_string()));
        }
      }
    }
    state
  }
}
