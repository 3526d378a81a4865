//! List responses come back either as a bare JSON array or as a DRF page
//! envelope (`{ results, count, next, previous }`). Both are normalized here
//! into `Page<T>` so everything above the client sees a single shape.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;

/// Canonical list payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: u64,
  #[serde(default)]
  pub next: Option<String>,
  #[serde(default)]
  pub previous: Option<String>,
}

impl<T> Default for Page<T> {
  fn default() -> Self {
    Self {
      items: Vec::new(),
      total: 0,
      next: None,
      previous: None,
    }
  }
}

impl<T> Page<T> {
  pub fn from_items(items: Vec<T>) -> Self {
    let total = items.len() as u64;
    Self {
      items,
      total,
      next: None,
      previous: None,
    }
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, T> {
    self.items.iter()
  }
}

impl<T> IntoIterator for Page<T> {
  type Item = T;
  type IntoIter = std::vec::IntoIter<T>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.into_iter()
  }
}

/// Normalize any list-ish body into a page.
///
/// Anything that is neither an array nor an object with a `results` array
/// is treated as an empty list.
pub fn normalize<T: DeserializeOwned>(body: Value) -> Result<Page<T>, ApiError> {
  match body {
    Value::Array(items) => Ok(Page::from_items(decode_items(items)?)),
    Value::Object(mut map) => {
      let results = match map.remove("results") {
        Some(Value::Array(items)) => items,
        _ => return Ok(Page::default()),
      };
      let items = decode_items(results)?;
      let total = map
        .get("count")
        .and_then(Value::as_u64)
        .unwrap_or(items.len() as u64);
      let link = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);

      Ok(Page {
        next: link(map.get("next")),
        previous: link(map.get("previous")),
        items,
        total,
      })
    }
    _ => Ok(Page::default()),
  }
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>, ApiError> {
  items
    .into_iter()
    .map(|item| serde_json::from_value(item).map_err(|e| ApiError::Decode(e.to_string())))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_envelope_with_results() {
    let body = json!({
      "count": 3,
      "next": null,
      "previous": null,
      "results": [{"id": 1}, {"id": 2}, {"id": 3}],
    });
    let page: Page<Value> = normalize(body).unwrap();
    assert_eq!(page.len(), 3);
    assert_eq!(page.total, 3);
    assert_eq!(page.next, None);
  }

  #[test]
  fn test_bare_array() {
    let page: Page<Value> = normalize(json!([{"id": 1}, {"id": 2}])).unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page.total, 2);
  }

  #[test]
  fn test_count_larger_than_page() {
    let body = json!({
      "count": 120,
      "next": "http://api/students/?page=2",
      "results": [{"id": 1}],
    });
    let page: Page<Value> = normalize(body).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page.total, 120);
    assert_eq!(page.next.as_deref(), Some("http://api/students/?page=2"));
  }

  #[test]
  fn test_unexpected_shape_is_empty() {
    let page: Page<Value> = normalize(json!({"detail": "nothing here"})).unwrap();
    assert!(page.is_empty());
    let page: Page<Value> = normalize(Value::Null).unwrap();
    assert!(page.is_empty());
  }

  #[test]
  fn test_item_type_mismatch_is_decode_error() {
    #[derive(Debug, Deserialize)]
    struct Row {
      #[allow(dead_code)]
      id: u64,
    }
    let err = normalize::<Row>(json!([{"id": "not-a-number"}])).unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
  }
}
