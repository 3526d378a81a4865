//! Filter objects and their query-string form.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A value that may appear in a filter. `None` means "omit this key".
pub trait FilterValue {
  fn filter_value(&self) -> Option<String>;
}

impl FilterValue for str {
  fn filter_value(&self) -> Option<String> {
    if self.is_empty() {
      None
    } else {
      Some(self.to_string())
    }
  }
}

impl FilterValue for String {
  fn filter_value(&self) -> Option<String> {
    self.as_str().filter_value()
  }
}

impl<T: FilterValue + ?Sized> FilterValue for &T {
  fn filter_value(&self) -> Option<String> {
    (**self).filter_value()
  }
}

impl<T: FilterValue> FilterValue for Option<T> {
  fn filter_value(&self) -> Option<String> {
    self.as_ref().and_then(FilterValue::filter_value)
  }
}

macro_rules! display_filter_value {
  ($($ty:ty),*) => {
    $(
      impl FilterValue for $ty {
        fn filter_value(&self) -> Option<String> {
          Some(self.to_string())
        }
      }
    )*
  };
}

display_filter_value!(i32, i64, u32, u64, usize, bool);

impl FilterValue for chrono::NaiveDate {
  fn filter_value(&self) -> Option<String> {
    Some(self.format("%Y-%m-%d").to_string())
  }
}

impl FilterValue for Value {
  fn filter_value(&self) -> Option<String> {
    match self {
      Value::Null => None,
      Value::String(s) => s.filter_value(),
      Value::Bool(b) => Some(b.to_string()),
      Value::Number(n) => Some(n.to_string()),
      Value::Array(items) => {
        let parts: Vec<String> = items.iter().filter_map(FilterValue::filter_value).collect();
        if parts.is_empty() {
          None
        } else {
          Some(parts.join(","))
        }
      }
      Value::Object(_) => Some(self.to_string()),
    }
  }
}

/// Filter parameters for a list endpoint.
///
/// Keys are kept sorted so the same logical filter always renders to the
/// same query string, whatever order it was built in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Filters(BTreeMap<String, String>);

impl Filters {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder form of [`Filters::insert`].
  pub fn with(mut self, key: &str, value: impl FilterValue) -> Self {
    self.insert(key, value);
    self
  }

  /// Set `key`, or remove it when the value is empty/absent.
  pub fn insert(&mut self, key: &str, value: impl FilterValue) {
    match value.filter_value() {
      Some(v) => {
        self.0.insert(key.to_string(), v);
      }
      None => {
        self.0.remove(key);
      }
    }
  }

  /// Build filters from any serializable struct or map. Null and empty
  /// string fields are dropped.
  pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Self {
    let mut filters = Self::new();
    if let Ok(Value::Object(map)) = serde_json::to_value(value) {
      for (key, value) in map {
        filters.insert(&key, value);
      }
    }
    filters
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(String::as_str)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Percent-encoded `a=1&b=2`, keys in sorted order.
  pub fn to_query_string(&self) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in &self.0 {
      serializer.append_pair(key, value);
    }
    serializer.finish()
  }

  /// Append the query string to `path`, if there is one.
  pub fn apply_to(&self, path: &str) -> String {
    if self.is_empty() {
      path.to_string()
    } else {
      format!("{}?{}", path, self.to_query_string())
    }
  }
}

impl fmt::Display for Filters {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_query_string())
  }
}
