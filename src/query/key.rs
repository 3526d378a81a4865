use std::fmt;

use super::filters::Filters;

/// Identity of one cached result set: the resource name followed by ids
/// and/or the serialized filter.
///
/// Invalidation works on prefixes, so `["payments"]` covers every
/// `["payments", <filter>]` entry while leaving `["payment", <id>]` alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
  pub fn new(resource: impl Into<String>) -> Self {
    Self(vec![resource.into()])
  }

  pub fn from_segments<I, S>(segments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self(segments.into_iter().map(Into::into).collect())
  }

  /// Append an id or other discriminating segment.
  pub fn with(mut self, segment: impl fmt::Display) -> Self {
    self.0.push(segment.to_string());
    self
  }

  /// Append the serialized filter, unless it is empty.
  pub fn with_filters(mut self, filters: &Filters) -> Self {
    if !filters.is_empty() {
      self.0.push(filters.to_query_string());
    }
    self
  }

  pub fn resource(&self) -> &str {
    self.0.first().map(String::as_str).unwrap_or_default()
  }

  pub fn segments(&self) -> &[String] {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    self.0.starts_with(&prefix.0)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0.join(":"))
  }
}

impl From<&str> for QueryKey {
  fn from(resource: &str) -> Self {
    Self::new(resource)
  }
}

impl<const N: usize> From<[&str; N]> for QueryKey {
  fn from(segments: [&str; N]) -> Self {
    Self::from_segments(segments)
  }
}
