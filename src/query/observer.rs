//! Typed query handles over the shared cache.
//!
//! A `Query<T>` is what a page holds: a key, the fetcher for it and a
//! watch receiver on the cache entry.
//!
//! # Example
//!
//! ```ignore
//! let mut students = portal.students().list(&Filters::new().with("search", "ada"));
//!
//! // Start fetching in the background
//! students.fetch();
//!
//! // In the event loop tick
//! if students.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! let state = students.state();
//! if state.is_loading() {
//!     render_spinner();
//! } else if let Some(page) = state.data() {
//!     render_rows(page);
//! }
//! ```

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::time::Duration;
use tokio::sync::watch;

use super::cache::{FetchOptions, Fetcher, QueryCache};
use super::key::QueryKey;
use super::state::{QuerySnapshot, QueryState, QueryStatus};
use crate::api::ApiError;

/// Per-query overrides of the cache defaults.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
  /// A disabled query never touches the network and reports no data.
  pub enabled: bool,
  pub stale_time: Option<Duration>,
  pub retry: Option<u32>,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      enabled: true,
      stale_time: None,
      retry: None,
    }
  }
}

impl QueryOptions {
  pub fn enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }

  pub fn stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = Some(stale_time);
    self
  }

  pub fn retry(mut self, retry: u32) -> Self {
    self.retry = Some(retry);
    self
  }

  fn resolve(&self, cache: &QueryCache) -> FetchOptions {
    let defaults = cache.default_options();
    FetchOptions {
      stale_time: self.stale_time.unwrap_or(defaults.stale_time),
      retry: self.retry.unwrap_or(defaults.retry),
    }
  }
}

/// A typed, observable view of one cache entry.
pub struct Query<T> {
  cache: QueryCache,
  key: QueryKey,
  fetcher: Fetcher,
  options: QueryOptions,
  receiver: watch::Receiver<QuerySnapshot>,
  _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Query<T> {
  pub fn new(cache: QueryCache, key: QueryKey, fetcher: Fetcher, options: QueryOptions) -> Self {
    let receiver = register(&cache, &key, &fetcher, &options);
    Self {
      cache,
      key,
      fetcher,
      options,
      receiver,
      _marker: PhantomData,
    }
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  pub fn is_enabled(&self) -> bool {
    self.options.enabled
  }

  /// Current state. A disabled query is always `Idle` with no data.
  pub fn state(&self) -> QueryState<T> {
    if !self.options.enabled {
      return QueryState::default();
    }
    QueryState::decode(&self.receiver.borrow())
  }

  pub fn data(&self) -> Option<T> {
    self.state().data
  }

  pub fn is_loading(&self) -> bool {
    self.options.enabled && self.receiver.borrow().status == QueryStatus::Loading
  }

  pub fn is_fetching(&self) -> bool {
    self.options.enabled && self.receiver.borrow().is_fetching
  }

  pub fn error(&self) -> Option<ApiError> {
    self.state().error
  }

  /// Start loading in the background if the data is missing or stale.
  /// Results arrive through `poll`/`changed`.
  pub fn fetch(&self) {
    if !self.options.enabled {
      return;
    }
    let cache = self.cache.clone();
    let key = self.key.clone();
    let fetcher = self.fetcher.clone();
    let options = self.options.resolve(&self.cache);
    tokio::spawn(async move {
      // Failures are recorded on the entry and logged by the cache.
      let _ = cache.fetch(&key, fetcher, options).await;
    });
  }

  /// Load and wait for the data. Returns `Ok(None)` without any request
  /// when the query is disabled.
  pub async fn load(&self) -> Result<Option<T>, ApiError> {
    if !self.options.enabled {
      return Ok(None);
    }
    let options = self.options.resolve(&self.cache);
    let value = self.cache.fetch(&self.key, self.fetcher.clone(), options).await?;
    decode(value).map(Some)
  }

  /// Reload even if the cached data is fresh.
  pub async fn refetch(&self) -> Result<Option<T>, ApiError> {
    if !self.options.enabled {
      return Ok(None);
    }
    let options = self.options.resolve(&self.cache);
    let value = self.cache.refetch(&self.key, self.fetcher.clone(), options).await?;
    decode(value).map(Some)
  }

  /// Returns `true` if the entry changed since the last poll.
  pub fn poll(&mut self) -> bool {
    match self.receiver.has_changed() {
      Ok(true) => {
        self.receiver.borrow_and_update();
        true
      }
      _ => false,
    }
  }

  /// Wait for the next change. Returns `false` if the entry was dropped.
  pub async fn changed(&mut self) -> bool {
    self.receiver.changed().await.is_ok()
  }

  pub fn set_enabled(&mut self, enabled: bool) {
    if self.options.enabled == enabled {
      return;
    }
    self.options.enabled = enabled;
    self.receiver = register(&self.cache, &self.key, &self.fetcher, &self.options);
  }

  /// Point this handle at a different key. Rebinding to the current key is
  /// a no-op, so callers can rebind on every render.
  pub fn rebind(&mut self, key: QueryKey, fetcher: Fetcher) {
    if key == self.key {
      return;
    }
    self.key = key;
    self.fetcher = fetcher;
    self.receiver = register(&self.cache, &self.key, &self.fetcher, &self.options);
  }
}

fn register(
  cache: &QueryCache,
  key: &QueryKey,
  fetcher: &Fetcher,
  options: &QueryOptions,
) -> watch::Receiver<QuerySnapshot> {
  if options.enabled {
    cache.observe(key, fetcher.clone(), options.resolve(cache))
  } else {
    watch::channel(QuerySnapshot::default()).1
  }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
  serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Wrap an async closure as a cache fetcher.
pub fn fetcher<F, Fut>(f: F) -> Fetcher
where
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: std::future::Future<Output = Result<Value, ApiError>> + Send + 'static,
{
  std::sync::Arc::new(move || -> BoxFuture<'static, Result<Value, ApiError>> { Box::pin(f()) })
}
