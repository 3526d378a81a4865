//! Keyed query cache with request coalescing and prefix invalidation.
//!
//! One entry per `QueryKey`. Each entry remembers its last data, its last
//! error, when it was last written, and the fetch currently in flight (if
//! any). Concurrent fetches for the same key share one `Shared` future, so
//! the network sees a single request.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::key::QueryKey;
use super::state::{QuerySnapshot, QueryStatus};
use crate::api::ApiError;

pub type FetchResult = Result<Value, ApiError>;

/// Produces a fresh request future each time the entry needs (re)loading.
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, FetchResult> + Send + Sync>;

type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Cache-wide defaults.
#[derive(Debug, Clone)]
pub struct CacheSettings {
  /// How long data counts as fresh after a successful fetch
  pub stale_time: Duration,
  /// How long an entry with no observers survives `collect_garbage`
  pub gc_time: Duration,
  /// Extra attempts for transport/5xx failures
  pub retry: u32,
  /// Base delay between retries, doubled per attempt
  pub retry_delay: Duration,
}

impl Default for CacheSettings {
  fn default() -> Self {
    Self {
      stale_time: Duration::from_secs(60),
      gc_time: Duration::from_secs(300),
      retry: 0,
      retry_delay: Duration::from_secs(1),
    }
  }
}

/// Per-entry fetch behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
  pub stale_time: Duration,
  pub retry: u32,
}

struct InFlight {
  id: u64,
  future: SharedFetch,
}

struct Entry {
  data: Option<Value>,
  error: Option<ApiError>,
  status: QueryStatus,
  updated_at: Option<Instant>,
  invalidated: bool,
  in_flight: Option<InFlight>,
  fetcher: Option<Fetcher>,
  options: FetchOptions,
  touched_at: Instant,
  notify: watch::Sender<QuerySnapshot>,
}

impl Entry {
  fn new(options: FetchOptions) -> Self {
    let (notify, _) = watch::channel(QuerySnapshot::default());
    Self {
      data: None,
      error: None,
      status: QueryStatus::Idle,
      updated_at: None,
      invalidated: false,
      in_flight: None,
      fetcher: None,
      options,
      touched_at: Instant::now(),
      notify,
    }
  }

  fn snapshot(&self) -> QuerySnapshot {
    QuerySnapshot {
      status: self.status,
      data: self.data.clone(),
      error: self.error.clone(),
      is_fetching: self.in_flight.is_some(),
      is_invalidated: self.invalidated,
      updated_at: self.updated_at,
    }
  }

  fn publish(&self) {
    self.notify.send_replace(self.snapshot());
  }

  fn fresh_data(&self, now: Instant) -> Option<Value> {
    if self.invalidated {
      return None;
    }
    let updated_at = self.updated_at?;
    if now.duration_since(updated_at) < self.options.stale_time {
      self.data.clone()
    } else {
      None
    }
  }

  fn has_observers(&self) -> bool {
    self.notify.receiver_count() > 0
  }

  fn reset(&mut self) {
    self.data = None;
    self.error = None;
    self.status = QueryStatus::Idle;
    self.updated_at = None;
    self.invalidated = false;
    self.in_flight = None;
  }
}

#[derive(Default)]
struct CacheInner {
  entries: HashMap<QueryKey, Entry>,
  next_fetch_id: u64,
}

/// Shared query cache. Clones refer to the same entries.
#[derive(Clone)]
pub struct QueryCache {
  inner: Arc<Mutex<CacheInner>>,
  settings: Arc<CacheSettings>,
}

impl QueryCache {
  pub fn new(settings: CacheSettings) -> Self {
    Self {
      inner: Arc::new(Mutex::new(CacheInner::default())),
      settings: Arc::new(settings),
    }
  }

  pub fn settings(&self) -> &CacheSettings {
    &self.settings
  }

  pub fn default_options(&self) -> FetchOptions {
    FetchOptions {
      stale_time: self.settings.stale_time,
      retry: self.settings.retry,
    }
  }

  fn lock(&self) -> MutexGuard<'_, CacheInner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Register an observer for `key`. The fetcher is kept so invalidation can
  /// refetch the entry in the background while someone is watching it.
  pub fn observe(
    &self,
    key: &QueryKey,
    fetcher: Fetcher,
    options: FetchOptions,
  ) -> watch::Receiver<QuerySnapshot> {
    let mut inner = self.lock();
    let entry = inner
      .entries
      .entry(key.clone())
      .or_insert_with(|| Entry::new(options));
    entry.fetcher = Some(fetcher);
    entry.options = options;
    entry.touched_at = Instant::now();
    entry.notify.subscribe()
  }

  /// Watch an entry without registering a fetcher.
  pub fn subscribe(&self, key: &QueryKey) -> watch::Receiver<QuerySnapshot> {
    let mut inner = self.lock();
    let options = self.default_options();
    inner
      .entries
      .entry(key.clone())
      .or_insert_with(|| Entry::new(options))
      .notify
      .subscribe()
  }

  /// Return fresh cached data, or fetch. Joins a fetch already in flight for
  /// the same key instead of starting another.
  pub async fn fetch(&self, key: &QueryKey, fetcher: Fetcher, options: FetchOptions) -> FetchResult {
    let pending = {
      let mut inner = self.lock();
      let entry = inner
        .entries
        .entry(key.clone())
        .or_insert_with(|| Entry::new(options));
      entry.fetcher = Some(fetcher);
      entry.options = options;
      entry.touched_at = Instant::now();

      if let Some(data) = entry.fresh_data(Instant::now()) {
        debug!(key = %key, "cache hit");
        return Ok(data);
      }
      self.join_or_start(&mut inner, key)?
    };
    pending.await
  }

  /// Fetch regardless of freshness. Still joins an in-flight request.
  pub async fn refetch(&self, key: &QueryKey, fetcher: Fetcher, options: FetchOptions) -> FetchResult {
    let pending = {
      let mut inner = self.lock();
      let entry = inner
        .entries
        .entry(key.clone())
        .or_insert_with(|| Entry::new(options));
      entry.fetcher = Some(fetcher);
      entry.options = options;
      entry.touched_at = Instant::now();
      self.join_or_start(&mut inner, key)?
    };
    pending.await
  }

  fn join_or_start(&self, inner: &mut CacheInner, key: &QueryKey) -> Result<SharedFetch, ApiError> {
    if let Some(in_flight) = inner.entries.get(key).and_then(|e| e.in_flight.as_ref()) {
      debug!(key = %key, "joining in-flight fetch");
      return Ok(in_flight.future.clone());
    }
    self
      .start(inner, key)
      .ok_or_else(|| ApiError::Transport(format!("no fetcher registered for {}", key)))
  }

  /// Spawn the fetch task for `key` and record it as the entry's in-flight
  /// request. Must be called with the cache lock held.
  fn start(&self, inner: &mut CacheInner, key: &QueryKey) -> Option<SharedFetch> {
    let id = inner.next_fetch_id;
    inner.next_fetch_id += 1;

    let entry = inner.entries.get_mut(key)?;
    let fetcher = entry.fetcher.clone()?;
    let retry = entry.options.retry;
    let retry_delay = self.settings.retry_delay;

    if entry.data.is_none() {
      entry.status = QueryStatus::Loading;
    }

    let cache = self.clone();
    let task_key = key.clone();
    let handle = tokio::spawn(async move {
      let result = run_with_retry(&task_key, &fetcher, retry, retry_delay).await;
      cache.settle(&task_key, id, &result);
      result
    });

    let future = async move {
      handle
        .await
        .unwrap_or_else(|e| Err(ApiError::Transport(format!("fetch task failed: {}", e))))
    }
    .boxed()
    .shared();

    entry.in_flight = Some(InFlight {
      id,
      future: future.clone(),
    });
    entry.publish();
    debug!(key = %key, fetch_id = id, "fetch started");
    Some(future)
  }

  /// Apply a finished fetch, unless it was superseded by invalidation or
  /// the entry was cleared in the meantime.
  fn settle(&self, key: &QueryKey, id: u64, result: &FetchResult) {
    let mut inner = self.lock();
    let Some(entry) = inner.entries.get_mut(key) else {
      debug!(key = %key, fetch_id = id, "entry gone, dropping result");
      return;
    };
    if entry.in_flight.as_ref().map(|f| f.id) != Some(id) {
      debug!(key = %key, fetch_id = id, "superseded fetch, dropping result");
      return;
    }

    let now = Instant::now();
    entry.in_flight = None;
    entry.touched_at = now;
    match result {
      Ok(value) => {
        entry.data = Some(value.clone());
        entry.error = None;
        entry.status = QueryStatus::Success;
        entry.updated_at = Some(now);
        entry.invalidated = false;
      }
      Err(e) => {
        warn!(key = %key, error = %e, "query failed");
        entry.error = Some(e.clone());
        entry.status = QueryStatus::Error;
      }
    }
    entry.publish();
  }

  pub fn get_data(&self, key: &QueryKey) -> Option<Value> {
    self.lock().entries.get(key).and_then(|e| e.data.clone())
  }

  pub fn snapshot(&self, key: &QueryKey) -> Option<QuerySnapshot> {
    self.lock().entries.get(key).map(Entry::snapshot)
  }

  /// Write data directly, as if a fetch had just returned it.
  pub fn set_data(&self, key: &QueryKey, value: Value) {
    let mut inner = self.lock();
    let options = self.default_options();
    let entry = inner
      .entries
      .entry(key.clone())
      .or_insert_with(|| Entry::new(options));
    let now = Instant::now();
    entry.data = Some(value);
    entry.error = None;
    entry.status = QueryStatus::Success;
    entry.updated_at = Some(now);
    entry.invalidated = false;
    entry.touched_at = now;
    entry.publish();
  }

  /// Mark every entry under `prefix` stale. Entries someone is watching are
  /// refetched right away; the rest reload on their next fetch. A fetch
  /// already in flight for a matched entry is superseded, since it may
  /// carry pre-write data.
  pub fn invalidate(&self, prefix: &QueryKey) -> Vec<QueryKey> {
    let mut inner = self.lock();
    let keys: Vec<QueryKey> = inner
      .entries
      .keys()
      .filter(|k| k.starts_with(prefix))
      .cloned()
      .collect();

    for key in &keys {
      let active = match inner.entries.get_mut(key) {
        Some(entry) => {
          entry.invalidated = true;
          entry.in_flight = None;
          entry.has_observers() && entry.fetcher.is_some()
        }
        None => continue,
      };

      if active {
        debug!(key = %key, "refetching invalidated query");
        self.start(&mut inner, key);
      } else if let Some(entry) = inner.entries.get(key) {
        entry.publish();
      }
    }

    if !keys.is_empty() {
      debug!(prefix = %prefix, count = keys.len(), "invalidated queries");
    }
    keys
  }

  /// Drop every entry's data. Entries with live observers are kept (empty)
  /// so those observers keep receiving updates.
  pub fn clear(&self) {
    let mut inner = self.lock();
    let before = inner.entries.len();
    inner.entries.retain(|_, entry| {
      if entry.has_observers() {
        entry.reset();
        entry.publish();
        true
      } else {
        false
      }
    });
    debug!(entries = before, "query cache cleared");
  }

  /// Remove entries nobody observes that have not been touched for
  /// `gc_time`. Returns how many were removed.
  pub fn collect_garbage(&self) -> usize {
    let mut inner = self.lock();
    let gc_time = self.settings.gc_time;
    let now = Instant::now();
    let before = inner.entries.len();
    inner.entries.retain(|_, entry| {
      entry.has_observers()
        || entry.in_flight.is_some()
        || now.duration_since(entry.touched_at) < gc_time
    });
    before - inner.entries.len()
  }

  pub fn contains(&self, key: &QueryKey) -> bool {
    self.lock().entries.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().entries.is_empty()
  }
}

async fn run_with_retry(key: &QueryKey, fetcher: &Fetcher, retry: u32, base_delay: Duration) -> FetchResult {
  let mut attempt = 0;
  loop {
    match fetcher().await {
      Err(e) if attempt < retry && e.is_retryable() => {
        let delay = base_delay
          .saturating_mul(1u32 << attempt.min(5))
          .min(MAX_RETRY_DELAY);
        debug!(key = %key, attempt = attempt + 1, error = %e, "retrying query");
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
      result => return result,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::sync::atomic::{AtomicU32, Ordering};

  fn counting_fetcher(counter: Arc<AtomicU32>, delay: Duration) -> Fetcher {
    Arc::new(move || {
      let counter = counter.clone();
      async move {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if !delay.is_zero() {
          tokio::time::sleep(delay).await;
        }
        Ok(json!({ "call": n }))
      }
      .boxed()
    })
  }

  fn scripted_fetcher(results: Vec<FetchResult>) -> (Fetcher, Arc<AtomicU32>) {
    let counter = Arc::new(AtomicU32::new(0));
    let calls = counter.clone();
    let results = Arc::new(results);
    let fetcher: Fetcher = Arc::new(move || {
      let n = counter.fetch_add(1, Ordering::SeqCst) as usize;
      let result = results[n.min(results.len() - 1)].clone();
      async move { result }.boxed()
    });
    (fetcher, calls)
  }

  fn options(stale_time: Duration) -> FetchOptions {
    FetchOptions { stale_time, retry: 0 }
  }

  #[tokio::test]
  async fn test_concurrent_fetches_share_one_request() {
    let cache = QueryCache::new(CacheSettings::default());
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = counting_fetcher(counter.clone(), Duration::from_millis(50));
    let key = QueryKey::new("students");
    let opts = options(Duration::from_secs(60));

    let (a, b) = tokio::join!(
      cache.fetch(&key, fetcher.clone(), opts),
      cache.fetch(&key, fetcher.clone(), opts)
    );

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(a.unwrap(), b.unwrap());
  }

  #[tokio::test]
  async fn test_fresh_data_served_from_cache() {
    let cache = QueryCache::new(CacheSettings::default());
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = counting_fetcher(counter.clone(), Duration::ZERO);
    let key = QueryKey::new("levels");
    let opts = options(Duration::from_secs(60));

    cache.fetch(&key, fetcher.clone(), opts).await.unwrap();
    let second = cache.fetch(&key, fetcher, opts).await.unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(second, json!({"call": 1}));
  }

  #[tokio::test]
  async fn test_stale_data_refetched() {
    let cache = QueryCache::new(CacheSettings::default());
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = counting_fetcher(counter.clone(), Duration::ZERO);
    let key = QueryKey::new("levels");
    let opts = options(Duration::ZERO);

    cache.fetch(&key, fetcher.clone(), opts).await.unwrap();
    let second = cache.fetch(&key, fetcher, opts).await.unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(second, json!({"call": 2}));
  }

  #[tokio::test]
  async fn test_invalidate_marks_prefix_stale() {
    let cache = QueryCache::new(CacheSettings::default());
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = counting_fetcher(counter.clone(), Duration::ZERO);
    let opts = options(Duration::from_secs(60));
    let list = QueryKey::from(["payments", "status=paid"]);
    let detail = QueryKey::from(["payment", "4"]);

    cache.fetch(&list, fetcher.clone(), opts).await.unwrap();
    cache.fetch(&detail, fetcher.clone(), opts).await.unwrap();

    let matched = cache.invalidate(&QueryKey::new("payments"));
    assert_eq!(matched, vec![list.clone()]);
    assert!(cache.snapshot(&list).unwrap().is_invalidated);
    assert!(!cache.snapshot(&detail).unwrap().is_invalidated);

    cache.fetch(&list, fetcher.clone(), opts).await.unwrap();
    cache.fetch(&detail, fetcher, opts).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_invalidate_refetches_observed_entry() {
    let cache = QueryCache::new(CacheSettings::default());
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = counting_fetcher(counter.clone(), Duration::ZERO);
    let key = QueryKey::from(["student-payment-summary", "s-1"]);
    let opts = options(Duration::from_secs(60));

    let mut rx = cache.observe(&key, fetcher.clone(), opts);
    cache.fetch(&key, fetcher, opts).await.unwrap();
    rx.borrow_and_update();

    cache.invalidate(&QueryKey::new("student-payment-summary"));
    loop {
      rx.changed().await.unwrap();
      let snapshot = rx.borrow_and_update().clone();
      if !snapshot.is_fetching {
        assert_eq!(snapshot.data, Some(json!({"call": 2})));
        assert!(!snapshot.is_invalidated);
        break;
      }
    }
    assert_eq!(counter.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_error_keeps_previous_data() {
    let cache = QueryCache::new(CacheSettings::default());
    let (fetcher, _) = scripted_fetcher(vec![
      Ok(json!([1, 2])),
      Err(ApiError::Transport("offline".into())),
    ]);
    let key = QueryKey::new("exams");
    let opts = options(Duration::ZERO);

    cache.fetch(&key, fetcher.clone(), opts).await.unwrap();
    let err = cache.fetch(&key, fetcher, opts).await.unwrap_err();

    let snapshot = cache.snapshot(&key).unwrap();
    assert_eq!(snapshot.status, QueryStatus::Error);
    assert_eq!(snapshot.error, Some(err));
    assert_eq!(snapshot.data, Some(json!([1, 2])));
  }

  #[tokio::test]
  async fn test_success_after_error_clears_error() {
    let cache = QueryCache::new(CacheSettings::default());
    let (fetcher, _) = scripted_fetcher(vec![
      Err(ApiError::Transport("offline".into())),
      Ok(json!({"ok": true})),
    ]);
    let key = QueryKey::new("departments");
    let opts = options(Duration::from_secs(60));

    assert!(cache.fetch(&key, fetcher.clone(), opts).await.is_err());
    cache.fetch(&key, fetcher, opts).await.unwrap();

    let snapshot = cache.snapshot(&key).unwrap();
    assert_eq!(snapshot.status, QueryStatus::Success);
    assert!(snapshot.error.is_none());
  }

  #[tokio::test]
  async fn test_retries_only_retryable_errors() {
    let cache = QueryCache::new(CacheSettings {
      retry_delay: Duration::from_millis(1),
      ..CacheSettings::default()
    });
    let opts = FetchOptions {
      stale_time: Duration::from_secs(60),
      retry: 2,
    };

    let (flaky, flaky_calls) = scripted_fetcher(vec![
      Err(ApiError::Transport("reset".into())),
      Ok(json!("recovered")),
    ]);
    let value = cache.fetch(&QueryKey::new("a"), flaky, opts).await.unwrap();
    assert_eq!(value, json!("recovered"));
    assert_eq!(flaky_calls.load(Ordering::SeqCst), 2);

    let not_found = ApiError::from_response(404, br#"{"detail": "Not found."}"#);
    let (missing, missing_calls) = scripted_fetcher(vec![Err(not_found)]);
    assert!(cache.fetch(&QueryKey::new("b"), missing, opts).await.is_err());
    assert_eq!(missing_calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_clear_drops_data_and_forces_refetch() {
    let cache = QueryCache::new(CacheSettings::default());
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = counting_fetcher(counter.clone(), Duration::ZERO);
    let key = QueryKey::new("user");
    let opts = options(Duration::from_secs(60));

    let rx = cache.observe(&key, fetcher.clone(), opts);
    cache.fetch(&key, fetcher.clone(), opts).await.unwrap();
    cache.fetch(&QueryKey::new("other"), fetcher.clone(), opts).await.unwrap();

    cache.clear();
    assert_eq!(cache.len(), 1);
    assert!(rx.borrow().data.is_none());
    assert_eq!(rx.borrow().status, QueryStatus::Idle);

    cache.fetch(&key, fetcher, opts).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_result_for_cleared_entry_is_discarded() {
    let cache = QueryCache::new(CacheSettings::default());
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = counting_fetcher(counter, Duration::from_millis(30));
    let key = QueryKey::new("user");
    let opts = options(Duration::from_secs(60));

    let pending = {
      let cache = cache.clone();
      let key = key.clone();
      tokio::spawn(async move { cache.fetch(&key, fetcher, opts).await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    cache.clear();

    assert!(pending.await.unwrap().is_ok());
    assert!(cache.get_data(&key).is_none());
  }

  #[tokio::test]
  async fn test_set_data_is_fresh() {
    let cache = QueryCache::new(CacheSettings::default());
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = counting_fetcher(counter.clone(), Duration::ZERO);
    let key = QueryKey::new("user");

    cache.set_data(&key, json!({"id": 1}));
    let value = cache
      .fetch(&key, fetcher, options(Duration::from_secs(60)))
      .await
      .unwrap();
    assert_eq!(value, json!({"id": 1}));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_collect_garbage_keeps_observed_entries() {
    let cache = QueryCache::new(CacheSettings {
      gc_time: Duration::ZERO,
      ..CacheSettings::default()
    });
    let counter = Arc::new(AtomicU32::new(0));
    let fetcher = counting_fetcher(counter, Duration::ZERO);
    let opts = options(Duration::from_secs(60));
    let watched = QueryKey::new("watched");

    let _rx = cache.observe(&watched, fetcher.clone(), opts);
    cache.fetch(&watched, fetcher.clone(), opts).await.unwrap();
    cache.fetch(&QueryKey::new("orphan"), fetcher, opts).await.unwrap();

    assert_eq!(cache.collect_garbage(), 1);
    assert!(cache.contains(&watched));
  }
}
