//! Write operations that invalidate the cache on success.

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cache::QueryCache;
use super::invalidation::MutationSpec;
use crate::api::ApiError;

type Runner<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O, ApiError>> + Send + Sync>;
type SuccessHook<O> = Arc<dyn Fn(&O, &QueryCache) + Send + Sync>;

struct MutationState<O> {
  pending: usize,
  error: Option<ApiError>,
  data: Option<O>,
}

impl<O> Default for MutationState<O> {
  fn default() -> Self {
    Self {
      pending: 0,
      error: None,
      data: None,
    }
  }
}

/// A named write. On success every key prefix its `MutationSpec` lists is
/// invalidated; on failure the cache is left alone.
pub struct Mutation<I, O> {
  cache: QueryCache,
  spec: &'static MutationSpec,
  run: Runner<I, O>,
  on_success: Option<SuccessHook<O>>,
  state: Arc<Mutex<MutationState<O>>>,
}

impl<I, O> Clone for Mutation<I, O> {
  fn clone(&self) -> Self {
    Self {
      cache: self.cache.clone(),
      spec: self.spec,
      run: self.run.clone(),
      on_success: self.on_success.clone(),
      state: self.state.clone(),
    }
  }
}

/// Decrements the pending count even if the caller drops the future.
struct PendingGuard<'a, O>(&'a Mutex<MutationState<O>>);

impl<O> Drop for PendingGuard<'_, O> {
  fn drop(&mut self) {
    let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
    state.pending = state.pending.saturating_sub(1);
  }
}

impl<I, O> Mutation<I, O>
where
  I: Serialize + Send + 'static,
  O: Serialize + Clone + Send + Sync + 'static,
{
  pub fn new<F, Fut>(cache: QueryCache, spec: &'static MutationSpec, run: F) -> Self
  where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ApiError>> + Send + 'static,
  {
    Self {
      cache,
      spec,
      run: Arc::new(move |input| Box::pin(run(input))),
      on_success: None,
      state: Arc::new(Mutex::new(MutationState::default())),
    }
  }

  /// Extra work after a successful call, run after invalidation.
  pub fn on_success<F>(mut self, hook: F) -> Self
  where
    F: Fn(&O, &QueryCache) + Send + Sync + 'static,
  {
    self.on_success = Some(Arc::new(hook));
    self
  }

  pub fn name(&self) -> &'static str {
    self.spec.name
  }

  fn lock(&self) -> MutexGuard<'_, MutationState<O>> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Run the mutation and wait for its result.
  pub async fn mutate_async(&self, input: I) -> Result<O, ApiError> {
    let input_json = serde_json::to_value(&input).unwrap_or(Value::Null);
    {
      let mut state = self.lock();
      state.pending += 1;
      state.error = None;
    }
    let _pending = PendingGuard(&self.state);

    debug!(mutation = self.spec.name, "mutation started");
    let result = (self.run)(input).await;

    match &result {
      Ok(output) => {
        let output_json = serde_json::to_value(output).unwrap_or(Value::Null);
        let prefixes = self.spec.resolve(&input_json, &output_json);
        for prefix in &prefixes {
          self.cache.invalidate(prefix);
        }
        if let Some(hook) = &self.on_success {
          hook(output, &self.cache);
        }
        info!(
          mutation = self.spec.name,
          invalidated = prefixes.len(),
          "mutation succeeded"
        );
        let mut state = self.lock();
        state.data = Some(output.clone());
        state.error = None;
      }
      Err(e) => {
        warn!(mutation = self.spec.name, error = %e, "mutation failed");
        self.lock().error = Some(e.clone());
      }
    }
    result
  }

  /// Fire-and-forget form. The outcome is visible through `is_pending`,
  /// `error` and `data`.
  pub fn mutate(&self, input: I) -> JoinHandle<()> {
    let this = self.clone();
    tokio::spawn(async move {
      let _ = this.mutate_async(input).await;
    })
  }

  pub fn is_pending(&self) -> bool {
    self.lock().pending > 0
  }

  pub fn error(&self) -> Option<ApiError> {
    self.lock().error.clone()
  }

  pub fn data(&self) -> Option<O> {
    self.lock().data.clone()
  }

  /// Forget the last result and error.
  pub fn reset(&self) {
    let mut state = self.lock();
    state.error = None;
    state.data = None;
  }
}
