//! Scripted transport for unit tests.

use futures::future::BoxFuture;
use reqwest::Method;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::{ApiClient, ApiError, HttpRequest, HttpResponse, Transport};
use crate::query::{CacheSettings, QueryCache};
use crate::session::MemoryTokenStore;

pub const BASE_URL: &str = "http://portal.test/api";

#[derive(Clone)]
enum Reply {
  Response(HttpResponse),
  Fail(String),
}

/// Replies are queued per `(method, path?query)`. Each request consumes the
/// head of the queue, except the last reply which repeats.
#[derive(Default)]
pub struct MockTransport {
  routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
  calls: Mutex<Vec<HttpRequest>>,
  delay: Mutex<Duration>,
}

impl MockTransport {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn on(&self, method: Method, path: &str, status: u16, body: Value) {
    let body = serde_json::to_vec(&body).unwrap();
    self.push(method, path, Reply::Response(HttpResponse { status, body }));
  }

  pub fn on_empty(&self, method: Method, path: &str, status: u16) {
    self.push(
      method,
      path,
      Reply::Response(HttpResponse {
        status,
        body: Vec::new(),
      }),
    );
  }

  pub fn fail(&self, method: Method, path: &str, message: &str) {
    self.push(method, path, Reply::Fail(message.to_string()));
  }

  /// Simulated latency applied to every request.
  pub fn set_delay(&self, delay: Duration) {
    *self.delay.lock().unwrap() = delay;
  }

  pub fn calls(&self, method: Method, path: &str) -> usize {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .filter(|req| req.method == method && relative(req) == path)
      .count()
  }

  pub fn total_calls(&self) -> usize {
    self.calls.lock().unwrap().len()
  }

  pub fn last_bearer(&self) -> Option<String> {
    self.calls.lock().unwrap().last().and_then(|req| req.bearer.clone())
  }

  pub fn last_body(&self, method: Method, path: &str) -> Option<Value> {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .rev()
      .find(|req| req.method == method && relative(req) == path)
      .and_then(|req| req.body.clone())
  }

  fn push(&self, method: Method, path: &str, reply: Reply) {
    self
      .routes
      .lock()
      .unwrap()
      .entry((method, path.to_string()))
      .or_default()
      .push_back(reply);
  }

  fn next_reply(&self, method: &Method, path: &str) -> Option<Reply> {
    let mut routes = self.routes.lock().unwrap();
    let queue = routes.get_mut(&(method.clone(), path.to_string()))?;
    if queue.len() > 1 {
      queue.pop_front()
    } else {
      queue.front().cloned()
    }
  }
}

fn relative(req: &HttpRequest) -> &str {
  let full = req.url.as_str();
  full.strip_prefix(BASE_URL).unwrap_or(full)
}

impl Transport for MockTransport {
  fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ApiError>> {
    let path = relative(&request).to_string();
    let reply = self.next_reply(&request.method, &path);
    self.calls.lock().unwrap().push(request);
    let delay = *self.delay.lock().unwrap();

    Box::pin(async move {
      if !delay.is_zero() {
        tokio::time::sleep(delay).await;
      }
      match reply {
        Some(Reply::Response(response)) => Ok(response),
        Some(Reply::Fail(message)) => Err(ApiError::Transport(message)),
        None => Ok(HttpResponse {
          status: 404,
          body: format!(r#"{{"detail": "no mock route for {}"}}"#, path).into_bytes(),
        }),
      }
    })
  }
}

/// Client + cache over a mock transport with an empty in-memory token store.
pub fn harness() -> (Arc<MockTransport>, Arc<MemoryTokenStore>, ApiClient, QueryCache) {
  let mock = MockTransport::new();
  let tokens = Arc::new(MemoryTokenStore::new());
  let client = ApiClient::new(BASE_URL, mock.clone(), tokens.clone()).unwrap();
  let cache = QueryCache::new(CacheSettings::default());
  (mock, tokens, client, cache)
}
