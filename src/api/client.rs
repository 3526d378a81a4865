//! Authenticated JSON client for the portal REST backend.

use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;

use super::error::ApiError;
use super::page::{self, Page};
use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::session::TokenStore;

const REFRESH_PATH: &str = "/auth/token/refresh/";

/// Signals the client raises for the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiEvent {
  /// A request failed with 401 and the token could not be refreshed.
  Unauthorized,
  /// The access token was replaced using the refresh token.
  TokenRefreshed,
}

/// Single point of outgoing request construction.
///
/// Cheap to clone; all clones share the transport, token store and event
/// channel.
#[derive(Clone)]
pub struct ApiClient {
  inner: Arc<ClientInner>,
}

struct ClientInner {
  base_url: String,
  transport: Arc<dyn Transport>,
  tokens: Arc<dyn TokenStore>,
  events: broadcast::Sender<ApiEvent>,
}

impl ApiClient {
  pub fn new(
    base_url: &str,
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenStore>,
  ) -> Result<Self> {
    Url::parse(base_url).map_err(|e| eyre!("Invalid API base URL '{}': {}", base_url, e))?;
    let (events, _) = broadcast::channel(16);

    Ok(Self {
      inner: Arc::new(ClientInner {
        base_url: base_url.trim_end_matches('/').to_string(),
        transport,
        tokens,
        events,
      }),
    })
  }

  pub fn base_url(&self) -> &str {
    &self.inner.base_url
  }

  pub fn tokens(&self) -> &Arc<dyn TokenStore> {
    &self.inner.tokens
  }

  /// Subscribe to client events (forced logout, token refresh).
  pub fn events(&self) -> broadcast::Receiver<ApiEvent> {
    self.inner.events.subscribe()
  }

  /// Resolve a backend path (`/students/`) against the base URL.
  pub fn url(&self, path: &str) -> Result<Url, ApiError> {
    let path = if path.starts_with('/') {
      path.to_string()
    } else {
      format!("/{}", path)
    };
    let raw = format!("{}{}", self.inner.base_url, path);
    Url::parse(&raw).map_err(|e| ApiError::Transport(format!("invalid url {}: {}", raw, e)))
  }

  pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    self.request(Method::GET, path, None).await
  }

  /// GET a list endpoint and normalize the response into a `Page`.
  pub async fn get_page<T: DeserializeOwned>(&self, path: &str) -> Result<Page<T>, ApiError> {
    let body: Value = self.request(Method::GET, path, None).await?;
    page::normalize(body)
  }

  pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<T, ApiError> {
    self.request(Method::POST, path, Some(encode(body)?)).await
  }

  /// POST with no request body (action endpoints like `mark_paid/`).
  pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    self.request(Method::POST, path, None).await
  }

  pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<T, ApiError> {
    self.request(Method::PUT, path, Some(encode(body)?)).await
  }

  pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<T, ApiError> {
    self.request(Method::PATCH, path, Some(encode(body)?)).await
  }

  pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    self.request(Method::DELETE, path, None).await
  }

  /// Issue a request and decode the JSON response.
  ///
  /// Non-2xx responses become `ApiError`s. A 401 triggers one refresh
  /// attempt; if that fails the session layer is notified.
  pub async fn request<T: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    body: Option<Value>,
  ) -> Result<T, ApiError> {
    let url = self.url(path)?;
    let started = Instant::now();

    let mut response = self.send(method.clone(), url.clone(), body.clone()).await?;

    if response.status == 401 && path != REFRESH_PATH && self.try_refresh().await {
      response = self.send(method.clone(), url, body).await?;
    }

    debug!(
      method = %method,
      path,
      status = response.status,
      latency_ms = started.elapsed().as_millis() as u64,
      "request completed"
    );

    if !response.is_success() {
      let err = ApiError::from_response(response.status, &response.body);
      if err.is_auth_error() {
        self.drop_credentials();
        let _ = self.inner.events.send(ApiEvent::Unauthorized);
      }
      warn!(method = %method, path, error = %err, "request failed");
      return Err(err);
    }

    decode(&response.body)
  }

  async fn send(
    &self,
    method: Method,
    url: Url,
    body: Option<Value>,
  ) -> Result<HttpResponse, ApiError> {
    let request = HttpRequest {
      method,
      url,
      bearer: self.access_token(),
      body,
    };
    self.inner.transport.send(request).await
  }

  fn access_token(&self) -> Option<String> {
    match self.inner.tokens.access_token() {
      Ok(token) => token,
      Err(e) => {
        warn!(error = %e, "failed to read access token");
        None
      }
    }
  }

  /// Forget stored tokens once the backend has rejected them for good.
  fn drop_credentials(&self) {
    if !self.inner.tokens.has_token() {
      return;
    }
    match self.inner.tokens.clear() {
      Ok(()) => debug!("cleared rejected credentials"),
      Err(e) => warn!(error = %e, "failed to clear rejected credentials"),
    }
  }

  /// Exchange the refresh token for a new access token. Returns whether the
  /// original request should be retried.
  async fn try_refresh(&self) -> bool {
    let refresh = match self.inner.tokens.refresh_token() {
      Ok(Some(refresh)) => refresh,
      Ok(None) => return false,
      Err(e) => {
        warn!(error = %e, "failed to read refresh token");
        return false;
      }
    };

    let url = match self.url(REFRESH_PATH) {
      Ok(url) => url,
      Err(_) => return false,
    };
    let request = HttpRequest {
      method: Method::POST,
      url,
      bearer: None,
      body: Some(json!({ "refresh": refresh })),
    };

    let response = match self.inner.transport.send(request).await {
      Ok(response) if response.is_success() => response,
      Ok(response) => {
        debug!(status = response.status, "token refresh rejected");
        return false;
      }
      Err(e) => {
        warn!(error = %e, "token refresh failed");
        return false;
      }
    };

    let new_access = serde_json::from_slice::<Value>(&response.body)
      .ok()
      .and_then(|body| {
        body
          .get("access")
          .or_else(|| body.get("access_token"))
          .and_then(Value::as_str)
          .map(str::to_string)
      });

    match new_access {
      Some(access) => {
        if let Err(e) = self.inner.tokens.set_access_token(&access) {
          warn!(error = %e, "failed to store refreshed access token");
          return false;
        }
        debug!("access token refreshed");
        let _ = self.inner.events.send(ApiEvent::TokenRefreshed);
        true
      }
      None => false,
    }
  }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
  serde_json::to_value(body)
    .map_err(|e| ApiError::Decode(format!("failed to encode request body: {}", e)))
}

/// Empty bodies (204, bare DELETE) decode as JSON `null`.
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
  if body.iter().all(u8::is_ascii_whitespace) {
    return serde_json::from_value(Value::Null).map_err(|e| ApiError::Decode(e.to_string()));
  }
  serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
}
