//! The network seam under `ApiClient`.
//!
//! Production code sends requests with `reqwest`; tests swap in a scripted
//! transport so the cache and session layers run without a server.

use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::error::ApiError;

/// A fully-resolved outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
  pub method: Method,
  pub url: Url,
  pub bearer: Option<String>,
  pub body: Option<Value>,
}

/// Raw response: status plus body bytes, decoded by the client.
#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl HttpResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Sends one request. Transport-level failures (no response) map to
/// `ApiError::Transport`; any received status is returned as a response.
pub trait Transport: Send + Sync {
  fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ApiError>>;
}

/// `reqwest`-backed transport.
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new(timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!("school-portal/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

impl Transport for ReqwestTransport {
  fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, ApiError>> {
    Box::pin(async move {
      let mut builder = self.client.request(request.method, request.url);
      if let Some(token) = request.bearer {
        builder = builder.bearer_auth(token);
      }
      if let Some(body) = request.body {
        builder = builder.json(&body);
      }

      let response = builder
        .send()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

      let status = response.status().as_u16();
      let body = response
        .bytes()
        .await
        .map_err(|e| ApiError::Transport(format!("failed to read response body: {}", e)))?;

      Ok(HttpResponse {
        status,
        body: body.to_vec(),
      })
    })
  }
}
