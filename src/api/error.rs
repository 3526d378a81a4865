//! Error taxonomy shared by the client, the query cache and the session layer.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Field-level messages, keyed by field name.
///
/// Populated either by client-side validation before a request is sent or
/// from a server 4xx body shaped like `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.0.entry(field.into()).or_default().push(message.into());
  }

  pub fn get(&self, field: &str) -> Option<&[String]> {
    self.0.get(field).map(Vec::as_slice)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
  }

  /// Collect `{"field": ["msg"]}` / `{"field": "msg"}` pairs from a JSON error body.
  fn from_body(body: &Value) -> Self {
    let mut fields = Self::new();
    if let Value::Object(map) = body {
      for (key, value) in map {
        if matches!(key.as_str(), "message" | "detail" | "error" | "code") {
          continue;
        }
        match value {
          Value::Array(items) => {
            for item in items {
              if let Value::String(msg) = item {
                fields.add(key.clone(), msg.clone());
              }
            }
          }
          Value::String(msg) => fields.add(key.clone(), msg.clone()),
          _ => {}
        }
      }
    }
    fields
  }
}

impl fmt::Display for FieldErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (field, messages) in &self.0 {
      if !first {
        write!(f, "; ")?;
      }
      first = false;
      write!(f, "{}: {}", field, messages.join(", "))?;
    }
    Ok(())
  }
}

impl From<validator::ValidationErrors> for FieldErrors {
  fn from(errors: validator::ValidationErrors) -> Self {
    let mut fields = Self::new();
    for (field, errs) in errors.field_errors() {
      for err in errs {
        let message = err
          .message
          .as_ref()
          .map(|m| m.to_string())
          .unwrap_or_else(|| err.code.to_string());
        fields.add(field.to_string(), message);
      }
    }
    fields
  }
}

/// Failure of a request against the portal backend.
///
/// `Clone` so a single failure can be handed to every caller that joined
/// the same in-flight fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
  /// No response was received (connect failure, timeout, TLS, ...).
  #[error("network error: {0}")]
  Transport(String),

  /// The server answered with a non-2xx status other than 401.
  #[error("{message} (status {status})")]
  Http {
    status: u16,
    message: String,
    fields: FieldErrors,
  },

  /// 401, or an expired/invalid token that could not be refreshed.
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  /// Rejected client-side; never reached the network.
  #[error("validation failed: {0}")]
  Validation(FieldErrors),

  /// A batch where only some items went through. `failed` holds the ids
  /// that did not, `first` the first of their errors.
  #[error("{} of {} items failed: {}", .failed.len(), .total, .first)]
  Partial {
    total: usize,
    failed: Vec<String>,
    first: Box<ApiError>,
  },

  /// 2xx response whose body did not match the expected shape.
  #[error("failed to decode response: {0}")]
  Decode(String),
}

impl ApiError {
  /// Build an error from a non-2xx response.
  ///
  /// The message is the server's `message`, `detail` or `error` string,
  /// falling back to a generic status message.
  pub fn from_response(status: u16, body: &[u8]) -> Self {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let message = parsed
      .as_ref()
      .and_then(server_message)
      .unwrap_or_else(|| format!("request failed with status {}", status));

    if status == 401 {
      return ApiError::Unauthorized(message);
    }

    let fields = parsed.as_ref().map(FieldErrors::from_body).unwrap_or_default();
    ApiError::Http {
      status,
      message,
      fields,
    }
  }

  /// HTTP status carried by this error, if the server responded.
  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::Http { status, .. } => Some(*status),
      ApiError::Unauthorized(_) => Some(401),
      _ => None,
    }
  }

  /// Whether this error must end the session (expired or invalid credentials).
  pub fn is_auth_error(&self) -> bool {
    matches!(self, ApiError::Unauthorized(_))
  }

  /// Transport failures and 5xx responses may succeed on a later attempt.
  pub fn is_retryable(&self) -> bool {
    match self {
      ApiError::Transport(_) => true,
      ApiError::Http { status, .. } => *status >= 500,
      _ => false,
    }
  }

  /// Field-level messages, for inline rendering next to form inputs.
  pub fn field_errors(&self) -> Option<&FieldErrors> {
    match self {
      ApiError::Validation(fields) => Some(fields),
      ApiError::Http { fields, .. } if !fields.is_empty() => Some(fields),
      _ => None,
    }
  }
}

impl From<validator::ValidationErrors> for ApiError {
  fn from(errors: validator::ValidationErrors) -> Self {
    ApiError::Validation(errors.into())
  }
}

fn server_message(body: &Value) -> Option<String> {
  ["message", "detail", "error"]
    .iter()
    .find_map(|key| body.get(key).and_then(Value::as_str))
    .filter(|msg| !msg.is_empty())
    .map(str::to_string)
}
