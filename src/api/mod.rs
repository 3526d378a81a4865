//! HTTP access to the portal backend.
//!
//! - `ApiClient` builds URLs, attaches the bearer token, refreshes it once on 401
//! - `ApiError` is the structured failure every layer above sees
//! - `Page<T>` is the one list shape, whatever envelope the server used

mod client;
mod error;
mod page;
mod transport;

pub use client::{ApiClient, ApiEvent};
pub use error::{ApiError, FieldErrors};
pub use page::{normalize, Page};
pub use reqwest::Method;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
