//! Data layer for the school management portal: REST client, query cache,
//! session state and typed resource bindings.
//!
//! ```ignore
//! let config = Config::load(None)?;
//! let _guard = observability::init_logging(&config.logging)?;
//! let portal = Portal::new(&config)?;
//! portal.session().listen();
//! portal.session().start().await;
//!
//! let mut students = portal.students().list(&Filters::new().with("search", "ada"));
//! let page = students.load().await?;
//! ```

pub mod api;
pub mod config;
pub mod observability;
pub mod portal;
pub mod query;
pub mod resources;
pub mod session;
pub mod views;

#[cfg(test)]
mod test_support;

pub use api::{ApiClient, ApiError, Page};
pub use config::Config;
pub use portal::Portal;
pub use query::{Filters, Mutation, Query, QueryCache, QueryKey, QueryOptions};
pub use session::{AuthState, RouteDecision, Session};
