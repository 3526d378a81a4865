//! Query/mutation cache.
//!
//! Reads go through a `QueryCache` keyed by `QueryKey`; writes go through a
//! `Mutation` whose `MutationSpec` says which keys become stale.

mod cache;
mod filters;
pub mod invalidation;
mod key;
mod mutation;
mod observer;
mod state;

pub use cache::{CacheSettings, FetchOptions, FetchResult, Fetcher, QueryCache};
pub use filters::{FilterValue, Filters};
pub use invalidation::MutationSpec;
pub use key::QueryKey;
pub use mutation::Mutation;
pub use observer::{fetcher, Query, QueryOptions};
pub use state::{QuerySnapshot, QueryState, QueryStatus};
