//! Self-refreshing cached parameters backed by an SSM-style parameter store.
//!
//! A [`ParamClient`] fetches values from a [`ParameterSource`] and hands back
//! [`Parameter`]s that remember when they were fetched. Once a parameter's
//! expiry has passed, reading it either fails or, with auto-refresh enabled,
//! re-runs the original lookup through the parameter's [`Refresher`].
//!
//! ```ignore
//! let source = Arc::new(HttpSource::new("http://localhost:4566", 2)?);
//! let client = ParamClient::new(source);
//!
//! let options = ParameterOptions::expiring(Duration::from_secs(300)).auto_refresh(true);
//! let db_host = client.fetch_by_key("/app/db/host", options).await?;
//!
//! let value = db_host.value().await?;
//! ```

pub mod client;
pub mod error;
pub mod filters;
pub mod parameter;
pub mod source;

pub use client::{path, KeyRefresher, ParamClient, DEFAULT_TIMEOUT};
pub use error::{Error, Result};
pub use filters::{
  filter_attribute, filter_key_id, filter_type, new_filters, Filter, FilterFn, FilterOption,
  RemoteFilter,
};
pub use parameter::{FnRefresher, Freshness, Parameter, ParameterOptions, Refresher, Value};
pub use source::{HttpSource, MemorySource, ParameterSource, RemoteParameter};
