//! Remote parameter sources.
//!
//! A source answers two questions: what is the value stored under a key, and
//! what is stored directly under a path. It reports transport failures as
//! errors and never caches anything itself; caching and expiry are the
//! [`Parameter`](crate::parameter::Parameter)'s job.

mod api_types;
mod http;
mod memory;

use futures::future::BoxFuture;
use std::time::Duration;

use crate::error::Result;
use crate::filters::Filter;
use crate::parameter::Value;

pub use http::HttpSource;
pub use memory::MemorySource;

/// A name/value pair as returned by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteParameter {
  pub name: String,
  pub value: Value,
}

impl RemoteParameter {
  pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
    Self {
      name: name.into(),
      value: value.into(),
    }
  }
}

/// Upstream store that parameters are fetched from.
pub trait ParameterSource: Send + Sync {
  /// Fetch a single parameter by its full name.
  fn get_by_key<'a>(
    &'a self,
    name: &'a str,
    decrypt: bool,
    timeout: Duration,
  ) -> BoxFuture<'a, Result<RemoteParameter>>;

  /// Fetch the parameters stored directly under `path`.
  ///
  /// An empty vector is a successful answer, not an error.
  fn get_by_path<'a>(
    &'a self,
    path: &'a str,
    filters: &'a [Filter],
    decrypt: bool,
    timeout: Duration,
  ) -> BoxFuture<'a, Result<Vec<RemoteParameter>>>;
}
