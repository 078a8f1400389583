//! Client that fetches parameters from a source and wires up their refresh.

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::filters::Filter;
use crate::parameter::{Parameter, ParameterOptions, Refresher, Value};
use crate::source::ParameterSource;

/// Default bound on every remote call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Parameter store client.
///
/// Every remote call is bounded by the client's timeout; a call that runs
/// over is dropped and reported as [`Error::Timeout`]. Retrying is left to
/// the source's transport.
#[derive(Clone)]
pub struct ParamClient {
  source: Arc<dyn ParameterSource>,
  timeout: Duration,
}

impl ParamClient {
  pub fn new(source: Arc<dyn ParameterSource>) -> Self {
    Self {
      source,
      timeout: DEFAULT_TIMEOUT,
    }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn set_timeout(&mut self, timeout: Duration) {
    self.timeout = timeout;
  }

  pub fn timeout(&self) -> Duration {
    self.timeout
  }

  /// Fetch one parameter and return it with a refresher that repeats the
  /// same lookup.
  pub async fn fetch_by_key(&self, key: &str, options: ParameterOptions) -> Result<Parameter> {
    debug!(key = key, "fetching parameter");

    let remote = bounded(
      key,
      self.timeout,
      self.source.get_by_key(key, true, self.timeout),
    )
    .await?;

    let parameter = Parameter::new(remote.name, remote.value, options).with_refresher(self.refresher_for(key));
    Ok(parameter)
  }

  /// Fetch every parameter directly under `path` that passes `filters`.
  ///
  /// Each parameter refreshes on its own, by name. An empty answer is
  /// reported as [`Error::NoParameters`].
  pub async fn fetch_by_path(
    &self,
    path: &str,
    filters: &[Filter],
    options: ParameterOptions,
  ) -> Result<Vec<Parameter>> {
    debug!(path = path, filters = filters.len(), "fetching parameters by path");

    let remotes = bounded(
      path,
      self.timeout,
      self.source.get_by_path(path, filters, true, self.timeout),
    )
    .await?;

    if remotes.is_empty() {
      return Err(Error::NoParameters {
        path: path.to_string(),
      });
    }

    let parameters = remotes
      .into_iter()
      .map(|remote| {
        let refresher = self.refresher_for(&remote.name);
        Parameter::new(remote.name, remote.value, options).with_refresher(refresher)
      })
      .collect();

    Ok(parameters)
  }

  fn refresher_for(&self, key: &str) -> Arc<dyn Refresher> {
    Arc::new(KeyRefresher {
      source: Arc::clone(&self.source),
      key: key.to_string(),
      timeout: self.timeout,
    })
  }
}

/// Refresher that re-fetches a fixed key from a source.
pub struct KeyRefresher {
  source: Arc<dyn ParameterSource>,
  key: String,
  timeout: Duration,
}

impl KeyRefresher {
  pub fn new(source: Arc<dyn ParameterSource>, key: impl Into<String>, timeout: Duration) -> Self {
    Self {
      source,
      key: key.into(),
      timeout,
    }
  }

  pub fn key(&self) -> &str {
    &self.key
  }
}

impl Refresher for KeyRefresher {
  fn refresh<'a>(&'a self, _name: &'a str) -> BoxFuture<'a, Result<Value>> {
    async move {
      let remote = bounded(
        &self.key,
        self.timeout,
        self.source.get_by_key(&self.key, true, self.timeout),
      )
      .await?;
      Ok(remote.value)
    }
    .boxed()
  }
}

async fn bounded<T>(target: &str, timeout: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
  match tokio::time::timeout(timeout, call).await {
    Ok(result) => result,
    Err(_) => Err(Error::Timeout {
      target: target.to_string(),
      timeout,
    }),
  }
}

/// Join segments into an absolute parameter path.
///
/// `path(&["foo", "bar"])` is `"/foo/bar"`.
pub fn path(segments: &[&str]) -> String {
  format!("/{}", segments.join("/"))
}
