//! Refresher trait: how an expired parameter obtains a new value.

use futures::future::BoxFuture;

use super::value::Value;
use crate::error::Result;

/// Fetches a fresh value for a parameter.
///
/// Implementations hold whatever the original fetch needed (key, source
/// handle, timeout) so a refresh repeats the identical query. The parameter
/// calls this with its own name while holding its state lock, so a refresher
/// must not read back into the parameter it is refreshing. The returned
/// value replaces the parameter's value and restarts its expiry clock; an
/// error leaves both untouched.
pub trait Refresher: Send + Sync {
  fn refresh<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Value>>;
}

/// Adapts a closure into a [`Refresher`].
///
/// ```ignore
/// let refresher = FnRefresher::new(|_name| async { Ok::<_, Error>(Value::from("baz")) });
/// ```
pub struct FnRefresher<F> {
  f: F,
}

impl<F, Fut> FnRefresher<F>
where
  F: Fn(String) -> Fut + Send + Sync,
  Fut: std::future::Future<Output = Result<Value>> + Send + 'static,
{
  pub fn new(f: F) -> Self {
    Self { f }
  }
}

impl<F, Fut> Refresher for FnRefresher<F>
where
  F: Fn(String) -> Fut + Send + Sync,
  Fut: std::future::Future<Output = Result<Value>> + Send + 'static,
{
  fn refresh<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Value>> {
    Box::pin((self.f)(name.to_string()))
  }
}
