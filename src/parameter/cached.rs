//! Self-refreshing cached parameter.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use super::refresh::Refresher;
use super::value::Value;
use crate::error::{Error, Result};

/// Expiry and refresh policy for a parameter.
///
/// `expiry` is only consulted when `expires` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParameterOptions {
  pub expires: bool,
  pub expiry: Duration,
  pub auto_refresh: bool,
}

impl ParameterOptions {
  /// Options for a value that goes stale `expiry` after each fetch.
  pub fn expiring(expiry: Duration) -> Self {
    Self {
      expires: true,
      expiry,
      auto_refresh: false,
    }
  }

  pub fn auto_refresh(mut self, auto_refresh: bool) -> Self {
    self.auto_refresh = auto_refresh;
    self
  }
}

/// Whether a parameter's value can be used as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
  /// Expiry is disabled, the value is always current
  NonExpiring,
  /// Fetched less than `expiry` ago
  Fresh,
  /// Needs a refresh before it can be read
  Expired,
}

struct State {
  value: Value,
  last_refresh: DateTime<Utc>,
}

/// A named value fetched from a remote source, with optional expiry and
/// automatic refresh.
///
/// Value and refresh timestamp sit behind an async mutex. A refresh holds
/// the lock for the duration of the remote call, so concurrent readers of an
/// expired parameter queue up behind a single fetch instead of racing.
pub struct Parameter {
  name: String,
  options: ParameterOptions,
  refresher: Option<Arc<dyn Refresher>>,
  state: Mutex<State>,
}

impl Parameter {
  /// Create a parameter holding a value that was fetched just now.
  pub fn new(name: impl Into<String>, value: impl Into<Value>, options: ParameterOptions) -> Self {
    Self {
      name: name.into(),
      options,
      refresher: None,
      state: Mutex::new(State {
        value: value.into(),
        last_refresh: Utc::now(),
      }),
    }
  }

  /// Attach the refresher used when an expired value must be re-fetched.
  pub fn with_refresher(mut self, refresher: Arc<dyn Refresher>) -> Self {
    self.refresher = Some(refresher);
    self
  }

  pub fn set_refresher(&mut self, refresher: Arc<dyn Refresher>) {
    self.refresher = Some(refresher);
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn options(&self) -> ParameterOptions {
    self.options
  }

  pub fn has_refresher(&self) -> bool {
    self.refresher.is_some()
  }

  /// When the current value was assigned.
  pub async fn last_refresh(&self) -> DateTime<Utc> {
    self.state.lock().await.last_refresh
  }

  /// The stored value, without any expiry check.
  ///
  /// This is the second half of the two-step read for expiring parameters:
  /// [`Parameter::string_value`] only reports whether the check passed.
  pub async fn cached_value(&self) -> Value {
    self.state.lock().await.value.clone()
  }

  pub async fn freshness(&self) -> Freshness {
    if !self.options.expires {
      return Freshness::NonExpiring;
    }

    let state = self.state.lock().await;
    if self.is_expired(state.last_refresh, Utc::now()) {
      Freshness::Expired
    } else {
      Freshness::Fresh
    }
  }

  /// Overwrite the value and restart the expiry clock.
  pub async fn update_value(&self, value: impl Into<Value>) {
    let mut state = self.state.lock().await;
    state.value = value.into();
    state.last_refresh = Utc::now();
  }

  /// Make sure the value is usable, refreshing it if policy allows.
  ///
  /// Returns `Ok(())` when the value is fresh (or never expires) or was just
  /// refreshed. An expired value fails with [`Error::Expired`] unless
  /// auto-refresh is on; with auto-refresh on and no refresher it fails with
  /// [`Error::NoRefresher`]. A failing refresher's error comes back unchanged
  /// and leaves the previous value and timestamp in place.
  pub async fn refresh_value(&self) -> Result<()> {
    if !self.options.expires {
      return Ok(());
    }

    let mut state = self.state.lock().await;
    self.refresh_locked(&mut state).await
  }

  /// Read the value as a string.
  ///
  /// For an expiring parameter this only runs [`Parameter::refresh_value`]:
  /// on success it returns an empty string and the caller reads the value
  /// with [`Parameter::cached_value`] afterwards. Use [`Parameter::value`]
  /// for a checked read in one call.
  pub async fn string_value(&self) -> Result<String> {
    if self.options.expires {
      return self.refresh_value().await.map(|()| String::new());
    }

    let state = self.state.lock().await;
    match &state.value {
      Value::Scalar(s) => Ok(s.clone()),
      other => Err(self.mismatch("string", other)),
    }
  }

  /// Read the value as a list of strings, with the same two-step contract
  /// as [`Parameter::string_value`] for expiring parameters.
  pub async fn string_list_value(&self) -> Result<Vec<String>> {
    if self.options.expires {
      return self.refresh_value().await.map(|()| Vec::new());
    }

    let state = self.state.lock().await;
    match &state.value {
      Value::List(items) => Ok(items.clone()),
      other => Err(self.mismatch("string list", other)),
    }
  }

  /// Run the expiry check and return the resulting value.
  pub async fn value(&self) -> Result<Value> {
    let mut state = self.state.lock().await;
    if self.options.expires {
      self.refresh_locked(&mut state).await?;
    }
    Ok(state.value.clone())
  }

  async fn refresh_locked(&self, state: &mut State) -> Result<()> {
    if !self.is_expired(state.last_refresh, Utc::now()) {
      return Ok(());
    }

    if !self.options.auto_refresh {
      debug!(name = %self.name, last_refresh = %state.last_refresh, "parameter expired");
      return Err(Error::Expired {
        name: self.name.clone(),
      });
    }

    let refresher = self.refresher.as_ref().ok_or_else(|| Error::NoRefresher {
      name: self.name.clone(),
    })?;

    debug!(name = %self.name, "refreshing expired parameter");
    let value = refresher.refresh(&self.name).await?;

    state.value = value;
    state.last_refresh = Utc::now();
    Ok(())
  }

  fn is_expired(&self, last_refresh: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    // An expiry too large for chrono never elapses
    let Ok(expiry) = chrono::Duration::from_std(self.options.expiry) else {
      return false;
    };

    match last_refresh.checked_add_signed(expiry) {
      Some(valid_until) => valid_until <= now,
      None => false,
    }
  }

  fn mismatch(&self, expected: &'static str, found: &Value) -> Error {
    Error::TypeMismatch {
      name: self.name.clone(),
      expected,
      found: found.kind(),
    }
  }

  #[cfg(test)]
  pub(crate) async fn backdate(&self, at: DateTime<Utc>) {
    self.state.lock().await.last_refresh = at;
  }
}

impl std::fmt::Debug for Parameter {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Parameter")
      .field("name", &self.name)
      .field("options", &self.options)
      .field("has_refresher", &self.refresher.is_some())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parameter::FnRefresher;
  use std::sync::atomic::{AtomicU32, Ordering};

  fn an_hour_ago() -> DateTime<Utc> {
    Utc::now() - chrono::Duration::hours(1)
  }

  fn returning(value: &'static str) -> Arc<dyn Refresher> {
    Arc::new(FnRefresher::new(move |_| async move { Ok::<_, Error>(Value::from(value)) }))
  }

  fn failing() -> Arc<dyn Refresher> {
    Arc::new(FnRefresher::new(|name| async move {
      Err::<Value, _>(Error::Remote {
        kind: "InternalServerError".to_string(),
        message: format!("cannot fetch {}", name),
      })
    }))
  }

  #[tokio::test]
  async fn test_non_expiring_returns_value() {
    let p = Parameter::new("foo", "bar", ParameterOptions::default());
    p.backdate(an_hour_ago()).await;

    assert_eq!(p.string_value().await.unwrap(), "bar");
    assert_eq!(p.freshness().await, Freshness::NonExpiring);
    assert!(p.refresh_value().await.is_ok());
  }

  #[tokio::test]
  async fn test_non_expiring_type_mismatch() {
    let p = Parameter::new("foo", vec!["a".to_string()], ParameterOptions::default());

    match p.string_value().await {
      Err(Error::TypeMismatch { expected, found, .. }) => {
        assert_eq!(expected, "string");
        assert_eq!(found, "string list");
      }
      other => panic!("expected type mismatch, got {:?}", other),
    }
    assert_eq!(p.string_list_value().await.unwrap(), vec!["a".to_string()]);
  }

  #[tokio::test]
  async fn test_fresh_value_is_untouched() {
    let p = Parameter::new("foo", "test", ParameterOptions::expiring(Duration::from_secs(3600)))
      .with_refresher(failing());
    let before = p.last_refresh().await;

    assert!(p.refresh_value().await.is_ok());
    assert_eq!(p.cached_value().await, Value::from("test"));
    assert_eq!(p.last_refresh().await, before);
    assert_eq!(p.freshness().await, Freshness::Fresh);
  }

  #[tokio::test]
  async fn test_expired_without_auto_refresh() {
    let p = Parameter::new("foo", "test", ParameterOptions::expiring(Duration::from_secs(1)))
      .with_refresher(returning("new"));
    let past = an_hour_ago();
    p.backdate(past).await;

    assert!(matches!(p.refresh_value().await, Err(Error::Expired { .. })));
    assert_eq!(p.cached_value().await, Value::from("test"));
    assert_eq!(p.last_refresh().await, past);
    assert_eq!(p.freshness().await, Freshness::Expired);
  }

  #[tokio::test]
  async fn test_auto_refresh_without_refresher() {
    let options = ParameterOptions::expiring(Duration::from_secs(1)).auto_refresh(true);
    let p = Parameter::new("foo", "test", options);
    p.backdate(an_hour_ago()).await;

    assert!(matches!(
      p.refresh_value().await,
      Err(Error::NoRefresher { name }) if name == "foo"
    ));
  }

  #[tokio::test]
  async fn test_auto_refresh_success() {
    let options = ParameterOptions::expiring(Duration::from_secs(1)).auto_refresh(true);
    let p = Parameter::new("foo", "bar", options).with_refresher(returning("baz"));
    let past = an_hour_ago();
    p.backdate(past).await;

    let invoked_at = Utc::now();
    assert!(p.refresh_value().await.is_ok());
    assert_eq!(p.cached_value().await, Value::from("baz"));
    assert!(p.last_refresh().await >= invoked_at);
    assert_eq!(p.freshness().await, Freshness::Fresh);
  }

  #[tokio::test]
  async fn test_auto_refresh_failure_keeps_state() {
    let options = ParameterOptions::expiring(Duration::from_secs(1)).auto_refresh(true);
    let p = Parameter::new("foo", "bar", options).with_refresher(failing());
    let past = an_hour_ago();
    p.backdate(past).await;

    match p.refresh_value().await {
      Err(Error::Remote { kind, message }) => {
        assert_eq!(kind, "InternalServerError");
        assert_eq!(message, "cannot fetch foo");
      }
      other => panic!("expected refresher error, got {:?}", other),
    }
    assert_eq!(p.cached_value().await, Value::from("bar"));
    assert_eq!(p.last_refresh().await, past);

    // Still expired, so the next read tries again
    assert!(p.refresh_value().await.is_err());
  }

  #[tokio::test]
  async fn test_expired_then_refreshed_scenario() {
    let p = Parameter::new("foo", "bar", ParameterOptions::expiring(Duration::from_secs(1)));
    p.backdate(an_hour_ago()).await;
    assert!(matches!(p.refresh_value().await, Err(Error::Expired { .. })));

    let options = ParameterOptions::expiring(Duration::from_secs(1)).auto_refresh(true);
    let p = Parameter::new("foo", "bar", options).with_refresher(returning("baz"));
    p.backdate(an_hour_ago()).await;
    assert!(p.refresh_value().await.is_ok());
    assert_eq!(p.cached_value().await, Value::from("baz"));
  }

  #[tokio::test]
  async fn test_string_value_on_expiring_is_two_step() {
    let options = ParameterOptions::expiring(Duration::from_secs(1)).auto_refresh(true);
    let p = Parameter::new("foo", "bar", options).with_refresher(returning("baz"));
    p.backdate(an_hour_ago()).await;

    // The checked read reports success but not the value
    assert_eq!(p.string_value().await.unwrap(), "");
    assert_eq!(p.cached_value().await.as_str(), Some("baz"));

    // Fresh now, still empty
    assert_eq!(p.string_value().await.unwrap(), "");
  }

  #[tokio::test]
  async fn test_string_value_surfaces_expiry() {
    let p = Parameter::new("foo", "bar", ParameterOptions::expiring(Duration::from_secs(1)));
    p.backdate(an_hour_ago()).await;

    assert!(matches!(p.string_value().await, Err(Error::Expired { .. })));
  }

  #[tokio::test]
  async fn test_value_refreshes_in_one_call() {
    let options = ParameterOptions::expiring(Duration::from_secs(1)).auto_refresh(true);
    let p = Parameter::new("foo", "bar", options).with_refresher(returning("baz"));
    p.backdate(an_hour_ago()).await;

    assert_eq!(p.value().await.unwrap(), Value::from("baz"));
  }

  #[tokio::test]
  async fn test_update_value_twice() {
    let p = Parameter::new("foo", "bar", ParameterOptions::expiring(Duration::from_secs(1)));
    p.backdate(an_hour_ago()).await;

    p.update_value("x").await;
    let first = p.last_refresh().await;

    let past = an_hour_ago();
    p.backdate(past).await;
    let before_second = Utc::now();
    p.update_value("x").await;
    let second = p.last_refresh().await;

    assert_eq!(p.cached_value().await, Value::from("x"));
    assert!(second > past);
    assert!(second >= before_second);
    assert!(second >= first);
    assert_eq!(p.freshness().await, Freshness::Fresh);
  }

  #[tokio::test]
  async fn test_concurrent_reads_fetch_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let refresher = FnRefresher::new(move |_| {
      let counter = counter.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let n = counter.fetch_add(1, Ordering::SeqCst);
        Ok::<_, Error>(Value::from(format!("v{}", n)))
      }
    });

    let options = ParameterOptions::expiring(Duration::from_secs(3600)).auto_refresh(true);
    let p = Arc::new(Parameter::new("foo", "bar", options).with_refresher(Arc::new(refresher)));
    p.backdate(Utc::now() - chrono::Duration::hours(2)).await;

    let handles: Vec<_> = (0..5)
      .map(|_| {
        let p = p.clone();
        tokio::spawn(async move { p.value().await })
      })
      .collect();

    for handle in handles {
      assert_eq!(handle.await.unwrap().unwrap(), Value::from("v0"));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_huge_expiry_never_elapses() {
    let p = Parameter::new("foo", "bar", ParameterOptions::expiring(Duration::MAX));
    p.backdate(an_hour_ago()).await;

    assert_eq!(p.freshness().await, Freshness::Fresh);
  }
}
