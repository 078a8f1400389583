//! In-process parameter source.

use futures::future::{BoxFuture, FutureExt};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use super::{ParameterSource, RemoteParameter};
use crate::error::{Error, Result};
use crate::filters::{Filter, FilterOption};
use crate::parameter::Value;

/// Parameter source backed by a map, for tests and static overrides.
///
/// Path queries return direct children only. The only filter understood is
/// `Type`, matched against `String` for scalars and `StringList` for lists.
#[derive(Default)]
pub struct MemorySource {
  entries: RwLock<BTreeMap<String, Value>>,
  requests: AtomicUsize,
}

impl MemorySource {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store a value, replacing any previous one.
  pub fn insert(&self, name: impl Into<String>, value: impl Into<Value>) {
    let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
    entries.insert(name.into(), value.into());
  }

  pub fn remove(&self, name: &str) -> Option<Value> {
    let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
    entries.remove(name)
  }

  /// Number of requests served so far, successful or not.
  pub fn requests(&self) -> usize {
    self.requests.load(Ordering::SeqCst)
  }

  fn lookup(&self, name: &str) -> Result<RemoteParameter> {
    self.requests.fetch_add(1, Ordering::SeqCst);

    let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
    entries
      .get(name)
      .map(|value| RemoteParameter::new(name, value.clone()))
      .ok_or_else(|| Error::NotFound {
        name: name.to_string(),
      })
  }

  fn list(&self, path: &str, filters: &[Filter]) -> Result<Vec<RemoteParameter>> {
    self.requests.fetch_add(1, Ordering::SeqCst);

    let prefix = if path.ends_with('/') {
      path.to_string()
    } else {
      format!("{}/", path)
    };

    let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
    let mut found = Vec::new();
    for (name, value) in entries.iter() {
      let Some(rest) = name.strip_prefix(&prefix) else {
        continue;
      };
      if rest.is_empty() || rest.contains('/') {
        continue;
      }
      if matches_filters(value, filters)? {
        found.push(RemoteParameter::new(name.clone(), value.clone()));
      }
    }

    Ok(found)
  }
}

fn matches_filters(value: &Value, filters: &[Filter]) -> Result<bool> {
  let type_name = match value {
    Value::List(_) => "StringList",
    _ => "String",
  };

  for filter in filters {
    if filter.name != "Type" {
      return Err(Error::Remote {
        kind: "InvalidFilterKey".to_string(),
        message: format!("unsupported filter key: {}", filter.name),
      });
    }

    let matched = match filter.option {
      FilterOption::Equals => type_name == filter.value,
      FilterOption::BeginsWith => type_name.starts_with(filter.value.as_str()),
      other => {
        return Err(Error::Remote {
          kind: "InvalidFilterOption".to_string(),
          message: format!("option {} is not valid for Type", other),
        })
      }
    };
    if !matched {
      return Ok(false);
    }
  }

  Ok(true)
}

impl ParameterSource for MemorySource {
  fn get_by_key<'a>(
    &'a self,
    name: &'a str,
    _decrypt: bool,
    _timeout: Duration,
  ) -> BoxFuture<'a, Result<RemoteParameter>> {
    async move { self.lookup(name) }.boxed()
  }

  fn get_by_path<'a>(
    &'a self,
    path: &'a str,
    filters: &'a [Filter],
    _decrypt: bool,
    _timeout: Duration,
  ) -> BoxFuture<'a, Result<Vec<RemoteParameter>>> {
    async move { self.list(path, filters) }.boxed()
  }
}
