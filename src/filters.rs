//! Filters that narrow a path query on the remote source.

use serde::Serialize;

/// How a filter's value is compared against the remote attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOption {
  BeginsWith,
  Equals,
  Recursive,
  OneLevel,
}

const OPTION_NAMES: [&str; 4] = ["BeginsWith", "Equals", "Recursive", "OneLevel"];

impl FilterOption {
  pub fn as_str(&self) -> &'static str {
    OPTION_NAMES[self.code() as usize]
  }

  pub fn code(&self) -> i32 {
    match self {
      FilterOption::BeginsWith => 0,
      FilterOption::Equals => 1,
      FilterOption::Recursive => 2,
      FilterOption::OneLevel => 3,
    }
  }

  pub fn from_code(code: i32) -> Option<Self> {
    match code {
      0 => Some(FilterOption::BeginsWith),
      1 => Some(FilterOption::Equals),
      2 => Some(FilterOption::Recursive),
      3 => Some(FilterOption::OneLevel),
      _ => None,
    }
  }

  /// Display name for a raw option code; unknown codes map to `""` and are
  /// left for the remote source to reject.
  pub fn code_name(code: i32) -> &'static str {
    Self::from_code(code).map(|o| o.as_str()).unwrap_or("")
  }
}

impl std::fmt::Display for FilterOption {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for FilterOption {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    OPTION_NAMES
      .iter()
      .position(|name| name.eq_ignore_ascii_case(s))
      .and_then(|i| Self::from_code(i as i32))
      .ok_or_else(|| format!("unknown filter option: {}", s))
  }
}

/// A single attribute/operator/value triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
  pub name: String,
  pub option: FilterOption,
  pub value: String,
}

/// Wire form of a filter, as the parameter store expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteFilter {
  pub key: String,
  pub option: String,
  pub values: Vec<String>,
}

impl Filter {
  pub fn to_remote(&self) -> RemoteFilter {
    RemoteFilter {
      key: self.name.clone(),
      option: self.option.to_string(),
      values: vec![self.value.clone()],
    }
  }
}

/// Appends one filter to the list being built.
pub type FilterFn = Box<dyn FnOnce(&mut Vec<Filter>) + Send>;

/// Build a filter list by running each builder in order.
pub fn new_filters(builders: impl IntoIterator<Item = FilterFn>) -> Vec<Filter> {
  let mut filters = Vec::new();
  for build in builders {
    build(&mut filters);
  }
  filters
}

/// Filter on an arbitrary remote attribute.
pub fn filter_attribute(name: &str, value: &str, option: FilterOption) -> FilterFn {
  let filter = Filter {
    name: name.to_string(),
    option,
    value: value.to_string(),
  };
  Box::new(move |filters| filters.push(filter))
}

/// Filter on the KMS key used to encrypt the parameter.
pub fn filter_key_id(value: &str, option: FilterOption) -> FilterFn {
  filter_attribute("KeyId", value, option)
}

/// Filter on the parameter type (`String`, `StringList`, `SecureString`).
pub fn filter_type(value: &str, option: FilterOption) -> FilterFn {
  filter_attribute("Type", value, option)
}
