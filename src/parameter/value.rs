//! Payload carried by a cached parameter.

/// A parameter's value: a single string, a list of strings, or nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Value {
  Scalar(String),
  List(Vec<String>),
  #[default]
  Absent,
}

impl Value {
  /// Decode a value the way the parameter store types it.
  ///
  /// `StringList` parameters are stored comma-separated; everything else
  /// (`String`, `SecureString`, unknown types) is kept as a scalar.
  pub fn from_typed(param_type: Option<&str>, raw: String) -> Self {
    match param_type {
      Some("StringList") => Value::List(raw.split(',').map(String::from).collect()),
      _ => Value::Scalar(raw),
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::Scalar(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[String]> {
    match self {
      Value::List(items) => Some(items),
      _ => None,
    }
  }

  pub fn is_absent(&self) -> bool {
    matches!(self, Value::Absent)
  }

  /// Short name of the variant, used in type mismatch errors.
  pub fn kind(&self) -> &'static str {
    match self {
      Value::Scalar(_) => "string",
      Value::List(_) => "string list",
      Value::Absent => "absent",
    }
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::Scalar(s)
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::Scalar(s.to_string())
  }
}

impl From<Vec<String>> for Value {
  fn from(items: Vec<String>) -> Self {
    Value::List(items)
  }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self {
    v.map(Into::into).unwrap_or(Value::Absent)
  }
}

impl std::fmt::Display for Value {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Value::Scalar(s) => write!(f, "{}", s),
      Value::List(items) => write!(f, "{}", items.join(",")),
      Value::Absent => Ok(()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_string_list_is_split() {
    let v = Value::from_typed(Some("StringList"), "a,b,c".to_string());
    assert_eq!(v.as_list(), Some(&["a".to_string(), "b".to_string(), "c".to_string()][..]));
  }

  #[test]
  fn test_secure_string_stays_scalar() {
    let v = Value::from_typed(Some("SecureString"), "a,b".to_string());
    assert_eq!(v.as_str(), Some("a,b"));
  }

  #[test]
  fn test_option_none_is_absent() {
    let v: Value = Option::<String>::None.into();
    assert!(v.is_absent());
    assert_eq!(v.kind(), "absent");
  }

  #[test]
  fn test_display_joins_lists() {
    let v = Value::from(vec!["x".to_string(), "y".to_string()]);
    assert_eq!(v.to_string(), "x,y");
  }
}
