//! Serde types matching the parameter store's JSON 1.1 API.
//!
//! These are kept apart from [`RemoteParameter`] so the wire shape can follow
//! the service's PascalCase naming without leaking into the rest of the crate.

use serde::{Deserialize, Serialize};

use super::RemoteParameter;
use crate::filters::RemoteFilter;
use crate::parameter::Value;

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetParameterRequest<'a> {
  pub name: &'a str,
  pub with_decryption: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetParametersByPathRequest<'a> {
  pub path: &'a str,
  pub with_decryption: bool,
  pub recursive: bool,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub parameter_filters: Vec<RemoteFilter>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub next_token: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiParameter {
  pub name: String,
  #[serde(rename = "Type")]
  pub param_type: Option<String>,
  #[serde(default)]
  pub value: String,
}

impl ApiParameter {
  pub fn into_remote(self) -> RemoteParameter {
    let value = Value::from_typed(self.param_type.as_deref(), self.value);
    RemoteParameter {
      name: self.name,
      value,
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetParameterResponse {
  pub parameter: ApiParameter,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetParametersByPathResponse {
  #[serde(default)]
  pub parameters: Vec<ApiParameter>,
  pub next_token: Option<String>,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Deserialize)]
pub struct ApiError {
  #[serde(rename = "__type")]
  pub error_type: Option<String>,
  #[serde(default, alias = "Message")]
  pub message: Option<String>,
}

impl ApiError {
  /// Error type without the `namespace#` prefix some endpoints add.
  pub fn kind(&self) -> Option<&str> {
    self
      .error_type
      .as_deref()
      .map(|t| t.rsplit('#').next().unwrap_or(t))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_string_list_response() {
    let body = r#"{"Parameter":{"Name":"/a","Type":"StringList","Value":"x,y","Version":3}}"#;
    let resp: GetParameterResponse = serde_json::from_str(body).unwrap();
    let param = resp.parameter.into_remote();

    assert_eq!(param.name, "/a");
    assert_eq!(param.value, Value::List(vec!["x".to_string(), "y".to_string()]));
  }

  #[test]
  fn test_error_kind_strips_namespace() {
    let body = r#"{"__type":"com.amazonaws.ssm#ParameterNotFound","message":""}"#;
    let err: ApiError = serde_json::from_str(body).unwrap();
    assert_eq!(err.kind(), Some("ParameterNotFound"));
  }

  #[test]
  fn test_path_request_omits_empty_fields() {
    let req = GetParametersByPathRequest {
      path: "/app",
      with_decryption: true,
      recursive: false,
      parameter_filters: Vec::new(),
      next_token: None,
    };

    assert_eq!(
      serde_json::to_value(&req).unwrap(),
      serde_json::json!({"Path": "/app", "WithDecryption": true, "Recursive": false})
    );
  }
}
