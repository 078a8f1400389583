//! Error types for cached parameters and their remote sources.

use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything a parameter read, refresh or remote fetch can fail with.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// Value is stale and the parameter is not configured to auto-refresh.
  #[error("parameter {name} expired")]
  Expired { name: String },

  /// Auto-refresh is enabled but nothing was supplied to perform it.
  #[error("no refresh function supplied for parameter {name}")]
  NoRefresher { name: String },

  /// A path query matched nothing.
  #[error("no parameters found under {path}")]
  NoParameters { path: String },

  /// Stored value is not of the shape the caller asked for.
  #[error("parameter {name} holds a {found} value, expected {expected}")]
  TypeMismatch {
    name: String,
    expected: &'static str,
    found: &'static str,
  },

  /// Remote call did not finish within the client's timeout.
  #[error("request for {target} timed out after {timeout:?}")]
  Timeout { target: String, timeout: Duration },

  /// Source has no parameter with this name.
  #[error("parameter not found: {name}")]
  NotFound { name: String },

  /// Source answered with a typed error of its own.
  #[error("remote error ({kind}): {message}")]
  Remote { kind: String, message: String },

  /// Source answered with a non-success status and no typed error body.
  #[error("unexpected status {status}: {body}")]
  Status { status: u16, body: String },

  #[error("invalid endpoint: {0}")]
  InvalidEndpoint(#[from] url::ParseError),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("failed to decode response: {0}")]
  Decode(#[from] serde_json::Error),
}

impl Error {
  /// Whether a transport should try the same request again.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Http(e) => e.is_connect() || e.is_timeout(),
      Self::Status { status, .. } => *status >= 500 || *status == 429,
      Self::Remote { kind, .. } => kind.ends_with("ThrottlingException"),
      _ => false,
    }
  }
}
