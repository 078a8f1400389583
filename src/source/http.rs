//! HTTP parameter source speaking the SSM JSON 1.1 protocol.

use futures::future::{BoxFuture, FutureExt};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::api_types::{
  ApiError, GetParameterRequest, GetParameterResponse, GetParametersByPathRequest,
  GetParametersByPathResponse,
};
use super::{ParameterSource, RemoteParameter};
use crate::error::{Error, Result};
use crate::filters::Filter;

const TARGET_PREFIX: &str = "AmazonSSM";
const CONTENT_TYPE_VALUE: &str = "application/x-amz-json-1.1";
const USER_AGENT_VALUE: &str = concat!("paramcache/", env!("CARGO_PKG_VERSION"));
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Parameter source that talks to an SSM-compatible endpoint.
///
/// Requests are sent unsigned; point `endpoint` at a local emulator or a
/// signing proxy. Connection failures, 5xx/429 responses and throttling
/// errors are retried up to `max_retries` times with exponential backoff.
#[derive(Clone)]
pub struct HttpSource {
  client: reqwest::Client,
  endpoint: Url,
  max_retries: u32,
}

impl HttpSource {
  pub fn new(endpoint: &str, max_retries: u32) -> Result<Self> {
    let endpoint = Url::parse(endpoint)?;

    let mut default_headers = HeaderMap::new();
    default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    default_headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_VALUE));

    let client = reqwest::Client::builder()
      .default_headers(default_headers)
      .build()?;

    Ok(Self {
      client,
      endpoint,
      max_retries,
    })
  }

  pub fn endpoint(&self) -> &Url {
    &self.endpoint
  }

  pub fn max_retries(&self) -> u32 {
    self.max_retries
  }

  async fn get_parameter(&self, name: &str, decrypt: bool, timeout: Duration) -> Result<RemoteParameter> {
    let request = GetParameterRequest {
      name,
      with_decryption: decrypt,
    };

    let response: GetParameterResponse = self.call("GetParameter", name, &request, timeout).await?;
    Ok(response.parameter.into_remote())
  }

  async fn get_parameters_by_path(
    &self,
    path: &str,
    filters: &[Filter],
    decrypt: bool,
    timeout: Duration,
  ) -> Result<Vec<RemoteParameter>> {
    let mut all_params = Vec::new();
    let mut next_token = None;

    loop {
      let request = GetParametersByPathRequest {
        path,
        with_decryption: decrypt,
        recursive: false,
        parameter_filters: filters.iter().map(Filter::to_remote).collect(),
        next_token: next_token.take(),
      };

      let response: GetParametersByPathResponse = self
        .call("GetParametersByPath", path, &request, timeout)
        .await?;

      all_params.extend(response.parameters.into_iter().map(|p| p.into_remote()));

      match response.next_token {
        Some(token) if !token.is_empty() => next_token = Some(token),
        _ => break,
      }
    }

    Ok(all_params)
  }

  /// Send one API call, retrying transient failures.
  async fn call<Req, Resp>(&self, op: &str, target: &str, body: &Req, timeout: Duration) -> Result<Resp>
  where
    Req: Serialize,
    Resp: DeserializeOwned,
  {
    let body = serde_json::to_vec(body)?;
    let mut retries = 0;

    loop {
      match self.call_once(op, target, &body, timeout).await {
        Ok(response) => return Ok(response),
        Err(e) if e.is_retryable() && retries < self.max_retries => {
          retries += 1;

          let backoff = backoff_for(retries);
          warn!(
            error = %e,
            op = op,
            retry = retries,
            max_retries = self.max_retries,
            backoff_ms = backoff.as_millis() as u64,
            "retrying request"
          );

          tokio::time::sleep(backoff).await;
        }
        Err(e) => return Err(e),
      }
    }
  }

  async fn call_once<Resp: DeserializeOwned>(
    &self,
    op: &str,
    target: &str,
    body: &[u8],
    timeout: Duration,
  ) -> Result<Resp> {
    debug!(op = op, target = target, "sending request");

    let response = self
      .client
      .post(self.endpoint.clone())
      .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, op))
      .timeout(timeout)
      .body(body.to_vec())
      .send()
      .await?;

    let status = response.status();
    let bytes = response.bytes().await?;

    if status.is_success() {
      return Ok(serde_json::from_slice(&bytes)?);
    }

    if let Ok(api_error) = serde_json::from_slice::<ApiError>(&bytes) {
      match api_error.kind() {
        Some("ParameterNotFound") => {
          return Err(Error::NotFound {
            name: target.to_string(),
          })
        }
        Some(kind) => {
          return Err(Error::Remote {
            kind: kind.to_string(),
            message: api_error.message.clone().unwrap_or_default(),
          })
        }
        None => {}
      }
    }

    Err(Error::Status {
      status: status.as_u16(),
      body: String::from_utf8_lossy(&bytes).into_owned(),
    })
  }
}

/// Exponential backoff starting at 100ms, capped at [`MAX_BACKOFF`].
fn backoff_for(retry: u32) -> Duration {
  let millis = 50u64.saturating_mul(1u64 << retry.min(16));
  Duration::from_millis(millis).min(MAX_BACKOFF)
}

impl ParameterSource for HttpSource {
  fn get_by_key<'a>(
    &'a self,
    name: &'a str,
    decrypt: bool,
    timeout: Duration,
  ) -> BoxFuture<'a, Result<RemoteParameter>> {
    self.get_parameter(name, decrypt, timeout).boxed()
  }

  fn get_by_path<'a>(
    &'a self,
    path: &'a str,
    filters: &'a [Filter],
    decrypt: bool,
    timeout: Duration,
  ) -> BoxFuture<'a, Result<Vec<RemoteParameter>>> {
    self.get_parameters_by_path(path, filters, decrypt, timeout).boxed()
  }
}
