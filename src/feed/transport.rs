//! HTTP transport seam between the feed client and the network.

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use url::Url;

use super::error::ApiError;

/// An outgoing GET request
#[derive(Debug, Clone)]
pub struct HttpRequest {
  pub url: Url,
  pub headers: HeaderMap,
}

/// A fully buffered response. Non-success statuses are returned, not raised.
#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: StatusCode,
  pub headers: HeaderMap,
  pub body: Vec<u8>,
}

impl HttpResponse {
  /// Response header as a string, if present and valid UTF-8
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .get(name)
      .and_then(|value| value.to_str().ok())
  }
}

/// Anything able to perform a GET and hand back status, headers and body.
pub trait HttpTransport: Send + Sync {
  fn get(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse, ApiError>> + Send;
}

/// Transport backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new(timeout: Duration) -> Result<Self, ApiError> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("jobboard/", env!("CARGO_PKG_VERSION")))
      .timeout(timeout)
      .build()?;

    Ok(Self { client })
  }
}

impl HttpTransport for ReqwestTransport {
  async fn get(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
    let response = self
      .client
      .get(request.url)
      .headers(request.headers)
      .send()
      .await
      .map_err(|e| {
        if e.is_connect() || e.is_timeout() {
          ApiError::Unavailable(e.to_string())
        } else {
          ApiError::Request(e)
        }
      })?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
      status,
      headers,
      body,
    })
  }
}
