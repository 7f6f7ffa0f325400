//! Response cache layer that turns 304 answers back into usable responses.

use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use crate::feed::error::ApiError;
use crate::feed::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Transport wrapper remembering the last 200 body per URL.
///
/// When the server answers 304 for a URL with a remembered body, the body is
/// replayed as a 200. Without one, the 304 goes through with an empty body so
/// the caller can treat it as "nothing changed".
pub struct ResponseCacheLayer<T> {
  inner: T,
  bodies: Mutex<HashMap<String, Vec<u8>>>,
}

impl<T: HttpTransport> ResponseCacheLayer<T> {
  /// Create a new cache layer around the given transport.
  pub fn new(inner: T) -> Self {
    Self {
      inner,
      bodies: Mutex::new(HashMap::new()),
    }
  }

  /// Number of URLs with a remembered body.
  #[cfg(test)]
  pub fn len(&self) -> usize {
    self
      .bodies
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<T: HttpTransport> HttpTransport for ResponseCacheLayer<T> {
  async fn get(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
    let key = request.url.to_string();
    let mut response = self.inner.get(request).await?;

    if response.status == StatusCode::OK {
      self
        .bodies
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(key, response.body.clone());
    } else if response.status == StatusCode::NOT_MODIFIED {
      let cached = self
        .bodies
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned();

      match cached {
        Some(body) => {
          debug!(url = %key, "replaying cached body for 304");
          response.status = StatusCode::OK;
          response.body = body;
        }
        None => response.body.clear(),
      }
    }

    Ok(response)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::feed::transport::testing::{json_response, status_response, FakeTransport};
  use reqwest::header::HeaderMap;
  use serde_json::json;
  use url::Url;

  const FEED: &str = "http://jobs.test/api/v1/feed";

  fn get(url: &str) -> HttpRequest {
    HttpRequest {
      url: Url::parse(url).unwrap(),
      headers: HeaderMap::new(),
    }
  }

  #[tokio::test]
  async fn test_replays_last_body_for_same_url() {
    let transport = FakeTransport::new();
    transport.respond(FEED, json_response(&json!({"id": "one"}), Some("\"1\""), None));
    transport.respond(FEED, json_response(&json!({"id": "two"}), Some("\"2\""), None));
    transport.respond(FEED, status_response(StatusCode::NOT_MODIFIED));
    let layer = ResponseCacheLayer::new(transport);

    layer.get(get(FEED)).await.unwrap();
    layer.get(get(FEED)).await.unwrap();
    let replayed = layer.get(get(FEED)).await.unwrap();

    assert_eq!(replayed.status, StatusCode::OK);
    assert_eq!(replayed.body, serde_json::to_vec(&json!({"id": "two"})).unwrap());
    assert_eq!(layer.len(), 1);
  }

  #[tokio::test]
  async fn test_not_modified_without_cached_body_is_empty() {
    let transport = FakeTransport::new();
    let mut not_modified = status_response(StatusCode::NOT_MODIFIED);
    not_modified.body = b"ignored".to_vec();
    transport.respond(FEED, not_modified);
    let layer = ResponseCacheLayer::new(transport);

    let response = layer.get(get(FEED)).await.unwrap();

    assert_eq!(response.status, StatusCode::NOT_MODIFIED);
    assert!(response.body.is_empty());
    assert!(layer.is_empty());
  }

  #[tokio::test]
  async fn test_cache_is_keyed_by_exact_url() {
    let transport = FakeTransport::new();
    let other = "http://jobs.test/api/v1/feed/next";
    transport.respond(FEED, json_response(&json!({"id": "head"}), None, None));
    transport.respond(other, status_response(StatusCode::NOT_MODIFIED));
    let layer = ResponseCacheLayer::new(transport);

    layer.get(get(FEED)).await.unwrap();
    let response = layer.get(get(other)).await.unwrap();

    assert_eq!(response.status, StatusCode::NOT_MODIFIED);
  }

  #[tokio::test]
  async fn test_errors_are_not_cached() {
    let transport = FakeTransport::new();
    transport.respond(FEED, status_response(StatusCode::INTERNAL_SERVER_ERROR));
    transport.fail(FEED, "connection reset");
    let layer = ResponseCacheLayer::new(transport);

    let response = layer.get(get(FEED)).await.unwrap();
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(layer.get(get(FEED)).await.is_err());
    assert!(layer.is_empty());
  }
}
