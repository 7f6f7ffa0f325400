use reqwest::header::{
  HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, IF_MODIFIED_SINCE, IF_NONE_MATCH,
};
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;

use super::api_types::{ApiFeedEntry, ApiFeedPage};
use super::error::ApiError;
use super::transport::{HttpRequest, HttpResponse, HttpTransport};
use super::types::{FeedEntry, FeedPage, FeedRequest, Fetched, Validators};

/// Feed API client wrapper
pub struct FeedClient<T> {
  transport: T,
  base_url: Url,
  token: String,
}

impl<T: HttpTransport> FeedClient<T> {
  pub fn new(transport: T, config: &ApiConfig, token: String) -> Result<Self, ApiError> {
    let mut base_url = Url::parse(&config.url)?;
    base_url
      .path_segments_mut()
      .map_err(|_| ApiError::BaseUrl(config.url.clone()))?
      .pop_if_empty()
      .push(&config.version);

    Ok(Self {
      transport,
      base_url,
      token,
    })
  }

  /// URL for a feed request.
  ///
  /// A refresh with a token revalidates that window directly; otherwise the
  /// `Latest` sentinel wins over a token, and no token means the feed head.
  pub fn feed_url(&self, request: &FeedRequest) -> Result<Url, ApiError> {
    match (&request.next_token, request.is_refresh) {
      (Some(token), true) => self.endpoint(&["feed", token.as_str()]),
      _ if request.is_latest() => {
        let mut url = self.endpoint(&["feed"])?;
        url.query_pairs_mut().append_pair("last", "true");
        Ok(url)
      }
      (Some(token), false) => self.endpoint(&["feed", token.as_str()]),
      (None, _) => self.endpoint(&["feed"]),
    }
  }

  pub fn entry_url(&self, id: &str) -> Result<Url, ApiError> {
    self.endpoint(&["feedentry", id])
  }

  /// Fetch one feed window
  pub async fn fetch_feed(&self, request: &FeedRequest) -> Result<Fetched<FeedPage>, ApiError> {
    let url = self.feed_url(request)?;
    let response = self.get(url, &request.validators()).await?;

    decode(response, |body| {
      let page: ApiFeedPage = serde_json::from_slice(body)?;
      page
        .into_page()
        .ok_or(ApiError::Malformed("feed response has no items"))
    })
  }

  /// Fetch a single job entry
  pub async fn fetch_entry(
    &self,
    id: &str,
    validators: &Validators,
  ) -> Result<Fetched<FeedEntry>, ApiError> {
    let url = self.entry_url(id)?;
    let response = self.get(url, validators).await?;

    decode(response, |body| {
      let entry: ApiFeedEntry = serde_json::from_slice(body)?;
      Ok(entry.into())
    })
  }

  async fn get(&self, url: Url, validators: &Validators) -> Result<HttpResponse, ApiError> {
    let headers = self.headers(validators)?;
    debug!(%url, "GET");
    self.transport.get(HttpRequest { url, headers }).await
  }

  /// Accept and auth headers, plus `If-None-Match` or, failing that,
  /// `If-Modified-Since`.
  fn headers(&self, validators: &Validators) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.token))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    if let Some(etag) = &validators.etag {
      headers.insert(IF_NONE_MATCH, HeaderValue::from_str(etag)?);
    } else if let Some(since) = &validators.modified_since {
      headers.insert(IF_MODIFIED_SINCE, HeaderValue::from_str(since)?);
    }

    Ok(headers)
  }

  fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| ApiError::BaseUrl(self.base_url.to_string()))?
      .extend(segments);
    Ok(url)
  }
}

/// Map a raw response to a conditional fetch outcome.
fn decode<D, F>(response: HttpResponse, parse: F) -> Result<Fetched<D>, ApiError>
where
  F: FnOnce(&[u8]) -> Result<D, ApiError>,
{
  if response.status == StatusCode::NOT_MODIFIED {
    return Ok(Fetched::NotModified);
  }
  if !response.status.is_success() {
    return Err(ApiError::HttpStatus(response.status.as_u16()));
  }

  let etag = response.header("etag").map(String::from);
  let last_modified = response.header("last-modified").map(String::from);
  let data = parse(&response.body)?;

  Ok(Fetched::Updated {
    data,
    etag,
    last_modified,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::feed::transport::testing::{json_response, status_response, FakeTransport};
  use serde_json::json;

  fn client(transport: FakeTransport) -> FeedClient<FakeTransport> {
    let config = ApiConfig {
      url: "http://jobs.test/api".to_string(),
      version: "v1".to_string(),
      timeout_secs: 30,
    };
    FeedClient::new(transport, &config, "secret".to_string()).unwrap()
  }

  #[test]
  fn test_feed_url_selection() {
    let client = client(FakeTransport::new());

    let url = |request: FeedRequest| client.feed_url(&request).unwrap().to_string();

    assert_eq!(url(FeedRequest::head()), "http://jobs.test/api/v1/feed");
    assert_eq!(url(FeedRequest::page("abc")), "http://jobs.test/api/v1/feed/abc");
    assert_eq!(url(FeedRequest::latest()), "http://jobs.test/api/v1/feed?last=true");
    assert_eq!(
      url(FeedRequest::refresh("abc", None)),
      "http://jobs.test/api/v1/feed/abc"
    );

    // Latest wins over a plain token, but not over a refresh
    let latest_with_token = FeedRequest {
      next_token: Some("abc".to_string()),
      ..FeedRequest::latest()
    };
    assert_eq!(url(latest_with_token.clone()), "http://jobs.test/api/v1/feed?last=true");
    let refresh = FeedRequest {
      is_refresh: true,
      ..latest_with_token
    };
    assert_eq!(url(refresh), "http://jobs.test/api/v1/feed/abc");
  }

  #[test]
  fn test_base_url_with_trailing_slash() {
    let config = ApiConfig {
      url: "http://jobs.test/api/".to_string(),
      version: "v2".to_string(),
      timeout_secs: 30,
    };
    let client = FeedClient::new(FakeTransport::new(), &config, String::new()).unwrap();

    assert_eq!(
      client.entry_url("x-1").unwrap().as_str(),
      "http://jobs.test/api/v2/feedentry/x-1"
    );
  }

  #[tokio::test]
  async fn test_etag_takes_precedence_over_date() {
    let transport = FakeTransport::new();
    transport.respond(
      "http://jobs.test/api/v1/feed",
      json_response(&json!({"id": "f", "items": []}), None, None),
    );
    let client = client(transport.clone());

    let request = FeedRequest {
      etag: Some("\"v1\"".to_string()),
      ..FeedRequest::head().modified_since("Tue, 24 Feb 2026 10:00:00 GMT")
    };
    client.fetch_feed(&request).await.unwrap();

    let sent = &transport.requests()[0];
    assert_eq!(sent.headers.get(IF_NONE_MATCH).unwrap(), "\"v1\"");
    assert!(sent.headers.get(IF_MODIFIED_SINCE).is_none());
    assert_eq!(sent.headers.get(AUTHORIZATION).unwrap(), "Bearer secret");
    assert_eq!(sent.headers.get(ACCEPT).unwrap(), "application/json");
  }

  #[tokio::test]
  async fn test_date_header_without_etag() {
    let transport = FakeTransport::new();
    transport.respond(
      "http://jobs.test/api/v1/feed",
      json_response(&json!({"id": "f", "items": []}), None, None),
    );
    let client = client(transport.clone());

    let request = FeedRequest::head().modified_since("Tue, 24 Feb 2026 10:00:00 GMT");
    client.fetch_feed(&request).await.unwrap();

    let sent = &transport.requests()[0];
    assert_eq!(
      sent.headers.get(IF_MODIFIED_SINCE).unwrap(),
      "Tue, 24 Feb 2026 10:00:00 GMT"
    );
  }

  #[tokio::test]
  async fn test_validators_are_read_from_response() {
    let transport = FakeTransport::new();
    transport.respond(
      "http://jobs.test/api/v1/feed",
      json_response(
        &json!({"id": "f", "next_id": "g", "items": []}),
        Some("\"abc\""),
        Some("Tue, 24 Feb 2026 10:00:00 GMT"),
      ),
    );
    let client = client(transport);

    match client.fetch_feed(&FeedRequest::head()).await.unwrap() {
      Fetched::Updated {
        data,
        etag,
        last_modified,
      } => {
        assert_eq!(data.feed_id, "f");
        assert_eq!(data.next_token.as_deref(), Some("g"));
        assert_eq!(etag.as_deref(), Some("\"abc\""));
        assert_eq!(last_modified.as_deref(), Some("Tue, 24 Feb 2026 10:00:00 GMT"));
      }
      Fetched::NotModified => panic!("expected a fresh page"),
    }
  }

  #[tokio::test]
  async fn test_status_mapping() {
    let transport = FakeTransport::new();
    let url = "http://jobs.test/api/v1/feed";
    transport.respond(url, status_response(StatusCode::NOT_MODIFIED));
    transport.respond(url, status_response(StatusCode::UNAUTHORIZED));
    transport.respond(url, json_response(&json!({"id": "f"}), None, None));
    let client = client(transport);

    let request = FeedRequest::head();
    assert_eq!(client.fetch_feed(&request).await.unwrap(), Fetched::NotModified);
    assert!(matches!(
      client.fetch_feed(&request).await,
      Err(ApiError::HttpStatus(401))
    ));
    assert!(matches!(
      client.fetch_feed(&request).await,
      Err(ApiError::Malformed(_))
    ));
  }

  #[tokio::test]
  async fn test_fetch_entry() {
    let transport = FakeTransport::new();
    transport.respond(
      "http://jobs.test/api/v1/feedentry/a-1",
      json_response(
        &json!({"uuid": "a-1", "status": "ACTIVE", "json": {"title": "Nurse B"}}),
        None,
        None,
      ),
    );
    let client = client(transport);

    let fetched = client
      .fetch_entry("a-1", &Validators::default())
      .await
      .unwrap();
    let Fetched::Updated { data, .. } = fetched else {
      panic!("expected an entry");
    };
    assert_eq!(data.uuid, "a-1");
    assert_eq!(data.details.title.as_deref(), Some("Nurse B"));
  }
}
