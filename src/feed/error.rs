/// Everything that can go wrong while talking to the feed API.
///
/// The orchestrator never lets these escape: they are logged and turned into
/// the error flag on the status stream.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("request failed: {0}")]
  Request(#[from] reqwest::Error),
  #[error("transport unavailable: {0}")]
  Unavailable(String),
  #[error("unexpected status code: {0}")]
  HttpStatus(u16),
  #[error("malformed response: {0}")]
  Malformed(&'static str),
  #[error("failed to decode response: {0}")]
  Decode(#[from] serde_json::Error),
  #[error("invalid url: {0}")]
  Url(#[from] url::ParseError),
  #[error("base url cannot carry path segments: {0}")]
  BaseUrl(String),
  #[error("invalid header value: {0}")]
  Header(#[from] reqwest::header::InvalidHeaderValue),
}
