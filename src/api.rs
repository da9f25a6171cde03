//! HTTP client for the two proxy endpoints.

use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::constants;
use crate::video::{DetailsResponse, ErrorBody, SearchQuery, SearchResponse, SearchResultPage};

pub const GENERIC_SEARCH_ERROR: &str = "Error fetching videos. Please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
  /// The proxy answered with an error body carrying a message.
  #[error("upstream error ({status}): {message}")]
  Upstream { status: u16, message: String },
  /// Non-2xx without a usable error body.
  #[error("upstream returned status {0}")]
  Status(u16),
  #[error("request timed out")]
  Timeout,
  #[error("transport error: {0}")]
  Transport(#[source] reqwest::Error),
  #[error("malformed response: {0}")]
  Decode(String),
}

impl ApiError {
  /// Text to put in front of the user. Upstream messages are shown as-is,
  /// everything else collapses to the generic fallback.
  pub fn user_message(&self) -> String {
    match self {
      ApiError::Upstream { message, .. } if !message.trim().is_empty() => message.clone(),
      _ => GENERIC_SEARCH_ERROR.to_string(),
    }
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() {
      ApiError::Timeout
    } else if e.is_decode() {
      ApiError::Decode(e.to_string())
    } else {
      ApiError::Transport(e)
    }
  }
}

/// What the modal's description panel shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DescriptionState {
  #[default]
  Idle,
  Loading,
  Loaded(String),
  Unavailable,
  Failed,
}

impl DescriptionState {
  pub fn from_result(result: Result<DetailsResponse, ApiError>) -> Self {
    match result {
      Ok(details) => match details.description() {
        Some(text) if !text.trim().is_empty() => DescriptionState::Loaded(text.to_string()),
        _ => DescriptionState::Unavailable,
      },
      Err(_) => DescriptionState::Failed,
    }
  }

  pub fn text(&self) -> &str {
    match self {
      DescriptionState::Idle => "",
      DescriptionState::Loading => "Loading description…",
      DescriptionState::Loaded(text) => text,
      DescriptionState::Unavailable => "No description available.",
      DescriptionState::Failed => "Failed to load description.",
    }
  }
}

/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
  http: Client,
  base: String,
}

impl ApiClient {
  pub fn new(base: &str) -> Result<Self, ApiError> {
    let http = Client::builder()
      .timeout(Duration::from_secs(constants().request_timeout_secs))
      .user_agent(concat!("amfilter/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { http, base: base.trim_end_matches('/').to_string() })
  }

  pub fn base(&self) -> &str {
    &self.base
  }

  /// One page of results. `cursor` is the continuation token from the previous page.
  pub async fn search(&self, query: &SearchQuery, cursor: Option<&str>) -> Result<SearchResultPage, ApiError> {
    let mut params =
      vec![("q", query.text.as_str()), ("rating", query.rating.as_param()), ("contentType", query.content_type.as_param())];
    if let Some(token) = cursor {
      params.push(("pageToken", token));
    }
    debug!(q = %query.text, cursor = ?cursor, "api: search");
    let resp = self.http.get(format!("{}/api/search", self.base)).query(&params).send().await?;
    let body: SearchResponse = read_json(resp).await?;
    Ok(body.into())
  }

  pub async fn video_details(&self, id: &str) -> Result<DetailsResponse, ApiError> {
    debug!(id = %id, "api: videoDetails");
    let resp = self.http.get(format!("{}/api/videoDetails", self.base)).query(&[("id", id)]).send().await?;
    read_json(resp).await
  }
}

async fn read_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
  let status = resp.status();
  let bytes = resp.bytes().await?;
  decode_body(status, &bytes)
}

/// Split out from `read_json` so the status/body handling is testable without a server.
fn decode_body<T: serde::de::DeserializeOwned>(status: StatusCode, bytes: &[u8]) -> Result<T, ApiError> {
  if !status.is_success() {
    let err = match serde_json::from_slice::<ErrorBody>(bytes) {
      Ok(body) => ApiError::Upstream { status: status.as_u16(), message: body.error },
      Err(_) => ApiError::Status(status.as_u16()),
    };
    warn!(status = status.as_u16(), err = %err, "api: request failed");
    return Err(err);
  }
  serde_json::from_slice(bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn upstream_message_shown_verbatim() {
    let err = decode_body::<SearchResponse>(StatusCode::FORBIDDEN, br#"{"error":"quotaExceeded"}"#).unwrap_err();
    assert_eq!(err.user_message(), "quotaExceeded");
  }

  #[test]
  fn bare_error_status_is_generic() {
    let err = decode_body::<SearchResponse>(StatusCode::BAD_GATEWAY, b"<html>oops</html>").unwrap_err();
    assert!(matches!(err, ApiError::Status(502)));
    assert_eq!(err.user_message(), GENERIC_SEARCH_ERROR);
  }

  #[test]
  fn malformed_success_body_is_generic() {
    let err = decode_body::<SearchResponse>(StatusCode::OK, b"not json").unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
    assert_eq!(err.user_message(), GENERIC_SEARCH_ERROR);
    assert_eq!(ApiError::Timeout.user_message(), GENERIC_SEARCH_ERROR);
  }

  #[test]
  fn search_body_decodes_into_page() {
    let body = br#"{"items":[{"id":{"videoId":"a"},"snippet":{"title":"A","channelTitle":"C"}}],"nextPageToken":"T1"}"#;
    let page: SearchResultPage = decode_body::<SearchResponse>(StatusCode::OK, body).unwrap().into();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.cursor.as_deref(), Some("T1"));
  }

  #[test]
  fn description_states() {
    let empty = decode_body::<DetailsResponse>(StatusCode::OK, br#"{"items":[]}"#);
    assert_eq!(DescriptionState::from_result(empty).text(), "No description available.");

    let full = decode_body::<DetailsResponse>(StatusCode::OK, br#"{"items":[{"snippet":{"description":"hello"}}]}"#);
    assert_eq!(DescriptionState::from_result(full), DescriptionState::Loaded("hello".into()));

    let failed = decode_body::<DetailsResponse>(StatusCode::NOT_FOUND, br#"{"error":"nope"}"#);
    assert_eq!(DescriptionState::from_result(failed).text(), "Failed to load description.");
  }

  #[test]
  fn client_trims_trailing_slash() {
    let client = ApiClient::new("http://localhost:3000/").unwrap();
    assert_eq!(client.base(), "http://localhost:3000");
  }
}
