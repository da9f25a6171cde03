use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A playable item as it appears in the result list and the queue.
///
/// Identity is the platform id only; two refs with the same id are the same video.
#[derive(Debug, Clone)]
pub struct VideoRef {
  pub id: String,
  pub title: String,
  pub channel: String,
  pub published: Option<NaiveDate>,
}

impl VideoRef {
  pub fn new(id: impl Into<String>, title: impl Into<String>, channel: impl Into<String>) -> Self {
    Self { id: id.into(), title: title.into(), channel: channel.into(), published: None }
  }

  pub fn same_video(&self, other: &VideoRef) -> bool {
    self.id == other.id
  }
}

/// One page of search hits plus the continuation cursor (`None` = no further pages).
#[derive(Debug, Clone, Default)]
pub struct SearchResultPage {
  pub items: Vec<VideoRef>,
  pub cursor: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rating {
  #[default]
  All,
  Pg,
}

impl Rating {
  pub fn as_param(self) -> &'static str {
    match self {
      Rating::All => "all",
      Rating::Pg => "PG",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Rating::All => "All ratings",
      Rating::Pg => "PG",
    }
  }

  pub fn from_config(s: &str) -> Self {
    if s.eq_ignore_ascii_case("pg") { Rating::Pg } else { Rating::All }
  }

  pub fn next(self) -> Self {
    match self {
      Rating::All => Rating::Pg,
      Rating::Pg => Rating::All,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
  #[default]
  All,
  Shorts,
  Videos,
}

impl ContentType {
  pub fn as_param(self) -> &'static str {
    match self {
      ContentType::All => "all",
      ContentType::Shorts => "shorts",
      ContentType::Videos => "videos",
    }
  }

  /// Badge shown next to each result card.
  pub fn badge(self) -> &'static str {
    match self {
      ContentType::All => "YouTube",
      ContentType::Shorts => "Short",
      ContentType::Videos => "Video",
    }
  }

  pub fn from_config(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "shorts" => ContentType::Shorts,
      "videos" => ContentType::Videos,
      _ => ContentType::All,
    }
  }

  pub fn next(self) -> Self {
    match self {
      ContentType::All => ContentType::Shorts,
      ContentType::Shorts => ContentType::Videos,
      ContentType::Videos => ContentType::All,
    }
  }
}

/// A fresh search: the trimmed query text and the filters in effect when it was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
  pub text: String,
  pub rating: Rating,
  pub content_type: ContentType,
}

// --- Wire format shared by the proxy and the client ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
  #[serde(default)]
  pub items: Vec<SearchItem>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchItem {
  pub id: SearchItemId,
  pub snippet: Snippet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItemId {
  #[serde(default)]
  pub video_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub channel_title: String,
  #[serde(default)]
  pub published_at: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailsResponse {
  #[serde(default)]
  pub items: Vec<DetailsItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailsItem {
  #[serde(default)]
  pub snippet: Snippet,
}

/// Error body returned by the proxy on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
  pub error: String,
}

impl SearchItem {
  /// Convert a wire item into a `VideoRef`. Items without a video id (channels,
  /// playlists) are skipped.
  pub fn into_video_ref(self) -> Option<VideoRef> {
    let id = self.id.video_id.filter(|id| !id.is_empty())?;
    let published = self.snippet.published_at.as_deref().and_then(parse_published);
    Some(VideoRef { id, title: self.snippet.title, channel: self.snippet.channel_title, published })
  }
}

impl From<SearchResponse> for SearchResultPage {
  fn from(resp: SearchResponse) -> Self {
    let items = resp.items.into_iter().filter_map(SearchItem::into_video_ref).collect();
    let cursor = resp.next_page_token.filter(|t| !t.is_empty());
    SearchResultPage { items, cursor }
  }
}

impl DetailsResponse {
  /// Description of the first item, if the platform returned one.
  pub fn description(&self) -> Option<&str> {
    self.items.first().and_then(|item| item.snippet.description.as_deref())
  }
}

/// Parse an RFC 3339 `publishedAt` timestamp into a calendar date.
fn parse_published(s: &str) -> Option<NaiveDate> {
  chrono::DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn search_response_converts_to_page() {
    let json = r#"{
      "items": [
        {"id": {"videoId": "abc"}, "snippet": {"title": "Lofi 1", "channelTitle": "Chill", "publishedAt": "2023-04-05T10:00:00Z"}},
        {"id": {"channelId": "UC1"}, "snippet": {"title": "A channel", "channelTitle": "Chill"}},
        {"id": {"videoId": "def"}, "snippet": {"title": "Lofi 2", "channelTitle": "Beats"}}
      ],
      "nextPageToken": "T1"
    }"#;
    let resp: SearchResponse = serde_json::from_str(json).unwrap();
    let page = SearchResultPage::from(resp);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, "abc");
    assert_eq!(page.items[0].channel, "Chill");
    assert_eq!(page.items[0].published, NaiveDate::from_ymd_opt(2023, 4, 5));
    assert_eq!(page.items[1].published, None);
    assert_eq!(page.cursor.as_deref(), Some("T1"));
  }

  #[test]
  fn missing_or_empty_token_means_last_page() {
    let resp: SearchResponse = serde_json::from_str(r#"{"items": []}"#).unwrap();
    assert!(SearchResultPage::from(resp).cursor.is_none());

    let resp: SearchResponse = serde_json::from_str(r#"{"items": [], "nextPageToken": ""}"#).unwrap();
    assert!(SearchResultPage::from(resp).cursor.is_none());
  }

  #[test]
  fn details_description_of_first_item() {
    let resp: DetailsResponse =
      serde_json::from_str(r#"{"items": [{"snippet": {"title": "t", "description": "hello"}}]}"#).unwrap();
    assert_eq!(resp.description(), Some("hello"));

    let empty: DetailsResponse = serde_json::from_str(r#"{"items": []}"#).unwrap();
    assert_eq!(empty.description(), None);
  }

  #[test]
  fn filters_from_config() {
    assert_eq!(Rating::from_config("PG"), Rating::Pg);
    assert_eq!(Rating::from_config("pg"), Rating::Pg);
    assert_eq!(Rating::from_config("whatever"), Rating::All);
    assert_eq!(ContentType::from_config("Shorts"), ContentType::Shorts);
    assert_eq!(ContentType::from_config("videos"), ContentType::Videos);
    assert_eq!(ContentType::from_config(""), ContentType::All);
  }

  #[test]
  fn content_type_cycles_through_all() {
    let start = ContentType::All;
    assert_eq!(start.next().next().next(), start);
    assert_eq!(Rating::Pg.next(), Rating::All);
  }
}
