//! Paginated search feeding the result list.
//!
//! At most one request is in flight. Fresh queries and load-mores arriving
//! while one is pending are ignored until it resolves, so pages can never be
//! merged out of order.

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, GENERIC_SEARCH_ERROR};
use crate::store::ResultStore;
use crate::video::{SearchQuery, SearchResultPage};

type Reply = Result<SearchResultPage, ApiError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
  #[error("Please enter a keyword.")]
  EmptyQuery,
  #[error("A search is already running.")]
  InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
  Fresh,
  More,
}

/// Result of applying a reply to the result list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
  Replaced { count: usize },
  Appended { count: usize },
  Failed(String),
}

pub struct SearchOrchestrator {
  client: ApiClient,
  last_query: Option<SearchQuery>,
  in_flight: Option<(RequestKind, oneshot::Receiver<Reply>)>,
}

impl SearchOrchestrator {
  pub fn new(client: ApiClient) -> Self {
    Self { client, last_query: None, in_flight: None }
  }

  pub fn last_query(&self) -> Option<&SearchQuery> {
    self.last_query.as_ref()
  }

  pub fn is_loading(&self) -> bool {
    self.in_flight.is_some()
  }

  pub fn is_loading_more(&self) -> bool {
    matches!(self.in_flight, Some((RequestKind::More, _)))
  }

  /// Start a fresh query. Empty text is rejected without touching the network,
  /// and nothing is sent while another request is pending.
  pub fn search(&mut self, query: SearchQuery) -> Result<(), SearchError> {
    let tx = self.begin_search(query)?;
    // begin_search stored the trimmed query.
    if let Some(query) = self.last_query.clone() {
      self.spawn_request(tx, query, None);
    }
    Ok(())
  }

  /// Fetch the page after the last one received. Returns whether a request was issued.
  pub fn load_more(&mut self, results: &ResultStore) -> bool {
    let Some((tx, query, cursor)) = self.begin_load_more(results) else { return false };
    self.spawn_request(tx, query, Some(cursor));
    true
  }

  pub(crate) fn begin_search(&mut self, mut query: SearchQuery) -> Result<oneshot::Sender<Reply>, SearchError> {
    query.text = query.text.trim().to_string();
    if query.text.is_empty() {
      return Err(SearchError::EmptyQuery);
    }
    if self.in_flight.is_some() {
      debug!(q = %query.text, "search: ignored, a request is still in flight");
      return Err(SearchError::InFlight);
    }
    info!(q = %query.text, rating = query.rating.as_param(), content_type = query.content_type.as_param(), "search triggered");
    let (tx, rx) = oneshot::channel();
    self.last_query = Some(query);
    self.in_flight = Some((RequestKind::Fresh, rx));
    Ok(tx)
  }

  fn begin_load_more(&mut self, results: &ResultStore) -> Option<(oneshot::Sender<Reply>, SearchQuery, String)> {
    if self.in_flight.is_some() {
      return None;
    }
    let query = self.last_query.clone()?;
    let cursor = results.cursor()?.to_string();
    info!(q = %query.text, cursor = %cursor, "search: loading more");
    let (tx, rx) = oneshot::channel();
    self.in_flight = Some((RequestKind::More, rx));
    Some((tx, query, cursor))
  }

  fn spawn_request(&self, tx: oneshot::Sender<Reply>, query: SearchQuery, cursor: Option<String>) {
    let client = self.client.clone();
    tokio::spawn(async move {
      let _ = tx.send(client.search(&query, cursor.as_deref()).await);
    });
  }

  /// Apply a finished reply, if there is one. Failures leave `results` untouched.
  pub fn poll(&mut self, results: &mut ResultStore) -> Option<SearchOutcome> {
    let (kind, mut rx) = self.in_flight.take()?;
    let reply = match rx.try_recv() {
      Ok(reply) => reply,
      Err(oneshot::error::TryRecvError::Empty) => {
        self.in_flight = Some((kind, rx));
        return None;
      }
      Err(oneshot::error::TryRecvError::Closed) => {
        warn!("search: request task dropped without replying");
        return Some(SearchOutcome::Failed(GENERIC_SEARCH_ERROR.to_string()));
      }
    };

    match reply {
      Ok(page) => {
        let count = page.items.len();
        info!(count, more = page.cursor.is_some(), ?kind, "search: page received");
        Some(match kind {
          RequestKind::Fresh => {
            results.replace(page);
            SearchOutcome::Replaced { count }
          }
          RequestKind::More => {
            results.append(page);
            SearchOutcome::Appended { count }
          }
        })
      }
      Err(e) => {
        warn!(err = %e, ?kind, "search: request failed");
        Some(SearchOutcome::Failed(e.user_message()))
      }
    }
  }
}
