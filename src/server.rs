//! Key-hiding proxy in front of the YouTube Data API.
//!
//! Two GET endpoints, `/api/search` and `/api/videoDetails`, forward to the
//! upstream `search` and `videos` resources with the API key attached. The key
//! is picked per request: `ACTIVE_YT_KEY` (default `1`) names which
//! `YT_API_KEY_<n>` variable to read, so keys can be rotated without a restart.
//!
//! rouille runs handlers on its own thread pool, so the upstream call uses the
//! blocking reqwest client.

use anyhow::{Result, anyhow};
use rouille::{Request, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::constants::constants;
use crate::video::ErrorBody;

const KEY_SELECTOR_VAR: &str = "ACTIVE_YT_KEY";
const UPSTREAM_FALLBACK_ERROR: &str = "YouTube API error. Try switching to another key.";

/// Status and decoded JSON body of an upstream reply.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
  pub status: u16,
  pub body: Value,
}

pub trait Upstream: Send + Sync + 'static {
  /// GET `resource` (e.g. `search`) with `params`. Errors mean no usable reply at all.
  fn get(&self, resource: &str, params: &[(&str, String)]) -> Result<UpstreamReply>;
}

pub struct HttpUpstream {
  http: reqwest::blocking::Client,
  base: String,
}

impl HttpUpstream {
  pub fn new(base: &str) -> Result<Self> {
    let http = reqwest::blocking::Client::builder()
      .timeout(Duration::from_secs(constants().request_timeout_secs))
      .build()
      .map_err(|e| anyhow!(e).context("Failed to build upstream HTTP client"))?;
    Ok(Self { http, base: base.trim_end_matches('/').to_string() })
  }
}

impl Upstream for HttpUpstream {
  fn get(&self, resource: &str, params: &[(&str, String)]) -> Result<UpstreamReply> {
    let resp = self.http.get(format!("{}/{}", self.base, resource)).query(params).send()?;
    let status = resp.status().as_u16();
    let body: Value = resp.json()?;
    Ok(UpstreamReply { status, body })
  }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct Proxy<U> {
  upstream: U,
  env: EnvLookup,
}

impl<U: Upstream> Proxy<U> {
  pub fn new(upstream: U, env: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
    Self { upstream, env: Box::new(env) }
  }

  pub fn handle(&self, request: &Request) -> Response {
    let response = rouille::router!(request,
      (GET) ["/api/search"] => {
        self.search(request)
      },
      (GET) ["/api/videoDetails"] => {
        self.video_details(request)
      },
      _ => {
        error_response(404, "Not found")
      }
    );
    debug!(method = %request.method(), url = %request.raw_url(), status = response.status_code, "proxy: request");
    response
  }

  fn search(&self, request: &Request) -> Response {
    let Some(q) = non_empty_param(request, "q") else {
      return error_response(400, "Missing 'q' query parameter");
    };
    let rating = request.get_param("rating");
    let content_type = request.get_param("contentType");
    let page_token = non_empty_param(request, "pageToken");
    let params = search_params(&q, rating.as_deref(), content_type.as_deref(), page_token.as_deref());
    self.forward("search", params)
  }

  fn video_details(&self, request: &Request) -> Response {
    let Some(id) = non_empty_param(request, "id") else {
      return error_response(400, "Missing 'id' query parameter");
    };
    self.forward("videos", vec![("part", "snippet".to_string()), ("id", id)])
  }

  fn api_key(&self) -> Option<String> {
    let active = (self.env)(KEY_SELECTOR_VAR).filter(|s| !s.is_empty()).unwrap_or_else(|| "1".to_string());
    (self.env)(&format!("YT_API_KEY_{}", active)).filter(|k| !k.is_empty())
  }

  fn forward(&self, resource: &str, mut params: Vec<(&'static str, String)>) -> Response {
    let Some(key) = self.api_key() else {
      error!(resource, "proxy: active API key not configured");
      return error_response(500, "Active API key not configured");
    };
    params.push(("key", key));

    match self.upstream.get(resource, &params) {
      Ok(reply) if (200..300).contains(&reply.status) => Response::json(&reply.body),
      Ok(reply) => {
        let message = reply
          .body
          .pointer("/error/message")
          .and_then(Value::as_str)
          .filter(|m| !m.is_empty())
          .unwrap_or(UPSTREAM_FALLBACK_ERROR);
        warn!(resource, status = reply.status, upstream_message = message, "proxy: upstream error");
        error_response(reply.status, message)
      }
      Err(e) => {
        error!(resource, err = %format!("{:#}", e), "proxy: upstream request failed");
        error_response(500, "Internal server error")
      }
    }
  }
}

fn non_empty_param(request: &Request, name: &str) -> Option<String> {
  request.get_param(name).filter(|v| !v.is_empty())
}

fn error_response(status: u16, message: &str) -> Response {
  Response::json(&ErrorBody { error: message.to_string() }).with_status_code(status)
}

/// Upstream `search` parameters for a client query. The API key is added by the caller.
fn search_params(
  q: &str,
  rating: Option<&str>,
  content_type: Option<&str>,
  page_token: Option<&str>,
) -> Vec<(&'static str, String)> {
  let safe_search = if rating == Some("PG") { "strict" } else { "none" };
  let video_duration = match content_type {
    Some("shorts") => "short",
    Some("videos") => "long",
    _ => "any",
  };
  let mut params = vec![
    ("part", "snippet".to_string()),
    ("q", q.to_string()),
    ("maxResults", constants().page_size.to_string()),
    ("type", "video".to_string()),
    ("safeSearch", safe_search.to_string()),
    ("videoDuration", video_duration.to_string()),
    ("videoEmbeddable", "true".to_string()),
  ];
  if let Some(token) = page_token {
    params.push(("pageToken", token.to_string()));
  }
  params
}

/// Bind `addr` and serve until the process is killed.
pub fn serve(addr: &str) -> Result<()> {
  let upstream = HttpUpstream::new(&constants().upstream_base)?;
  let proxy = Proxy::new(upstream, |name| std::env::var(name).ok());
  if proxy.api_key().is_none() {
    warn!("proxy: no API key configured; requests will fail until YT_API_KEY_<n> is set");
  }
  let server = rouille::Server::new(addr, move |request| proxy.handle(request))
    .map_err(|e| anyhow!("Failed to bind proxy on {}: {}", addr, e))?;
  info!(addr = %server.server_addr(), "proxy: listening");
  server.run();
  Ok(())
}
