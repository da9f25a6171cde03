//! Tuning knobs shared by the client, the proxy and the mpv backend.
//!
//! `constants.ron` is compiled in with `include_str!` and parsed on first use.

use serde::Deserialize;
use std::sync::LazyLock;

#[derive(Debug, Deserialize)]
pub struct Constants {
  // Client
  pub default_api_base: String,
  pub request_timeout_secs: u64,
  /// Distance from the end of the result list at which the next page is requested.
  pub load_more_threshold: usize,
  pub recommendation_count: usize,
  pub error_dismiss_secs: u64,
  /// Rows a mouse drag must travel downwards before the modal is dismissed.
  pub drag_dismiss_rows: u16,

  // Proxy
  pub default_listen_addr: String,
  pub upstream_base: String,
  pub page_size: u32,

  // mpv
  pub watch_url_prefix: String,
  pub ipc_connect_attempts: u32,
  pub ipc_connect_delay_ms: u64,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Covered by embedded_constants_parse, so a bad edit fails the test suite first.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron is not valid RON")
});

pub fn constants() -> &'static Constants {
  &CONSTANTS
}
