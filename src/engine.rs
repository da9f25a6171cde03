//! The playback engine seam.
//!
//! Each surface owns one engine. Engines are driven exclusively by the
//! `SurfaceController`; their readiness and state changes are pulled with
//! `poll_event` on every tick of the event loop.

use std::fmt;

/// The two mutually exclusive playback presentations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
  Modal,
  Mini,
}

impl Surface {
  pub fn other(self) -> Surface {
    match self {
      Surface::Modal => Surface::Mini,
      Surface::Mini => Surface::Modal,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Surface::Modal => "modal",
      Surface::Mini => "mini",
    }
  }
}

impl fmt::Display for Surface {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
  #[default]
  Unstarted,
  Playing,
  Paused,
  Ended,
  Buffering,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
  Ready,
  StateChange(EngineState),
  /// The engine died or lost its control channel and will not take commands again.
  Failed(String),
}

pub trait PlayerEngine {
  /// Load `video_id` and seek to `start_seconds` once it starts.
  fn load_video_by_id(&mut self, video_id: &str, start_seconds: f64);
  fn play_video(&mut self);
  fn pause_video(&mut self);
  fn stop_video(&mut self);
  fn current_time(&self) -> f64;
  fn player_state(&self) -> EngineState;
  fn is_ready(&self) -> bool;
  /// Next pending event, if any. Never blocks.
  fn poll_event(&mut self) -> Option<EngineEvent>;
}
