//! Playback session: which video is current, where it came from, and what
//! plays next.
//!
//! Resolution order for next/previous: while playing from the queue, the
//! adjacent queue entry wins. Running off either end of the queue falls back
//! to the result list, which is navigated circularly so playback never
//! dead-ends at a list boundary.

use tracing::{debug, info};

use crate::engine::{PlayerEngine, Surface};
use crate::store::{QueueStore, ResultStore};
use crate::surface::{Activation, SurfaceController, SurfaceEvent};
use crate::video::VideoRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
  Results,
  Queue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Next,
  Prev,
}

impl Direction {
  fn step(self) -> isize {
    match self {
      Direction::Next => 1,
      Direction::Prev => -1,
    }
  }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
  #[error("no {list} entry at position {index} ({len} entries)")]
  IndexOutOfRange { list: &'static str, index: usize, len: usize },
  #[error("nothing to play")]
  NothingToPlay,
}

/// Read-only view of both lists, borrowed for the duration of one navigation call.
#[derive(Clone, Copy)]
pub struct Sources<'a> {
  pub results: &'a ResultStore,
  pub queue: &'a QueueStore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
  /// Valid only while the result list generation matches.
  Results { index: usize, generation: u64 },
  /// `detached` once the playing entry was removed from the queue; `index` then
  /// names the slot the following entry slid into.
  Queue { index: usize, detached: bool },
}

/// A play request parked behind an engine that is not ready yet. Committed
/// when the controller reports the open, dropped when the surface closes.
#[derive(Debug, Clone)]
struct PendingPlay {
  surface: Surface,
  video: VideoRef,
  position: Option<Position>,
}

#[derive(Debug, Default)]
pub struct PlaybackSession {
  current: Option<VideoRef>,
  position: Option<Position>,
  active_surface: Option<Surface>,
  /// Kept after the session goes idle so it can be resumed.
  last_played: Option<VideoRef>,
  pending: Option<PendingPlay>,
}

/// Shift a queue position after the entry at `removed` left the queue.
fn shift_for_removal(position: &mut Option<Position>, removed: usize) {
  if let Some(Position::Queue { index, detached }) = position {
    if removed < *index {
      *index -= 1;
    } else if removed == *index && !*detached {
      debug!(index = *index, "session: playing entry left the queue");
      *detached = true;
    }
  }
}

impl PlaybackSession {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn current(&self) -> Option<&VideoRef> {
    self.current.as_ref()
  }

  pub fn active_surface(&self) -> Option<Surface> {
    self.active_surface
  }

  pub fn is_idle(&self) -> bool {
    self.current.is_none()
  }

  pub fn is_playing_from_queue(&self) -> bool {
    matches!(self.position, Some(Position::Queue { .. }))
  }

  pub fn last_played(&self) -> Option<&VideoRef> {
    self.last_played.as_ref()
  }

  /// Position of the current video in its source list, if still resolvable.
  pub fn source_index(&self, sources: Sources<'_>) -> Option<usize> {
    match self.position? {
      Position::Results { index, generation } => (generation == sources.results.generation()).then_some(index),
      Position::Queue { index, detached: false } => Some(index),
      Position::Queue { detached: true, .. } => None,
    }
  }

  pub fn play_at<E: PlayerEngine>(
    &mut self,
    sources: Sources<'_>,
    ctl: &mut SurfaceController<E>,
    source: Source,
    index: usize,
    surface: Surface,
  ) -> Result<Activation, SessionError> {
    let (video, position) = match source {
      Source::Results => {
        let results = sources.results;
        let video = results.get(index).ok_or(SessionError::IndexOutOfRange {
          list: "result",
          index,
          len: results.len(),
        })?;
        (video.clone(), Position::Results { index, generation: results.generation() })
      }
      Source::Queue => {
        let queue = sources.queue;
        let video =
          queue.get(index).ok_or(SessionError::IndexOutOfRange { list: "queue", index, len: queue.len() })?;
        (video.clone(), Position::Queue { index, detached: false })
      }
    };
    Ok(self.start(ctl, video, Some(position), surface))
  }

  /// Step to the adjacent video. Returns `None` when there is nothing to step to.
  pub fn advance<E: PlayerEngine>(
    &mut self,
    sources: Sources<'_>,
    ctl: &mut SurfaceController<E>,
    direction: Direction,
    surface: Surface,
  ) -> Option<Activation> {
    if let Some(Position::Queue { index, detached }) = self.position {
      let target = match (direction, detached) {
        (Direction::Next, false) => Some(index + 1),
        (Direction::Next, true) => Some(index),
        (Direction::Prev, _) => index.checked_sub(1),
      };
      if let Some(target) = target
        && let Some(video) = sources.queue.get(target)
      {
        let position = Position::Queue { index: target, detached: false };
        return Some(self.start(ctl, video.clone(), Some(position), surface));
      }
      debug!(?direction, "session: queue exhausted, resuming result list");
    }

    let results = sources.results;
    let len = results.len();
    if len == 0 {
      return None;
    }
    let target = match self.result_anchor(results) {
      Some(index) => (index as isize + direction.step()).rem_euclid(len as isize) as usize,
      None => 0,
    };
    let video = results.get(target)?.clone();
    let position = Position::Results { index: target, generation: results.generation() };
    Some(self.start(ctl, video, Some(position), surface))
  }

  /// Result-list position to step from: the live pointer if still valid,
  /// otherwise wherever the last played video sits in the current list.
  fn result_anchor(&self, results: &ResultStore) -> Option<usize> {
    match self.position {
      Some(Position::Results { index, generation }) if generation == results.generation() && index < results.len() => {
        Some(index)
      }
      _ => self.current.as_ref().or(self.last_played.as_ref()).and_then(|v| results.index_of(&v.id)),
    }
  }

  /// Open `video` on `surface`. The session only moves to it once the
  /// controller has actually opened it; a deferred open is parked until then.
  fn start<E: PlayerEngine>(
    &mut self,
    ctl: &mut SurfaceController<E>,
    video: VideoRef,
    position: Option<Position>,
    surface: Surface,
  ) -> Activation {
    let from_queue = matches!(position, Some(Position::Queue { .. }));
    info!(video_id = %video.id, title = %video.title, %surface, from_queue, "session: play");
    let activation = ctl.open(surface, video.clone());
    self.active_surface = ctl.active();
    match activation {
      Activation::Opened => self.commit(video, position),
      Activation::Deferred => {
        debug!(video_id = %video.id, %surface, "session: play parked until the engine is ready");
        self.pending = Some(PendingPlay { surface, video, position });
      }
      Activation::Unavailable => {}
    }
    activation
  }

  fn commit(&mut self, video: VideoRef, position: Option<Position>) {
    self.pending = None;
    self.last_played = Some(video.clone());
    self.current = Some(video);
    self.position = position;
  }

  /// Move the current video to `target`, carrying over time and play state.
  pub fn switch_surface<E: PlayerEngine>(
    &mut self,
    ctl: &mut SurfaceController<E>,
    target: Surface,
  ) -> Result<Activation, SessionError> {
    let video = self.current.clone().ok_or(SessionError::NothingToPlay)?;
    let activation = ctl.open(target, video);
    self.active_surface = ctl.active();
    Ok(activation)
  }

  /// Close `surface`. With no surface left open the session becomes idle; the
  /// last video and its position are kept for `resume`.
  pub fn close<E: PlayerEngine>(&mut self, ctl: &mut SurfaceController<E>, surface: Surface) {
    ctl.close(surface);
    if self.pending.as_ref().is_some_and(|p| p.surface == surface) {
      self.pending = None;
    }
    self.active_surface = ctl.active();
    if self.active_surface.is_none() && self.current.take().is_some() {
      info!(%surface, "session: idle");
    }
  }

  /// Reopen the last played video on `surface` after the session went idle.
  pub fn resume<E: PlayerEngine>(
    &mut self,
    ctl: &mut SurfaceController<E>,
    surface: Surface,
  ) -> Result<Activation, SessionError> {
    if self.current.is_some() {
      return self.switch_surface(ctl, surface);
    }
    let video = self.last_played.clone().ok_or(SessionError::NothingToPlay)?;
    Ok(self.start(ctl, video, self.position, surface))
  }

  /// React to an engine-driven event: a deferred open landing, or autoplay
  /// continuation when the active surface's video ends.
  pub fn on_surface_event<E: PlayerEngine>(
    &mut self,
    sources: Sources<'_>,
    ctl: &mut SurfaceController<E>,
    event: &SurfaceEvent,
  ) -> Option<Activation> {
    match event {
      SurfaceEvent::Opened(surface, video) => {
        self.active_surface = ctl.active();
        if let Some(p) = self.pending.take_if(|p| p.surface == *surface && p.video.same_video(video)) {
          info!(video_id = %p.video.id, %surface, "session: parked play opened");
          self.commit(p.video, p.position);
        }
        None
      }
      SurfaceEvent::Failed(surface, _) => {
        if self.pending.as_ref().is_some_and(|p| p.surface == *surface) {
          self.pending = None;
        }
        self.active_surface = ctl.active();
        if self.active_surface.is_none() && self.current.take().is_some() {
          info!(%surface, "session: idle after engine failure");
        }
        None
      }
      SurfaceEvent::Ended(surface) if self.active_surface == Some(*surface) => {
        self.advance(sources, ctl, Direction::Next, *surface)
      }
      SurfaceEvent::Ended(_) => None,
    }
  }

  /// Keep the queue pointer aligned after the entry at `removed` was dequeued.
  pub fn on_queue_removed(&mut self, removed: usize) {
    shift_for_removal(&mut self.position, removed);
    if let Some(p) = &mut self.pending {
      shift_for_removal(&mut p.position, removed);
    }
  }

  pub fn on_queue_cleared(&mut self) {
    let detach = |position: &mut Option<Position>| {
      if let Some(Position::Queue { .. }) = position {
        *position = Some(Position::Queue { index: 0, detached: true });
      }
    };
    detach(&mut self.position);
    if let Some(p) = &mut self.pending {
      detach(&mut p.position);
    }
  }
}
