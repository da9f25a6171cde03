//! Surface controller: owns both engines and keeps exactly one surface active.
//!
//! Switching surfaces hands the playback session over: the vacated engine is
//! stopped and the target engine resumes the same video at the captured time
//! with the same play/pause flag. A different video always starts at zero.
//! Opens aimed at an engine that has not reported ready are parked in a
//! one-slot pending request (last one wins) and flushed on the ready event.

use tracing::{debug, info, warn};

use crate::engine::{EngineEvent, EngineState, PlayerEngine, Surface};
use crate::video::VideoRef;

/// Outcome of an open request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
  Opened,
  /// The engine is not ready; the request is parked and the surface is not open yet.
  Deferred,
  /// The engine failed earlier and cannot open anything.
  Unavailable,
}

#[derive(Debug)]
pub enum SurfaceEvent {
  /// A deferred open was flushed after its engine became ready.
  Opened(Surface, VideoRef),
  /// The video on the active surface played to the end.
  Ended(Surface),
  /// The surface's engine failed; any parked open on it was dropped.
  Failed(Surface, String),
}

struct Slot<E> {
  engine: E,
  pending: Option<VideoRef>,
  failed: bool,
}

pub struct SurfaceController<E> {
  modal: Slot<E>,
  mini: Slot<E>,
  active: Option<Surface>,
  /// Video loaded on the active surface.
  loaded: Option<VideoRef>,
}

fn is_playing(state: EngineState) -> bool {
  matches!(state, EngineState::Playing | EngineState::Buffering)
}

impl<E: PlayerEngine> SurfaceController<E> {
  pub fn new(modal: E, mini: E) -> Self {
    Self {
      modal: Slot { engine: modal, pending: None, failed: false },
      mini: Slot { engine: mini, pending: None, failed: false },
      active: None,
      loaded: None,
    }
  }

  fn slot(&self, surface: Surface) -> &Slot<E> {
    match surface {
      Surface::Modal => &self.modal,
      Surface::Mini => &self.mini,
    }
  }

  fn slot_mut(&mut self, surface: Surface) -> &mut Slot<E> {
    match surface {
      Surface::Modal => &mut self.modal,
      Surface::Mini => &mut self.mini,
    }
  }

  pub fn active(&self) -> Option<Surface> {
    self.active
  }

  #[cfg(test)]
  pub(crate) fn loaded(&self) -> Option<&VideoRef> {
    self.loaded.as_ref()
  }

  #[cfg(test)]
  pub(crate) fn engine(&self, surface: Surface) -> &E {
    &self.slot(surface).engine
  }

  pub fn is_pending(&self, surface: Surface) -> bool {
    self.slot(surface).pending.is_some()
  }

  /// State and elapsed seconds of the active engine.
  pub fn active_status(&self) -> Option<(EngineState, f64)> {
    let engine = &self.slot(self.active?).engine;
    Some((engine.player_state(), engine.current_time()))
  }

  /// Show `video` on `target`, handing off from the currently active surface.
  pub fn open(&mut self, target: Surface, video: VideoRef) -> Activation {
    if self.slot(target).failed {
      warn!(surface = %target, video_id = %video.id, "surface: engine failed, cannot open");
      return Activation::Unavailable;
    }
    if !self.slot(target).engine.is_ready() {
      debug!(surface = %target, video_id = %video.id, "surface: engine not ready, deferring open");
      self.slot_mut(target).pending = Some(video);
      return Activation::Deferred;
    }
    self.activate(target, video);
    Activation::Opened
  }

  fn activate(&mut self, target: Surface, video: VideoRef) {
    let same_video = self.loaded.as_ref().is_some_and(|v| v.same_video(&video));
    if self.active == Some(target) && same_video {
      return;
    }

    let (start, autoplay) = match self.active {
      Some(from) if same_video => {
        let engine = &self.slot(from).engine;
        (engine.current_time(), is_playing(engine.player_state()))
      }
      _ => (0.0, true),
    };

    let other = target.other();
    let vacated = self.slot_mut(other);
    vacated.pending = None;
    if vacated.engine.is_ready() {
      vacated.engine.stop_video();
    }

    let engine = &mut self.slot_mut(target).engine;
    engine.load_video_by_id(&video.id, start);
    if autoplay {
      engine.play_video();
    } else {
      engine.pause_video();
    }

    info!(surface = %target, video_id = %video.id, start, autoplay, "surface: activated");
    self.active = Some(target);
    self.loaded = Some(video);
  }

  /// Close `surface`. Returns whether it was the active one.
  pub fn close(&mut self, surface: Surface) -> bool {
    self.slot_mut(surface).pending = None;
    if self.active != Some(surface) {
      return false;
    }
    self.slot_mut(surface).engine.stop_video();
    self.active = None;
    self.loaded = None;
    info!(surface = %surface, "surface: closed");
    true
  }

  /// Flip play/pause on the active engine. Returns the resulting state.
  pub fn toggle_pause(&mut self) -> Option<EngineState> {
    let engine = &mut self.slot_mut(self.active?).engine;
    if is_playing(engine.player_state()) {
      engine.pause_video();
    } else {
      engine.play_video();
    }
    Some(engine.player_state())
  }

  /// Drain both engines' events, flushing parked opens on ready.
  pub fn poll_events(&mut self) -> Vec<SurfaceEvent> {
    let mut out = Vec::new();
    for surface in [Surface::Modal, Surface::Mini] {
      while let Some(event) = self.slot_mut(surface).engine.poll_event() {
        match event {
          EngineEvent::Ready => {
            info!(surface = %surface, "surface: engine ready");
            if let Some(video) = self.slot_mut(surface).pending.take() {
              self.activate(surface, video.clone());
              out.push(SurfaceEvent::Opened(surface, video));
            }
          }
          EngineEvent::StateChange(EngineState::Ended) if self.active == Some(surface) => {
            debug!(surface = %surface, "surface: video ended");
            out.push(SurfaceEvent::Ended(surface));
          }
          EngineEvent::StateChange(state) => {
            debug!(surface = %surface, ?state, "surface: state change");
          }
          EngineEvent::Failed(reason) => {
            warn!(surface = %surface, reason = %reason, "surface: engine failed");
            let slot = self.slot_mut(surface);
            slot.failed = true;
            slot.pending = None;
            if self.active == Some(surface) {
              self.active = None;
              self.loaded = None;
            }
            out.push(SurfaceEvent::Failed(surface, reason));
          }
        }
      }
    }
    out
  }

  #[cfg(test)]
  pub(crate) fn engine_mut(&mut self, surface: Surface) -> &mut E {
    &mut self.slot_mut(surface).engine
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::fake::{Call, FakeEngine};
  use crate::store::tests::video;

  fn ready_controller() -> SurfaceController<FakeEngine> {
    SurfaceController::new(FakeEngine::ready(), FakeEngine::ready())
  }

  #[test]
  fn open_starts_from_zero_and_plays() {
    let mut ctl = ready_controller();
    assert_eq!(ctl.open(Surface::Modal, video("a")), Activation::Opened);
    assert_eq!(ctl.active(), Some(Surface::Modal));
    let modal = ctl.engine(Surface::Modal);
    assert_eq!(modal.calls, vec![Call::Load("a".into(), 0.0), Call::Play]);
  }

  #[test]
  fn handoff_same_video_keeps_time_and_play_state() {
    let mut ctl = ready_controller();
    ctl.open(Surface::Modal, video("a"));
    ctl.engine_mut(Surface::Modal).time = 42.5;

    assert_eq!(ctl.open(Surface::Mini, video("a")), Activation::Opened);
    assert_eq!(ctl.active(), Some(Surface::Mini));
    assert_eq!(ctl.engine(Surface::Mini).last_load(), Some(("a".into(), 42.5)));
    assert_eq!(ctl.engine(Surface::Mini).calls.last(), Some(&Call::Play));
    assert_eq!(ctl.engine(Surface::Modal).calls.last(), Some(&Call::Stop));
  }

  #[test]
  fn handoff_keeps_paused_flag() {
    let mut ctl = ready_controller();
    ctl.open(Surface::Mini, video("a"));
    ctl.toggle_pause();
    ctl.engine_mut(Surface::Mini).time = 7.0;

    ctl.open(Surface::Modal, video("a"));
    let modal = ctl.engine(Surface::Modal);
    assert_eq!(modal.last_load(), Some(("a".into(), 7.0)));
    assert_eq!(modal.calls.last(), Some(&Call::Pause));
    assert_eq!(modal.player_state(), EngineState::Paused);
  }

  #[test]
  fn different_video_starts_at_zero() {
    let mut ctl = ready_controller();
    ctl.open(Surface::Modal, video("a"));
    ctl.engine_mut(Surface::Modal).time = 90.0;

    ctl.open(Surface::Mini, video("b"));
    assert_eq!(ctl.engine(Surface::Mini).last_load(), Some(("b".into(), 0.0)));

    ctl.engine_mut(Surface::Mini).time = 12.0;
    ctl.open(Surface::Mini, video("c"));
    assert_eq!(ctl.engine(Surface::Mini).last_load(), Some(("c".into(), 0.0)));
  }

  #[test]
  fn only_one_engine_left_playing() {
    let mut ctl = ready_controller();
    ctl.open(Surface::Modal, video("a"));
    ctl.open(Surface::Mini, video("a"));
    assert_eq!(ctl.engine(Surface::Modal).player_state(), EngineState::Unstarted);
    assert_eq!(ctl.engine(Surface::Mini).player_state(), EngineState::Playing);
  }

  #[test]
  fn reopening_same_video_on_same_surface_is_a_no_op() {
    let mut ctl = ready_controller();
    ctl.open(Surface::Modal, video("a"));
    let calls = ctl.engine(Surface::Modal).calls.len();
    assert_eq!(ctl.open(Surface::Modal, video("a")), Activation::Opened);
    assert_eq!(ctl.engine(Surface::Modal).calls.len(), calls);
  }

  #[test]
  fn open_on_unready_engine_is_deferred_and_flushed_on_ready() {
    let mut ctl = SurfaceController::new(FakeEngine::not_ready(), FakeEngine::ready());
    assert_eq!(ctl.open(Surface::Modal, video("a")), Activation::Deferred);
    assert_eq!(ctl.active(), None);
    assert!(ctl.engine(Surface::Modal).calls.is_empty());
    assert!(ctl.is_pending(Surface::Modal));

    ctl.engine_mut(Surface::Modal).become_ready();
    let events = ctl.poll_events();
    assert!(matches!(events.as_slice(), [SurfaceEvent::Opened(Surface::Modal, v)] if v.id == "a"));
    assert_eq!(ctl.active(), Some(Surface::Modal));
    assert_eq!(ctl.engine(Surface::Modal).last_load(), Some(("a".into(), 0.0)));
  }

  #[test]
  fn last_pending_open_wins() {
    let mut ctl = SurfaceController::new(FakeEngine::not_ready(), FakeEngine::ready());
    ctl.open(Surface::Modal, video("a"));
    ctl.open(Surface::Modal, video("b"));
    ctl.engine_mut(Surface::Modal).become_ready();
    ctl.poll_events();
    let loads: Vec<_> = ctl.engine(Surface::Modal).calls.iter().filter(|c| matches!(c, Call::Load(..))).collect();
    assert_eq!(loads, vec![&Call::Load("b".into(), 0.0)]);
  }

  #[test]
  fn activating_other_surface_drops_its_pending_rival() {
    let mut ctl = SurfaceController::new(FakeEngine::not_ready(), FakeEngine::ready());
    ctl.open(Surface::Modal, video("a"));
    ctl.open(Surface::Mini, video("b"));
    assert!(!ctl.is_pending(Surface::Modal));

    ctl.engine_mut(Surface::Modal).become_ready();
    assert!(ctl.poll_events().is_empty());
    assert_eq!(ctl.active(), Some(Surface::Mini));
  }

  #[test]
  fn close_active_surface_stops_engine() {
    let mut ctl = ready_controller();
    ctl.open(Surface::Modal, video("a"));
    assert!(!ctl.close(Surface::Mini));
    assert_eq!(ctl.active(), Some(Surface::Modal));

    assert!(ctl.close(Surface::Modal));
    assert_eq!(ctl.active(), None);
    assert!(ctl.loaded().is_none());
    assert_eq!(ctl.engine(Surface::Modal).calls.last(), Some(&Call::Stop));
  }

  #[test]
  fn engine_failure_drops_parked_open_and_refuses_new_ones() {
    let mut ctl = SurfaceController::new(FakeEngine::not_ready(), FakeEngine::ready());
    assert_eq!(ctl.open(Surface::Modal, video("a")), Activation::Deferred);
    ctl.engine_mut(Surface::Modal).fail("mpv closed the IPC socket");

    let events = ctl.poll_events();
    assert!(matches!(&events[..], [SurfaceEvent::Failed(Surface::Modal, reason)] if reason == "mpv closed the IPC socket"));
    assert!(!ctl.is_pending(Surface::Modal));
    assert_eq!(ctl.open(Surface::Modal, video("b")), Activation::Unavailable);
    assert!(ctl.engine(Surface::Modal).calls.is_empty());

    assert_eq!(ctl.open(Surface::Mini, video("b")), Activation::Opened);
  }

  #[test]
  fn close_drops_pending_open() {
    let mut ctl = SurfaceController::new(FakeEngine::not_ready(), FakeEngine::ready());
    ctl.open(Surface::Modal, video("a"));
    ctl.close(Surface::Modal);
    ctl.engine_mut(Surface::Modal).become_ready();
    assert!(ctl.poll_events().is_empty());
    assert_eq!(ctl.active(), None);
  }

  #[test]
  fn ended_is_reported_only_for_active_surface() {
    let mut ctl = ready_controller();
    ctl.open(Surface::Mini, video("a"));
    ctl.engine_mut(Surface::Modal).finish_video();
    assert!(ctl.poll_events().is_empty());

    ctl.engine_mut(Surface::Mini).finish_video();
    assert!(matches!(ctl.poll_events().as_slice(), [SurfaceEvent::Ended(Surface::Mini)]));
  }

  #[test]
  fn toggle_pause_flips_active_engine() {
    let mut ctl = ready_controller();
    assert_eq!(ctl.toggle_pause(), None);
    ctl.open(Surface::Modal, video("a"));
    assert_eq!(ctl.toggle_pause(), Some(EngineState::Paused));
    assert_eq!(ctl.toggle_pause(), Some(EngineState::Playing));
  }
}
