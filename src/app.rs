use ratatui::widgets::ListState;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::api::{ApiClient, ApiError, DescriptionState};
use crate::config::Config;
use crate::constants::constants;
use crate::engine::{EngineState, PlayerEngine, Surface};
use crate::search::{SearchError, SearchOrchestrator, SearchOutcome};
use crate::session::{Direction, PlaybackSession, Source, Sources};
use crate::store::{QueueStore, ResultStore};
use crate::surface::{Activation, SurfaceController, SurfaceEvent};
use crate::theme::{self, THEMES};
use crate::video::{ContentType, DetailsResponse, Rating, SearchQuery, VideoRef};

// --- Types ---

type DetailsReply = Result<DetailsResponse, ApiError>;

/// Which pane takes keys when the modal is not showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
  Input,
  Results,
  Queue,
}

/// In-flight description fetch for the modal, tagged with the video it belongs to.
struct DetailsRequest {
  video_id: String,
  rx: oneshot::Receiver<DetailsReply>,
}

pub struct App<E> {
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub focus: Focus,
  pub theme_index: usize,
  pub rating: Rating,
  pub content_type: ContentType,
  pub results: ResultStore,
  pub queue: QueueStore,
  pub results_state: ListState,
  pub queue_state: ListState,
  pub recs_state: ListState,
  pub session: PlaybackSession,
  pub surfaces: SurfaceController<E>,
  search: SearchOrchestrator,
  client: ApiClient,
  pub description: DescriptionState,
  pub description_expanded: bool,
  details: Option<DetailsRequest>,
  /// Video the description panel currently belongs to.
  described_id: Option<String>,
  pub last_error: Option<String>,
  pub status_message: Option<String>,
  /// Informational message, shown below status and errors.
  pub info_message: Option<String>,
  pub should_quit: bool,
  /// Row where a mouse drag on the modal started.
  pub drag_origin: Option<u16>,
  config: Config,
  error_time: Option<Instant>,
}

impl<E: PlayerEngine> App<E> {
  pub fn new(config: Config, client: ApiClient, surfaces: SurfaceController<E>) -> Self {
    let theme_index = theme::index_of(config.theme_name.as_deref());
    let rating = config.rating.as_deref().map(Rating::from_config).unwrap_or_default();
    let content_type = config.content_type.as_deref().map(ContentType::from_config).unwrap_or_default();

    Self {
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      focus: Focus::Input,
      theme_index,
      rating,
      content_type,
      results: ResultStore::new(),
      queue: QueueStore::new(),
      results_state: ListState::default(),
      queue_state: ListState::default(),
      recs_state: ListState::default(),
      session: PlaybackSession::new(),
      surfaces,
      search: SearchOrchestrator::new(client.clone()),
      client,
      description: DescriptionState::Idle,
      description_expanded: false,
      details: None,
      described_id: None,
      last_error: None,
      status_message: None,
      info_message: None,
      should_quit: false,
      drag_origin: None,
      config,
      error_time: None,
    }
  }

  pub fn theme(&self) -> &'static theme::Theme {
    // theme_index comes from theme::index_of or modular arithmetic in next_theme.
    &THEMES[self.theme_index]
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages after `error_dismiss_secs`.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().error_dismiss_secs)
    {
      self.clear_error();
    }
  }

  fn save_config(&mut self) {
    self.config.theme_name = Some(self.theme().name.to_string());
    self.config.rating = Some(self.rating.as_param().to_string());
    self.config.content_type = Some(self.content_type.as_param().to_string());
    self.config.save();
  }

  /// Whether the full player has the screen.
  pub fn modal_open(&self) -> bool {
    self.session.active_surface() == Some(Surface::Modal)
  }

  pub fn mini_open(&self) -> bool {
    self.session.active_surface() == Some(Surface::Mini)
  }

  /// Badge for result rows, following the filter the list was fetched with.
  pub fn result_badge(&self) -> &'static str {
    self.search.last_query().map_or(self.content_type, |q| q.content_type).badge()
  }

  pub fn is_loading(&self) -> bool {
    self.search.is_loading()
  }

  pub fn is_loading_more(&self) -> bool {
    self.search.is_loading_more()
  }

  /// Results following the current video, shown under the modal.
  pub fn recommendations(&self) -> &[VideoRef] {
    match self.session.current() {
      Some(current) => self.results.following(&current.id, constants().recommendation_count),
      None => &[],
    }
  }

  fn recommendation_index(&self, n: usize) -> Option<usize> {
    let current = self.session.current()?;
    if n >= self.recommendations().len() {
      return None;
    }
    Some(self.results.index_of(&current.id).map_or(0, |i| i + 1) + n)
  }

  /// State and elapsed seconds of whatever is playing.
  pub fn playback_status(&self) -> Option<(EngineState, f64)> {
    self.surfaces.active_status()
  }

  /// New selections go to the mini player while it is up, otherwise to the modal.
  fn selection_surface(&self) -> Surface {
    if self.mini_open() { Surface::Mini } else { Surface::Modal }
  }

  // --- Dispatch ---

  pub fn dispatch(&mut self, action: Action) {
    debug!(?action, "dispatch");
    match action {
      Action::Search => self.trigger_search(),
      Action::LoadMore => self.trigger_load_more(),
      Action::CycleRating => {
        self.rating = self.rating.next();
        self.info_message = Some(format!("Rating: {} (applies to the next search)", self.rating.label()));
        self.save_config();
      }
      Action::CycleContentType => {
        self.content_type = self.content_type.next();
        self.info_message = Some(format!("Type: {} (applies to the next search)", self.content_type.as_param()));
        self.save_config();
      }
      Action::PlayResult(index) => self.play(Source::Results, index),
      Action::PlayQueued(index) => self.play(Source::Queue, index),
      Action::PlayRecommendation(n) => {
        if let Some(index) = self.recommendation_index(n) {
          self.play(Source::Results, index);
        }
      }
      Action::Next => self.advance(Direction::Next),
      Action::Prev => self.advance(Direction::Prev),
      Action::TogglePause => {
        if let Some(state) = self.surfaces.toggle_pause() {
          debug!(?state, "playback: toggled pause");
        }
      }
      Action::Enqueue(index) => {
        if let Some(video) = self.results.get(index).cloned() {
          self.enqueue(video);
        }
      }
      Action::EnqueueCurrent => {
        if let Some(video) = self.session.current().cloned() {
          self.enqueue(video);
        }
      }
      Action::Dequeue(index) => {
        if let Some(video) = self.queue.dequeue_at(index) {
          info!(video_id = %video.id, index, "queue: removed");
          self.session.on_queue_removed(index);
          clamp_selection(&mut self.queue_state, self.queue.len());
        }
      }
      Action::Unqueue(index) => {
        let Some(video) = self.results.get(index) else { return };
        let title = video.title.clone();
        match self.queue.remove_by_id(&video.id) {
          Some(removed) => {
            info!(title = %title, index = removed, "queue: removed");
            self.session.on_queue_removed(removed);
            clamp_selection(&mut self.queue_state, self.queue.len());
            self.info_message = Some(format!("Removed from queue: {}", title));
          }
          None => self.info_message = Some("Not in queue.".to_string()),
        }
      }
      Action::ClearQueue => {
        self.queue.clear();
        self.session.on_queue_cleared();
        self.queue_state.select(None);
        self.info_message = Some("Queue cleared.".to_string());
      }
      Action::Minimize => {
        if self.modal_open() {
          self.switch_surface(Surface::Mini);
        }
      }
      Action::Expand => {
        if self.mini_open() {
          self.switch_surface(Surface::Modal);
        }
      }
      Action::Close(surface) => {
        self.session.close(&mut self.surfaces, surface);
        self.drag_origin = None;
      }
      Action::Resume => {
        if self.session.active_surface().is_none() {
          match self.session.resume(&mut self.surfaces, Surface::Modal) {
            Ok(activation) => self.note_activation(activation),
            Err(e) => self.info_message = Some(format!("Nothing to resume: {}", e)),
          }
        }
      }
      Action::ToggleDescription => self.description_expanded = !self.description_expanded,
      Action::NextTheme => {
        self.theme_index = (self.theme_index + 1) % THEMES.len();
        self.save_config();
      }
      Action::Quit => self.should_quit = true,
    }
  }

  fn play(&mut self, source: Source, index: usize) {
    let surface = self.selection_surface();
    let sources = Sources { results: &self.results, queue: &self.queue };
    match self.session.play_at(sources, &mut self.surfaces, source, index, surface) {
      Ok(activation) => {
        self.clear_error();
        self.note_activation(activation);
      }
      Err(e) => {
        warn!(err = %e, "playback: play request rejected");
        self.set_error(e.to_string());
      }
    }
  }

  fn advance(&mut self, direction: Direction) {
    let surface = self.session.active_surface().unwrap_or_else(|| self.selection_surface());
    let sources = Sources { results: &self.results, queue: &self.queue };
    if let Some(activation) = self.session.advance(sources, &mut self.surfaces, direction, surface) {
      self.note_activation(activation);
    }
  }

  fn switch_surface(&mut self, target: Surface) {
    match self.session.switch_surface(&mut self.surfaces, target) {
      Ok(activation) => self.note_activation(activation),
      Err(e) => debug!(err = %e, "playback: nothing to switch"),
    }
  }

  fn note_activation(&mut self, activation: Activation) {
    match activation {
      Activation::Opened => {}
      Activation::Deferred => self.status_message = Some("Starting player…".to_string()),
      Activation::Unavailable => self.set_error("Player unavailable. Restart amfilter to retry.".to_string()),
    }
  }

  fn enqueue(&mut self, video: VideoRef) {
    let title = video.title.clone();
    if self.queue.enqueue(video) {
      info!(title = %title, len = self.queue.len(), "queue: added");
      self.info_message = Some(format!("Queued: {}", title));
      if self.queue_state.selected().is_none() {
        self.queue_state.select(Some(0));
      }
    } else {
      self.info_message = Some("Already in queue.".to_string());
    }
  }

  // --- Search ---

  pub fn trigger_search(&mut self) {
    let query = SearchQuery { text: self.input.clone(), rating: self.rating, content_type: self.content_type };
    match self.search.search(query) {
      Ok(()) => {
        self.clear_error();
        self.info_message = None;
        self.status_message = Some(format!("Searching '{}'…", self.input.trim()));
      }
      Err(e @ SearchError::InFlight) => self.info_message = Some(e.to_string()),
      Err(e) => self.set_error(e.to_string()),
    }
  }

  pub fn trigger_load_more(&mut self) {
    if self.search.load_more(&self.results) {
      debug!(len = self.results.len(), "search: load more requested");
    }
  }

  /// Move the result selection, fetching the next page when it nears the end.
  pub fn select_result(&mut self, index: usize) {
    let len = self.results.len();
    if len == 0 {
      return;
    }
    let index = index.min(len - 1);
    self.results_state.select(Some(index));
    if index + constants().load_more_threshold >= len {
      self.trigger_load_more();
    }
  }

  // --- Description ---

  fn begin_details(&mut self, video_id: &str) -> oneshot::Sender<DetailsReply> {
    let (tx, rx) = oneshot::channel();
    self.description = DescriptionState::Loading;
    self.description_expanded = false;
    self.described_id = Some(video_id.to_string());
    self.details = Some(DetailsRequest { video_id: video_id.to_string(), rx });
    self.recs_state.select(None);
    tx
  }

  fn trigger_details(&mut self, video_id: String) {
    let tx = self.begin_details(&video_id);
    let client = self.client.clone();
    tokio::spawn(async move {
      let _ = tx.send(client.video_details(&video_id).await);
    });
  }

  /// Fetch the description whenever the modal shows a video it has not described yet.
  fn sync_description(&mut self) {
    if !self.modal_open() {
      return;
    }
    let Some(current) = self.session.current() else { return };
    if self.described_id.as_deref() != Some(current.id.as_str()) {
      let id = current.id.clone();
      self.trigger_details(id);
    }
  }

  fn poll_details(&mut self) {
    let Some(mut req) = self.details.take() else { return };
    match req.rx.try_recv() {
      Ok(result) => {
        if let Err(e) = &result {
          warn!(video_id = %req.video_id, err = %e, "details: fetch failed");
        }
        if self.described_id.as_deref() == Some(req.video_id.as_str()) {
          self.description = DescriptionState::from_result(result);
        }
      }
      Err(oneshot::error::TryRecvError::Empty) => self.details = Some(req),
      Err(oneshot::error::TryRecvError::Closed) => {
        if self.described_id.as_deref() == Some(req.video_id.as_str()) {
          self.description = DescriptionState::Failed;
        }
      }
    }
  }

  // --- Polling ---

  fn poll_search(&mut self) {
    let Some(outcome) = self.search.poll(&mut self.results) else { return };
    self.status_message = None;
    match outcome {
      SearchOutcome::Replaced { count } => {
        self.recs_state.select(None);
        if count == 0 {
          self.results_state.select(None);
          self.info_message = Some("No results found.".to_string());
        } else {
          self.results_state.select(Some(0));
          self.info_message = Some(format!("Showing {} videos", self.results.len()));
          self.focus = Focus::Results;
        }
      }
      SearchOutcome::Appended { .. } => {
        self.info_message = Some(format!("Showing {} videos", self.results.len()));
      }
      SearchOutcome::Failed(msg) => self.set_error(msg),
    }
  }

  fn poll_surfaces(&mut self) {
    for event in self.surfaces.poll_events() {
      match &event {
        SurfaceEvent::Opened(surface, video) => {
          info!(%surface, video_id = %video.id, "playback: deferred open completed");
          self.status_message = None;
        }
        SurfaceEvent::Failed(surface, reason) => {
          self.status_message = None;
          self.set_error(format!("The {} player stopped: {}", surface, reason));
        }
        SurfaceEvent::Ended(_) => {}
      }
      let sources = Sources { results: &self.results, queue: &self.queue };
      if let Some(activation) = self.session.on_surface_event(sources, &mut self.surfaces, &event) {
        self.note_activation(activation);
      }
    }
  }

  /// One pass of background bookkeeping; called every loop iteration.
  pub fn tick(&mut self) {
    self.poll_search();
    self.poll_surfaces();
    self.sync_description();
    self.poll_details();
    self.expire_error();
  }
}

fn clamp_selection(state: &mut ListState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    Some(i) if i >= len => state.select(Some(len - 1)),
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::fake::{Call, FakeEngine};
  use crate::store::tests::{page, video};

  fn app() -> App<FakeEngine> {
    let client = ApiClient::new("http://127.0.0.1:9").unwrap();
    let surfaces = SurfaceController::new(FakeEngine::ready(), FakeEngine::ready());
    let mut app = App::new(Config::default(), client, surfaces);
    app.results.replace(page("r", 12, Some("T1")));
    app
  }

  fn current_id(app: &App<FakeEngine>) -> Option<&str> {
    app.session.current().map(|v| v.id.as_str())
  }

  #[test]
  fn empty_search_is_rejected_locally() {
    let mut app = app();
    app.input = "   ".to_string();
    app.dispatch(Action::Search);
    assert_eq!(app.last_error.as_deref(), Some("Please enter a keyword."));
    assert!(!app.is_loading());
  }

  #[test]
  fn selecting_a_result_opens_the_modal() {
    let mut app = app();
    app.dispatch(Action::PlayResult(2));
    assert!(app.modal_open());
    assert_eq!(current_id(&app), Some("r2"));
    assert_eq!(app.surfaces.engine(Surface::Modal).last_load(), Some(("r2".to_string(), 0.0)));
  }

  #[test]
  fn selecting_while_minimized_stays_in_the_mini_player() {
    let mut app = app();
    app.dispatch(Action::PlayResult(0));
    app.dispatch(Action::Minimize);
    assert!(app.mini_open());

    app.dispatch(Action::PlayResult(5));
    assert!(app.mini_open());
    assert_eq!(app.surfaces.engine(Surface::Mini).last_load(), Some(("r5".to_string(), 0.0)));
  }

  #[test]
  fn minimize_hands_off_elapsed_time() {
    let mut app = app();
    app.dispatch(Action::PlayResult(1));
    app.surfaces.engine_mut(Surface::Modal).time = 42.0;
    app.dispatch(Action::Minimize);
    assert_eq!(app.surfaces.engine(Surface::Mini).last_load(), Some(("r1".to_string(), 42.0)));
    assert_eq!(app.surfaces.engine(Surface::Modal).calls.last(), Some(&Call::Stop));

    app.dispatch(Action::Expand);
    assert!(app.modal_open());
  }

  #[test]
  fn closing_everything_goes_idle_and_resume_reopens() {
    let mut app = app();
    app.dispatch(Action::PlayResult(3));
    app.dispatch(Action::Minimize);
    app.dispatch(Action::Close(Surface::Mini));
    assert!(app.session.is_idle());

    app.dispatch(Action::Resume);
    assert!(app.modal_open());
    assert_eq!(current_id(&app), Some("r3"));
  }

  #[test]
  fn enqueue_reports_duplicates() {
    let mut app = app();
    app.dispatch(Action::Enqueue(4));
    assert_eq!(app.info_message.as_deref(), Some("Queued: Title r4"));
    app.dispatch(Action::Enqueue(4));
    assert_eq!(app.info_message.as_deref(), Some("Already in queue."));
    assert_eq!(app.queue.len(), 1);
    assert_eq!(app.queue_state.selected(), Some(0));
  }

  #[test]
  fn unqueue_removes_result_from_queue() {
    let mut app = app();
    app.dispatch(Action::Enqueue(2));
    app.dispatch(Action::Enqueue(4));
    app.dispatch(Action::Unqueue(2));
    assert_eq!(app.info_message.as_deref(), Some("Removed from queue: Title r2"));
    assert_eq!(app.queue.len(), 1);
    app.dispatch(Action::Unqueue(2));
    assert_eq!(app.info_message.as_deref(), Some("Not in queue."));
  }

  #[test]
  fn queue_plays_before_results() {
    let mut app = app();
    app.queue.enqueue(video("A"));
    app.queue.enqueue(video("B"));
    app.dispatch(Action::PlayQueued(0));
    app.dispatch(Action::Next);
    assert_eq!(current_id(&app), Some("B"));
    app.dispatch(Action::Next);
    assert_eq!(current_id(&app), Some("r0"));
  }

  #[test]
  fn dequeue_clamps_selection() {
    let mut app = app();
    app.dispatch(Action::Enqueue(0));
    app.dispatch(Action::Enqueue(1));
    app.queue_state.select(Some(1));
    app.dispatch(Action::Dequeue(1));
    assert_eq!(app.queue_state.selected(), Some(0));
    app.dispatch(Action::Dequeue(0));
    assert_eq!(app.queue_state.selected(), None);
  }

  #[test]
  fn recommendations_follow_current_video() {
    let mut app = app();
    app.dispatch(Action::PlayResult(1));
    let recs: Vec<&str> = app.recommendations().iter().map(|v| v.id.as_str()).collect();
    assert_eq!(recs, vec!["r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10"]);

    app.dispatch(Action::PlayRecommendation(2));
    assert_eq!(current_id(&app), Some("r4"));
    app.dispatch(Action::PlayRecommendation(50));
    assert_eq!(current_id(&app), Some("r4"));
  }

  #[test]
  fn ended_video_autoplays_next() {
    let mut app = app();
    app.dispatch(Action::PlayResult(11));
    app.dispatch(Action::Minimize);
    app.surfaces.engine_mut(Surface::Mini).finish_video();
    app.tick();
    assert_eq!(current_id(&app), Some("r0"));
  }

  #[test]
  fn description_reply_for_current_video() {
    let mut app = app();
    let tx = app.begin_details("r1");
    assert_eq!(app.description, DescriptionState::Loading);
    tx.send(serde_json::from_str(r#"{"items":[]}"#).map_err(|e| ApiError::Decode(e.to_string()))).unwrap();
    app.poll_details();
    assert_eq!(app.description.text(), "No description available.");
  }

  #[test]
  fn stale_description_reply_is_dropped() {
    let mut app = app();
    let stale = app.begin_details("r1");
    let _fresh = app.begin_details("r2");
    assert!(stale.send(Err(ApiError::Timeout)).is_err());
    app.poll_details();
    assert_eq!(app.description, DescriptionState::Loading);
  }

  #[tokio::test]
  async fn select_result_near_end_requests_more() {
    let mut app = app();
    let query = SearchQuery { text: "lofi".into(), rating: Rating::All, content_type: ContentType::All };
    let tx = app.search.begin_search(query).unwrap();
    tx.send(Ok(page("r", 12, Some("T1")))).unwrap();
    app.poll_search();

    app.select_result(3);
    assert!(!app.is_loading_more());
    assert_eq!(app.results_state.selected(), Some(3));

    app.select_result(40);
    assert_eq!(app.results_state.selected(), Some(11));
    assert!(app.is_loading_more());
  }

  #[test]
  fn search_while_one_is_running_is_ignored() {
    let mut app = app();
    let query = SearchQuery { text: "lofi".into(), rating: Rating::All, content_type: ContentType::All };
    let _tx = app.search.begin_search(query).unwrap();
    app.input = "jazz".into();
    app.trigger_search();
    assert_eq!(app.info_message.as_deref(), Some("A search is already running."));
    assert_eq!(app.search.last_query().map(|q| q.text.as_str()), Some("lofi"));
    assert!(app.last_error.is_none());
  }

  #[test]
  fn engine_failure_replaces_starting_status_with_error() {
    let mut app = app();
    app.surfaces = SurfaceController::new(FakeEngine::not_ready(), FakeEngine::ready());
    app.dispatch(Action::PlayResult(2));
    assert_eq!(app.status_message.as_deref(), Some("Starting player…"));
    assert_eq!(current_id(&app), None);

    app.surfaces.engine_mut(Surface::Modal).fail("mpv IPC socket never came up");
    app.poll_surfaces();
    assert_eq!(app.status_message, None);
    assert_eq!(app.last_error.as_deref(), Some("The modal player stopped: mpv IPC socket never came up"));
    assert!(app.surfaces.engine(Surface::Modal).calls.is_empty());

    app.dispatch(Action::PlayResult(2));
    assert_eq!(app.status_message, None);
    assert_eq!(app.last_error.as_deref(), Some("Player unavailable. Restart amfilter to retry."));
  }
}
