use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::action::Action;
use crate::app::{App, Focus};
use crate::constants::constants;
use crate::engine::{PlayerEngine, Surface};

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

fn wrap_next(selected: Option<usize>, count: usize) -> usize {
  selected.map_or(0, |i| (i + 1) % count)
}

fn wrap_prev(selected: Option<usize>, count: usize) -> usize {
  selected.map_or(0, |i| if i == 0 { count.saturating_sub(1) } else { i - 1 })
}

/// A downward drag of at least `drag_dismiss_rows` rows dismisses the modal.
fn drag_dismisses(origin: u16, row: u16) -> bool {
  row.saturating_sub(origin) >= constants().drag_dismiss_rows
}

/// Ctrl chords that work regardless of focus.
fn global_action(key: &KeyEvent) -> Option<Action> {
  if !key.modifiers.contains(KeyModifiers::CONTROL) {
    return None;
  }
  match key.code {
    KeyCode::Char('c') => Some(Action::Quit),
    KeyCode::Char('t') => Some(Action::NextTheme),
    KeyCode::Char('r') => Some(Action::CycleRating),
    KeyCode::Char('f') => Some(Action::CycleContentType),
    KeyCode::Char('n') => Some(Action::Next),
    KeyCode::Char('p') => Some(Action::Prev),
    KeyCode::Char('o') => Some(Action::Resume),
    _ => None,
  }
}

/// Keys shared by the results and queue panes.
fn playback_key(key: &KeyEvent) -> Option<Action> {
  match key.code {
    KeyCode::Char(' ') => Some(Action::TogglePause),
    KeyCode::Char('n') => Some(Action::Next),
    KeyCode::Char('p') => Some(Action::Prev),
    KeyCode::Char('m') => Some(Action::Expand),
    KeyCode::Char('x') => Some(Action::Close(Surface::Mini)),
    _ => None,
  }
}

// --- Event Handling ---

pub fn handle_key_event<E: PlayerEngine>(app: &mut App<E>, key: KeyEvent) {
  if let Some(action) = global_action(&key) {
    app.dispatch(action);
    return;
  }

  if app.modal_open() {
    handle_modal_key(app, key);
    return;
  }

  match app.focus {
    Focus::Input => handle_input_key(app, key),
    Focus::Results => handle_results_key(app, key),
    Focus::Queue => handle_queue_key(app, key),
  }
}

fn handle_input_key<E: PlayerEngine>(app: &mut App<E>, key: KeyEvent) {
  app.clear_error();
  match key.code {
    KeyCode::Enter => {
      app.dispatch(Action::Search);
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.input.clear();
        app.cursor_position = 0;
        app.input_scroll = 0;
      } else if !app.results.is_empty() {
        app.focus = Focus::Results;
      } else {
        app.dispatch(Action::Quit);
      }
    }
    KeyCode::Down => {
      if !app.results.is_empty() {
        app.focus = Focus::Results;
      }
    }
    KeyCode::Tab => {
      app.focus = Focus::Queue;
    }
    _ => {}
  }
}

fn handle_results_key<E: PlayerEngine>(app: &mut App<E>, key: KeyEvent) {
  if let Some(action) = playback_key(&key) {
    app.dispatch(action);
    return;
  }
  let count = app.results.len();
  let selected = app.results_state.selected();
  match key.code {
    KeyCode::Enter => {
      if let Some(i) = selected {
        app.dispatch(Action::PlayResult(i));
      }
    }
    KeyCode::Char('a') => {
      if let Some(i) = selected {
        app.dispatch(Action::Enqueue(i));
      }
    }
    KeyCode::Char('r') => {
      if let Some(i) = selected {
        app.dispatch(Action::Unqueue(i));
      }
    }
    KeyCode::Down | KeyCode::Char('j') => {
      if count > 0 {
        app.select_result(wrap_next(selected, count));
      }
    }
    KeyCode::Up | KeyCode::Char('k') => {
      if count > 0 {
        app.select_result(wrap_prev(selected, count));
      }
    }
    KeyCode::End | KeyCode::Char('G') => {
      app.select_result(count.saturating_sub(1));
    }
    KeyCode::Tab => {
      app.focus = Focus::Queue;
    }
    KeyCode::Esc | KeyCode::Char('/') => {
      app.focus = Focus::Input;
    }
    _ => {}
  }
}

fn handle_queue_key<E: PlayerEngine>(app: &mut App<E>, key: KeyEvent) {
  if let Some(action) = playback_key(&key) {
    app.dispatch(action);
    return;
  }
  let count = app.queue.len();
  let selected = app.queue_state.selected();
  match key.code {
    KeyCode::Enter => {
      if let Some(i) = selected {
        app.dispatch(Action::PlayQueued(i));
      }
    }
    KeyCode::Char('d') | KeyCode::Delete => {
      if let Some(i) = selected {
        app.dispatch(Action::Dequeue(i));
      }
    }
    KeyCode::Char('c') => {
      app.dispatch(Action::ClearQueue);
    }
    KeyCode::Down | KeyCode::Char('j') => {
      if count > 0 {
        app.queue_state.select(Some(wrap_next(selected, count)));
      }
    }
    KeyCode::Up | KeyCode::Char('k') => {
      if count > 0 {
        app.queue_state.select(Some(wrap_prev(selected, count)));
      }
    }
    KeyCode::Tab => {
      app.focus = if app.results.is_empty() { Focus::Input } else { Focus::Results };
    }
    KeyCode::Esc | KeyCode::Char('/') => {
      app.focus = Focus::Input;
    }
    _ => {}
  }
}

fn handle_modal_key<E: PlayerEngine>(app: &mut App<E>, key: KeyEvent) {
  let count = app.recommendations().len();
  let selected = app.recs_state.selected();
  match key.code {
    KeyCode::Esc => app.dispatch(Action::Minimize),
    KeyCode::Char('x') => app.dispatch(Action::Close(Surface::Modal)),
    KeyCode::Char(' ') => app.dispatch(Action::TogglePause),
    KeyCode::Char('n') => app.dispatch(Action::Next),
    KeyCode::Char('p') => app.dispatch(Action::Prev),
    KeyCode::Char('d') => app.dispatch(Action::ToggleDescription),
    KeyCode::Char('a') => app.dispatch(Action::EnqueueCurrent),
    KeyCode::Down | KeyCode::Char('j') => {
      if count > 0 {
        app.recs_state.select(Some(wrap_next(selected, count)));
      }
    }
    KeyCode::Up | KeyCode::Char('k') => {
      if count > 0 {
        app.recs_state.select(Some(wrap_prev(selected, count)));
      }
    }
    KeyCode::Enter => {
      if let Some(i) = selected {
        app.dispatch(Action::PlayRecommendation(i));
      }
    }
    _ => {}
  }
}

pub fn handle_mouse_event<E: PlayerEngine>(app: &mut App<E>, mouse: MouseEvent) {
  if app.modal_open() {
    match mouse.kind {
      MouseEventKind::Down(MouseButton::Left) => app.drag_origin = Some(mouse.row),
      MouseEventKind::Drag(MouseButton::Left) => {
        if let Some(origin) = app.drag_origin
          && drag_dismisses(origin, mouse.row)
        {
          app.drag_origin = None;
          app.dispatch(Action::Minimize);
        }
      }
      MouseEventKind::Up(_) => app.drag_origin = None,
      _ => {}
    }
    return;
  }

  let count = app.results.len();
  if count == 0 {
    return;
  }
  match mouse.kind {
    MouseEventKind::ScrollDown => {
      let next = app.results_state.selected().map_or(0, |i| i + 1).min(count - 1);
      app.select_result(next);
    }
    MouseEventKind::ScrollUp => {
      let prev = app.results_state.selected().map_or(0, |i| i.saturating_sub(1));
      app.select_result(prev);
    }
    _ => {}
  }
}
