use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, List, ListItem, ListState, Padding, Paragraph, Wrap},
};

use crate::app::{App, Focus};
use crate::engine::{EngineState, PlayerEngine, Surface};
use crate::session::Sources;
use crate::theme::Theme;
use crate::video::VideoRef;

const COLLAPSED_DESCRIPTION_LINES: usize = 3;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// Keep the cursor column inside a `width`-wide window starting at `scroll`.
fn follow_cursor(scroll: usize, cursor_col: usize, width: usize) -> usize {
  if cursor_col < scroll {
    cursor_col
  } else if width > 0 && cursor_col >= scroll + width {
    cursor_col + 1 - width
  } else {
    scroll
  }
}

/// The chars of `s` whose columns fall in `[scroll, scroll + width)`. A wide char
/// straddling the left edge is dropped.
fn visible_window(s: &str, scroll: usize, width: usize) -> String {
  use unicode_width::UnicodeWidthChar;
  let mut out = String::new();
  let mut col = 0;
  for c in s.chars() {
    let w = c.width().unwrap_or(0);
    if col >= scroll + width {
      break;
    }
    if col >= scroll {
      out.push(c);
    }
    col += w;
  }
  out
}

/// `m:ss`, or `h:mm:ss` past the hour.
fn format_time(secs: f64) -> String {
  let total = secs.max(0.0) as u64;
  let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
  if h > 0 { format!("{}:{:02}:{:02}", h, m, s) } else { format!("{}:{:02}", m, s) }
}

fn state_label(state: EngineState) -> (&'static str, &'static str) {
  match state {
    EngineState::Playing => ("▶", "Playing"),
    EngineState::Paused => ("⏸", "Paused"),
    EngineState::Buffering => ("…", "Buffering"),
    EngineState::Ended => ("■", "Ended"),
    EngineState::Unstarted => ("·", "Starting"),
  }
}

/// Row of the playing video in the results list, or in the queue when `in_queue`.
fn playing_index<E: PlayerEngine>(app: &App<E>, in_queue: bool) -> Option<usize> {
  if app.session.is_idle() || app.session.is_playing_from_queue() != in_queue {
    return None;
  }
  app.session.source_index(Sources { results: &app.results, queue: &app.queue })
}

fn rounded_block<'a>(title: impl Into<Line<'a>>, theme: &Theme, focused: bool) -> Block<'a> {
  let color = if focused { theme.accent } else { theme.border };
  Block::bordered()
    .title(title)
    .title_style(Style::default().fg(if focused { theme.accent } else { theme.muted }).add_modifier(Modifier::BOLD))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(color))
}

/// One list row: title on the left, muted metadata right-aligned.
fn video_line<'a>(video: &VideoRef, right: String, inner_w: usize, fg: ratatui::style::Color, theme: &Theme) -> Line<'a> {
  let right_w = right.chars().count();
  let title = truncate_str(&video.title, inner_w.saturating_sub(right_w + 2));
  let gap = inner_w.saturating_sub(title.chars().count() + right_w);
  Line::from(vec![
    Span::styled(title, Style::default().fg(fg)),
    Span::raw(" ".repeat(gap)),
    Span::styled(right, Style::default().fg(theme.muted)),
  ])
}

fn render_video_list(
  frame: &mut Frame,
  area: Rect,
  theme: &Theme,
  block: Block,
  rows: Vec<Line<'static>>,
  state: &mut ListState,
) {
  let items: Vec<ListItem> = rows
    .into_iter()
    .enumerate()
    .map(|(i, line)| {
      let bg = if i % 2 == 1 { theme.stripe_bg } else { theme.bg };
      ListItem::new(line).bg(bg)
    })
    .collect();
  let list = List::new(items)
    .block(block)
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));
  frame.render_stateful_widget(list, area, state);
}

// --- UI Rendering ---

pub fn ui<E: PlayerEngine>(frame: &mut Frame, app: &mut App<E>) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let mini_height = if app.mini_open() { 3 } else { 0 };
  let [header_area, main_area, mini_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(5),
    Constraint::Length(mini_height),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  if app.modal_open() {
    render_modal(frame, app, main_area);
  } else if app.results.is_empty() && app.queue.is_empty() {
    render_welcome(frame, theme, main_area);
  } else {
    render_lists(frame, app, main_area);
  }
  if app.mini_open() {
    render_mini(frame, app, mini_area);
  }
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);
}

fn render_header<E: PlayerEngine>(frame: &mut Frame, app: &App<E>, area: Rect) {
  let theme = app.theme();
  let left = Line::from(Span::styled(" ▶ amfilter ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let right_text = format!("{} · {}  v{} ", app.rating.label(), app.content_type.as_param(), env!("CARGO_PKG_VERSION"));
  let width = right_text.chars().count() as u16;
  let right = Line::from(Span::styled(right_text, Style::default().fg(theme.muted)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(width), width: width.min(area.width), ..area };
  frame.render_widget(right, right_area);
}

fn render_welcome(frame: &mut Frame, theme: &Theme, area: Rect) {
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("▶  amfilter", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Search videos, queue them up, keep one playing.", Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled("Type a keyword below and press Enter.", Style::default().fg(theme.muted))),
    Line::from(Span::styled("^r rating  ^f type  ^t theme", Style::default().fg(theme.muted))),
  ];
  let paragraph = Paragraph::new(text)
    .alignment(Alignment::Center)
    .block(Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border)));
  frame.render_widget(paragraph, area);
}

fn render_lists<E: PlayerEngine>(frame: &mut Frame, app: &mut App<E>, area: Rect) {
  let [results_area, queue_area] =
    Layout::horizontal([Constraint::Percentage(68), Constraint::Percentage(32)]).areas(area);
  render_results(frame, app, results_area);
  render_queue(frame, app, queue_area);
}

fn render_results<E: PlayerEngine>(frame: &mut Frame, app: &mut App<E>, area: Rect) {
  let theme = app.theme();
  let inner_w = area.width.saturating_sub(4) as usize;
  let badge = app.result_badge();
  let playing_index = playing_index(app, false);

  let rows: Vec<Line<'static>> = app
    .results
    .items()
    .iter()
    .enumerate()
    .map(|(i, video)| {
      let queued = app.queue.contains(&video.id);
      let playing = playing_index == Some(i);
      let date = video.published.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
      let marker = if queued { "+ " } else { "" };
      let right = format!("{}{}  {}  {}", marker, truncate_str(&video.channel, 18), date, badge);
      let fg = if playing { theme.accent } else if queued { theme.queued } else { theme.fg };
      video_line(video, right, inner_w, fg, theme)
    })
    .collect();

  let suffix = if app.is_loading() && !app.is_loading_more() {
    " (searching…)"
  } else if app.is_loading_more() {
    " (loading more…)"
  } else if app.results.has_more() {
    " …"
  } else {
    ""
  };
  let title = format!(" Results · {}{} ", app.results.len(), suffix);
  let block = rounded_block(title, theme, app.focus == Focus::Results);
  render_video_list(frame, area, theme, block, rows, &mut app.results_state);
}

fn render_queue<E: PlayerEngine>(frame: &mut Frame, app: &mut App<E>, area: Rect) {
  let theme = app.theme();
  let inner_w = area.width.saturating_sub(4) as usize;
  let playing_index = playing_index(app, true);

  let rows: Vec<Line<'static>> = app
    .queue
    .items()
    .iter()
    .enumerate()
    .map(|(i, video)| {
      let playing = playing_index == Some(i);
      let fg = if playing { theme.accent } else { theme.fg };
      video_line(video, format!("{}", i + 1), inner_w, fg, theme)
    })
    .collect();

  let title = format!(" Queue · {} ", app.queue.len());
  let block = rounded_block(title, theme, app.focus == Focus::Queue);
  render_video_list(frame, area, theme, block, rows, &mut app.queue_state);
}

fn render_modal<E: PlayerEngine>(frame: &mut Frame, app: &mut App<E>, area: Rect) {
  let theme = app.theme();
  let Some(video) = app.session.current().cloned() else { return };

  let outer = rounded_block(" Now Playing ", theme, true).padding(Padding::horizontal(1));
  let inner = outer.inner(area);
  frame.render_widget(outer, area);

  let description_height = if app.description_expanded {
    Constraint::Min(4)
  } else {
    Constraint::Length(COLLAPSED_DESCRIPTION_LINES as u16 + 2)
  };
  let [info_area, description_area, recs_area] =
    Layout::vertical([Constraint::Length(4), description_height, Constraint::Min(3)]).areas(inner);

  // --- Title, channel, playback ---
  let inner_w = info_area.width as usize;
  let mut lines = vec![
    Line::from(Span::styled(truncate_str(&video.title, inner_w), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD))),
    Line::from(vec![
      Span::styled(truncate_str(&video.channel, inner_w.saturating_sub(12)), Style::default().fg(theme.muted)),
      Span::styled(
        video.published.map(|d| format!("  {}", d.format("%Y-%m-%d"))).unwrap_or_default(),
        Style::default().fg(theme.muted),
      ),
    ]),
  ];
  if app.surfaces.is_pending(Surface::Modal) {
    lines.push(Line::from(Span::styled("… Starting player", Style::default().fg(theme.status))));
  } else if let Some((state, time)) = app.playback_status() {
    let (icon, label) = state_label(state);
    lines.push(Line::from(Span::styled(format!("{} {}  {}", icon, label, format_time(time)), Style::default().fg(theme.status))));
  }
  frame.render_widget(Paragraph::new(lines), info_area);

  // --- Description ---
  let toggle = if app.description_expanded { " Show less ▲ " } else { " Show more ▼ " };
  let text = app.description.text();
  let shown: String = if app.description_expanded {
    text.to_string()
  } else {
    text.lines().take(COLLAPSED_DESCRIPTION_LINES).collect::<Vec<_>>().join("\n")
  };
  let description = Paragraph::new(shown)
    .style(Style::default().fg(theme.fg))
    .wrap(Wrap { trim: false })
    .block(rounded_block(" Description ", theme, false).title_bottom(Line::from(toggle).right_aligned()));
  frame.render_widget(description, description_area);

  // --- Recommendations ---
  let recs_w = recs_area.width.saturating_sub(4) as usize;
  let rows: Vec<Line<'static>> = app
    .recommendations()
    .iter()
    .map(|v| video_line(v, truncate_str(&v.channel, 18), recs_w, theme.fg, theme))
    .collect();
  let block = rounded_block(" Up next ", theme, false);
  render_video_list(frame, recs_area, theme, block, rows, &mut app.recs_state);
}

fn render_mini<E: PlayerEngine>(frame: &mut Frame, app: &App<E>, area: Rect) {
  let theme = app.theme();
  let Some(video) = app.session.current() else { return };
  let (icon, time) = match app.playback_status() {
    Some((state, time)) => (state_label(state).0, format_time(time)),
    None => ("·", String::new()),
  };
  let inner_w = area.width.saturating_sub(4) as usize;
  let right = format!("{}  {}", time, icon);
  let line = video_line(video, right, inner_w, theme.fg, theme);
  let block = rounded_block(" Mini player ", theme, false).padding(Padding::horizontal(1));
  frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_status<E: PlayerEngine>(frame: &mut Frame, app: &App<E>, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(info) = &app.info_message {
    (format!(" ℹ  {}", info), Style::default().fg(theme.muted))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input<E: PlayerEngine>(frame: &mut Frame, app: &mut App<E>, area: Rect) {
  let theme = app.theme();
  let focused = app.focus == Focus::Input && !app.modal_open();
  let border_color = if focused { theme.accent } else { theme.border };
  let input_block = Block::bordered()
    .title(" Search ")
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let width = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.input, app.cursor_position);
  app.input_scroll = follow_cursor(app.input_scroll, cursor_col, width);
  let visible = visible_window(&app.input, app.input_scroll, width);

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if focused {
    let cursor_x = area.x + 2 + (cursor_col - app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn footer_keys<E: PlayerEngine>(app: &App<E>) -> Vec<(&'static str, &'static str)> {
  if app.modal_open() {
    return vec![
      ("Space", "Pause"),
      ("n/p", "Next/Prev"),
      ("d", "Description"),
      ("a", "Queue"),
      ("Enter", "Play next"),
      ("Esc", "Minimize"),
      ("x", "Close"),
    ];
  }
  let mut k = match app.focus {
    Focus::Input => vec![("Enter", "Search"), ("Tab", "Queue")],
    Focus::Results => vec![("Enter", "Play"), ("a/r", "Queue/Unqueue"), ("j/k", "Navigate"), ("Tab", "Queue")],
    Focus::Queue => vec![("Enter", "Play"), ("d", "Remove"), ("c", "Clear"), ("Tab", "Results")],
  };
  if app.mini_open() {
    k.push(("m", "Expand"));
    k.push(("x", "Close"));
  } else if app.session.is_idle() && app.session.last_played().is_some() {
    k.push(("^o", "Resume"));
  }
  k.push(if app.focus == Focus::Input { ("Esc", "Clear") } else { ("Esc", "Back") });
  k
}

fn render_footer<E: PlayerEngine>(frame: &mut Frame, app: &App<E>, area: Rect) {
  let theme = app.theme();
  let keys = footer_keys(app);

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let label = format!("{} · {} queued ", theme.name, app.queue.len());
  let width = (label.chars().count() as u16).min(area.width);
  let label_area = Rect { x: area.right().saturating_sub(width), width, ..area };
  frame.render_widget(Line::from(label).style(Style::default().fg(theme.muted)), label_area);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truncate_str_adds_ellipsis() {
    assert_eq!(truncate_str("hello", 10), "hello");
    assert_eq!(truncate_str("hello world", 6), "hello…");
  }

  #[test]
  fn display_width_counts_wide_chars() {
    assert_eq!(display_width("日本語", 2), 4);
    assert_eq!(display_width("abc", 2), 2);
  }

  #[test]
  fn input_window_follows_cursor() {
    assert_eq!(follow_cursor(0, 3, 10), 0);
    assert_eq!(follow_cursor(0, 12, 10), 3);
    assert_eq!(follow_cursor(5, 2, 10), 2);
    assert_eq!(visible_window("abcdefghij", 3, 4), "defg");
    assert_eq!(visible_window("日本語です", 2, 4), "本語");
  }

  #[test]
  fn format_time_minutes_and_hours() {
    assert_eq!(format_time(0.0), "0:00");
    assert_eq!(format_time(83.7), "1:23");
    assert_eq!(format_time(3725.0), "1:02:05");
    assert_eq!(format_time(-4.0), "0:00");
  }
}
