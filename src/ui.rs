use chrono::Utc;
use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Flex, Layout, Rect},
  style::{Modifier, Style},
  text::{Line, Span},
  widgets::{Block, BorderType, Clear, Padding, Paragraph, Wrap},
};

use crate::app::{App, AppMode, LoadState};
use crate::card::Card;
use crate::catalog::{CategoryFilter, EmptyState};
use crate::constants::constants;
use crate::display::DisplayMode;
use crate::manifest::LoadError;
use crate::modal::ModalState;
use crate::preview::ThumbnailWidget;
use crate::theme::Theme;

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

/// A lone "All" tab carries no information.
fn shows_tabs(tabs: &[CategoryFilter]) -> bool {
  tabs.len() > 1
}

fn rounded(theme: &Theme) -> Block<'static> {
  Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border))
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();
  app.hits = Default::default();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, tabs_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  render_tabs(frame, app, tabs_area);
  render_main(frame, app, main_area);
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);

  if app.modal.is_open() {
    render_modal(frame, app);
  }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let left = Line::from(Span::styled(" ▶ vidgrid ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let right_text = match &app.loaded_from {
    Some((source, _)) => format!("{}  v{} ", source, env!("CARGO_PKG_VERSION")),
    None => format!("v{} ", env!("CARGO_PKG_VERSION")),
  };
  let width = right_text.chars().count() as u16;
  let right = Line::from(Span::styled(right_text, Style::default().fg(theme.muted)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(width), width: width.min(area.width), ..area };
  frame.render_widget(right, right_area);
}

fn render_tabs(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let tabs = app.view.category_tabs();
  if !shows_tabs(&tabs) {
    return;
  }
  let mut x = area.x + 1;
  let mut spans = vec![Span::raw(" ")];
  for tab in tabs {
    let label = format!(" {} ", tab.label());
    let width = label.chars().count() as u16;
    if x + width > area.x + area.width {
      break;
    }
    let style = if tab.same_tab(app.view.category()) {
      Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(theme.muted)
    };
    app.hits.tabs.push((tab, Rect { x, width, ..area }));
    spans.push(Span::styled(label, style));
    spans.push(Span::raw(" "));
    x += width + 1;
  }
  frame.render_widget(Line::from(spans), area);
}

fn render_main(frame: &mut Frame, app: &mut App, area: Rect) {
  if app.view.records().is_empty() {
    match &app.load_state {
      LoadState::Loading => render_placeholder(frame, app.theme(), area, "Loading videos…", None),
      LoadState::Failed(err) => render_load_error(frame, app.theme(), area, err),
      LoadState::Ready => render_placeholder(frame, app.theme(), area, "This catalog has no videos.", None),
    }
    return;
  }
  match app.view.empty_state() {
    Some(EmptyState::NoSearchResults) => render_placeholder(
      frame,
      app.theme(),
      area,
      "No videos found",
      Some(format!("Nothing matches '{}'. Try different search terms.", app.view.search())),
    ),
    Some(EmptyState::EmptyCategory) => render_placeholder(
      frame,
      app.theme(),
      area,
      "Nothing here",
      Some(format!("No videos in '{}'.", app.view.category().label())),
    ),
    Some(EmptyState::EmptyCatalog) => {
      render_placeholder(frame, app.theme(), area, "Nothing to show", Some("Every video is unavailable.".to_string()))
    }
    None => render_grid(frame, app, area),
  }
}

fn render_placeholder(frame: &mut Frame, theme: &Theme, area: Rect, title: &str, detail: Option<String>) {
  let mut text = vec![
    Line::from(""),
    Line::from(Span::styled(title.to_string(), Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
  ];
  if let Some(detail) = detail {
    text.push(Line::from(""));
    text.push(Line::from(Span::styled(detail, Style::default().fg(theme.muted))));
  }
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(rounded(theme));
  frame.render_widget(paragraph, area);
}

fn render_load_error(frame: &mut Frame, theme: &Theme, area: Rect, err: &LoadError) {
  let headline = match err {
    LoadError::NotFound { .. } => "Failed to load videos",
    LoadError::MalformedSchema { .. } => "The video manifest is malformed",
  };
  let text = vec![
    Line::from(""),
    Line::from(Span::styled(format!("⚠  {}", headline), Style::default().fg(theme.error).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled(err.to_string(), Style::default().fg(theme.muted))),
    Line::from(""),
    Line::from(vec![
      Span::styled(" r ", Style::default().fg(theme.key_fg).bg(theme.key_bg)),
      Span::styled("  Retry", Style::default().fg(theme.fg)),
    ]),
  ];
  let paragraph =
    Paragraph::new(text).alignment(Alignment::Center).wrap(Wrap { trim: true }).block(rounded(theme));
  frame.render_widget(paragraph, area);
}

fn render_grid(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let card_w = constants().card_width;
  let card_h = constants().card_height;
  let columns = (area.width / card_w).max(1) as usize;
  let rows_visible = (area.height / card_h).max(1) as usize;
  app.grid_columns = columns;

  // Keep the selected row on screen.
  let selected_row = app.selected / columns;
  if selected_row < app.grid_scroll {
    app.grid_scroll = selected_row;
  } else if selected_row >= app.grid_scroll + rows_visible {
    app.grid_scroll = selected_row + 1 - rows_visible;
  }

  let now = Utc::now();
  let first = app.grid_scroll * columns;
  let last = (first + rows_visible * columns).min(app.view.visible_len());
  // Spread leftover width evenly so the grid fills the row.
  let actual_w = area.width / columns as u16;

  for index in first..last {
    let Some(record) = app.view.visible_record(index) else { break };
    let card = Card::from_record(record, now);
    let slot = index - first;
    let cell = Rect {
      x: area.x + (slot % columns) as u16 * actual_w,
      y: area.y + (slot / columns) as u16 * card_h,
      width: actual_w,
      height: card_h.min(area.height),
    };
    render_card(frame, theme, &card, cell, index == app.selected);
    app.hits.cards.push((index, cell));
  }
}

fn render_card(frame: &mut Frame, theme: &Theme, card: &Card, area: Rect, selected: bool) {
  let inner_w = area.width.saturating_sub(4) as usize;
  let (border, title_style) = if selected {
    (Style::default().fg(theme.accent), Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
  } else {
    (Style::default().fg(theme.border), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD))
  };
  let block = Block::bordered()
    .border_type(if selected { BorderType::Thick } else { BorderType::Rounded })
    .border_style(border)
    .style(Style::default().bg(theme.card_bg))
    .padding(Padding::horizontal(1));

  let mut lines = vec![
    Line::from(Span::styled(truncate_str(&card.title, inner_w), title_style)),
    Line::from(vec![
      Span::styled("⏱ ", Style::default().fg(theme.muted)),
      Span::styled(card.duration.clone(), Style::default().fg(theme.fg)),
      Span::styled("   👁 ", Style::default().fg(theme.muted)),
      Span::styled(card.views.clone(), Style::default().fg(theme.fg)),
    ]),
    Line::from(vec![
      Span::styled("📅 ", Style::default().fg(theme.muted)),
      Span::styled(card.age.clone(), Style::default().fg(theme.fg)),
    ]),
  ];
  if let Some(category) = &card.category {
    lines.push(Line::from(Span::styled(truncate_str(category, inner_w), Style::default().fg(theme.muted))));
  }
  frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_modal(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();
  let ModalState::Open { playback_url, source } = app.modal.state().clone() else { return };

  let [vertical] = Layout::vertical([Constraint::Percentage(70)]).flex(Flex::Center).areas(frame.area());
  let [area] = Layout::horizontal([Constraint::Percentage(80)]).flex(Flex::Center).areas(vertical);
  app.hits.modal = Some(area);

  frame.render_widget(Clear, area);
  let title = Line::from(vec![
    Span::styled(" Now Playing ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
    Span::styled(format!("[{}] ", app.display_mode.label()), Style::default().fg(theme.muted)),
  ]);
  let block = rounded(theme)
    .title(title)
    .title_bottom(Line::from(Span::styled(" Esc close ", Style::default().fg(theme.muted))).right_aligned())
    .style(Style::default().bg(theme.bg));
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let show_preview = app.display_mode != DisplayMode::Off;
  let [thumb_area, info_area] = if show_preview {
    Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(inner)
  } else {
    Layout::horizontal([Constraint::Length(0), Constraint::Fill(1)]).areas(inner)
  };

  if show_preview {
    let thumb_area = Rect { y: thumb_area.y + 1, height: thumb_area.height.saturating_sub(2), ..thumb_area };
    match app.thumbnail.as_mut() {
      Some(thumb) if source.as_ref().is_some_and(|r| r.key() == thumb.key) => {
        let image = thumb.fitted(thumb_area, app.display_mode);
        frame.render_widget(ThumbnailWidget { image, mode: app.display_mode }, thumb_area);
      }
      _ => {
        let waiting = Paragraph::new(Span::styled("loading preview…", Style::default().fg(theme.muted)))
          .alignment(Alignment::Center);
        frame.render_widget(waiting, thumb_area);
      }
    }
  }

  let inner_w = info_area.width.saturating_sub(2) as usize;
  let mut lines = vec![Line::from("")];
  if let Some(record) = &source {
    let card = Card::from_record(record, Utc::now());
    lines.push(Line::from(Span::styled(
      truncate_str(&card.title, inner_w),
      Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));
    for (label, value) in [("Duration  ", &card.duration), ("Views     ", &card.views), ("Uploaded  ", &card.age)] {
      lines.push(Line::from(vec![
        Span::styled(label, Style::default().fg(theme.muted)),
        Span::styled(value.clone(), Style::default().fg(theme.fg)),
      ]));
    }
    if let Some(category) = &card.category {
      lines.push(Line::from(vec![
        Span::styled("Category  ", Style::default().fg(theme.muted)),
        Span::styled(category.clone(), Style::default().fg(theme.fg)),
      ]));
    }
    if !show_preview {
      lines.push(Line::from(vec![
        Span::styled("Thumbnail ", Style::default().fg(theme.muted)),
        Span::styled(truncate_str(&card.thumbnail_url, inner_w.saturating_sub(10)), Style::default().fg(theme.fg)),
      ]));
    }
    lines.push(Line::from(""));
  }
  lines.push(Line::from(Span::styled(
    truncate_str(&playback_url, inner_w),
    Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED),
  )));
  let player = app.modal.frame();
  let state = if !player.is_playing() {
    "■ Stopped"
  } else if player.paused {
    "⏸ Paused"
  } else {
    "▶ Playing"
  };
  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled(state, Style::default().fg(theme.status))));
  frame.render_widget(Paragraph::new(lines).block(Block::default().padding(Padding::horizontal(1))), info_area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(status) = app.modal.frame().last_mpv_status().filter(|_| app.modal.is_open()) {
    (format!(" ♪ {}", status), Style::default().fg(theme.status))
  } else if let Some(info) = &app.info_message {
    let hidden = app.view.hidden_count();
    let suffix = if hidden > 0 { format!(", {} unavailable hidden", hidden) } else { String::new() };
    (format!(" ℹ {}{}", info, suffix), Style::default().fg(theme.muted))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let focused = app.mode == AppMode::Search && !app.modal.is_open();
  let border_color = if focused { theme.accent } else { theme.border };
  let count = format!(" {}/{} ", app.view.visible_len(), app.view.records().len());
  let input_block = Block::bordered()
    .title(" Search videos ")
    .title_top(Line::from(count).right_aligned())
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.search_input, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .search_input
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.input_scroll)
    .take_while(|(start, _, _)| *start < app.input_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if focused {
    let cursor_x = area.x + 2 + (cursor_col - app.input_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let has_tabs = shows_tabs(&app.view.category_tabs());
  let keys: Vec<(&str, &str)> = if app.modal.is_open() {
    let pause_label = if app.modal.frame().paused { "Resume" } else { "Pause" };
    vec![("Esc", "Close"), ("Space", pause_label), ("^o", "Browser"), ("^t", "Theme")]
  } else {
    match app.mode {
      AppMode::Search => vec![("Enter", "Browse"), ("Esc", "Clear"), ("^t", "Theme")],
      AppMode::Browse => {
        let mut k = vec![("Enter", "Play"), ("hjkl", "Move"), ("/", "Search")];
        if has_tabs {
          k.push(("Tab", "Category"));
        }
        k.push(("r", "Refresh"));
        k.push(("^t", "Theme"));
        k.push(("q", "Quit"));
        k
      }
    }
  };

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

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::app::AppOptions;
  use crate::config::Config;
  use crate::manifest::parse_manifest;
  use ratatui::{Terminal, backend::TestBackend};

  fn app_with(body: &str) -> App {
    let options =
      AppOptions { sources: Vec::new(), probe_availability: false, audio_only: true, display_mode: DisplayMode::Off };
    let mut app = App::new(options, Config::default(), reqwest::Client::new());
    app.view.replace(parse_manifest(body, "test").unwrap().records);
    app.load_state = LoadState::Ready;
    app
  }

  fn screen(app: &mut App) -> String {
    let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
    terminal.draw(|f| ui(f, app)).unwrap();
    let buffer = terminal.backend().buffer().clone();
    let mut out = String::new();
    for y in 0..buffer.area.height {
      for x in 0..buffer.area.width {
        out.push_str(buffer[(x, y)].symbol());
      }
      out.push('\n');
    }
    out
  }

  #[test]
  fn truncate_appends_ellipsis() {
    assert_eq!(truncate_str("hello", 10), "hello");
    assert_eq!(truncate_str("hello world", 6), "hello…");
  }

  #[test]
  fn grid_draws_one_card_per_record() {
    let mut app = app_with(r#"{"videos":[{"id":"dQw4w9WgXcQ","title":"Test Video","views":100}]}"#);
    let text = screen(&mut app);
    assert!(text.contains("Test Video"));
    assert_eq!(app.hits.cards.len(), 1);
    assert!(app.hits.tabs.is_empty());
  }

  #[test]
  fn no_results_message_when_search_matches_nothing() {
    let mut app = app_with(r#"{"videos":[{"id":"dQw4w9WgXcQ","title":"Test Video"}]}"#);
    app.search_input = "zzz".to_string();
    app.search_changed();
    let text = screen(&mut app);
    assert!(text.contains("No videos found"));
    assert!(app.hits.cards.is_empty());
  }

  #[test]
  fn load_failure_shows_retry() {
    let options =
      AppOptions { sources: Vec::new(), probe_availability: false, audio_only: true, display_mode: DisplayMode::Off };
    let mut app = App::new(options, Config::default(), reqwest::Client::new());
    app.load_state = LoadState::Failed(LoadError::NotFound { attempts: Vec::new() });
    let text = screen(&mut app);
    assert!(text.contains("Failed to load videos"));
    assert!(text.contains("Retry"));
  }

  #[test]
  fn grouped_catalog_draws_tabs() {
    let mut app = app_with(
      r#"{"playlists":[{"name":"Music","videos":[{"id":"mmmmmmmmmm1","title":"Song"}]},
        {"name":"Gaming","videos":[{"id":"gggggggggg1","title":"Speedrun"}]}]}"#,
    );
    let text = screen(&mut app);
    assert!(text.contains("Music"));
    assert!(shows_tabs(&app.view.category_tabs()));
    assert_eq!(app.hits.tabs.len(), 3);
  }
}
