use anyhow::Result;
use ratatui::crossterm::event::{self, KeyCode, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Position, Rect};

use crate::app::{App, AppMode, LoadState};

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
  area.contains(Position { x: column, y: row })
}

// --- Event Handling ---

pub async fn handle_key_event(app: &mut App, key: event::KeyEvent) -> Result<()> {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return Ok(());
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('t') {
    app.next_theme();
    return Ok(());
  }

  if app.modal.is_open() {
    handle_modal_key(app, key).await;
    return Ok(());
  }

  match app.mode {
    AppMode::Search => handle_search_key(app, key),
    AppMode::Browse => handle_browse_key(app, key).await,
  }
  Ok(())
}

async fn handle_modal_key(app: &mut App, key: event::KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('o') {
    app.open_in_browser();
    return;
  }
  match key.code {
    KeyCode::Esc | KeyCode::Char('q') => app.close_modal().await,
    KeyCode::Char(' ') => app.toggle_pause().await,
    _ => {}
  }
}

fn handle_search_key(app: &mut App, key: event::KeyEvent) {
  app.clear_error();
  match key.code {
    KeyCode::Enter | KeyCode::Down => {
      app.mode = AppMode::Browse;
    }
    KeyCode::Esc => {
      app.clear_search();
      app.mode = AppMode::Browse;
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.search_input, app.cursor_position);
      app.search_input.insert(byte_idx, c);
      app.cursor_position += 1;
      app.search_changed();
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.search_input, app.cursor_position);
        app.search_input.remove(byte_idx);
        app.search_changed();
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.search_input.chars().count() {
        let byte_idx = char_to_byte_index(&app.search_input, app.cursor_position);
        app.search_input.remove(byte_idx);
        app.search_changed();
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.search_input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.search_input.chars().count();
    }
    _ => {}
  }
}

async fn handle_browse_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => app.open_selected().await,
    KeyCode::Char('/') => app.mode = AppMode::Search,
    KeyCode::Char('r') => app.trigger_load(),
    KeyCode::Tab => app.cycle_category(1),
    KeyCode::BackTab => app.cycle_category(-1),
    KeyCode::Right | KeyCode::Char('l') => app.move_selection(1, 0),
    KeyCode::Left | KeyCode::Char('h') => app.move_selection(-1, 0),
    KeyCode::Down | KeyCode::Char('j') => app.move_selection(0, 1),
    KeyCode::Up | KeyCode::Char('k') => app.move_selection(0, -1),
    KeyCode::PageDown => app.move_selection(0, 3),
    KeyCode::PageUp => app.move_selection(0, -3),
    KeyCode::Home | KeyCode::Char('g') => app.selected = 0,
    KeyCode::End | KeyCode::Char('G') => app.move_selection(isize::MAX / 2, 0),
    KeyCode::Esc => {
      if !app.search_input.is_empty() {
        app.clear_search();
      } else {
        app.should_quit = true;
      }
    }
    KeyCode::Char('q') => app.should_quit = true,
    _ => {}
  }
}

pub async fn handle_mouse_event(app: &mut App, mouse: MouseEvent) -> Result<()> {
  let (column, row) = (mouse.column, mouse.row);
  match mouse.kind {
    MouseEventKind::Down(MouseButton::Left) => {
      if app.modal.is_open() {
        // A click on the backdrop closes; clicks inside the content do nothing.
        if !app.hits.modal.is_some_and(|area| contains(area, column, row)) {
          app.close_modal().await;
        }
        return Ok(());
      }
      if matches!(app.load_state, LoadState::Failed(_)) {
        app.trigger_load();
        return Ok(());
      }
      let tab = app.hits.tabs.iter().find(|(_, area)| contains(*area, column, row)).map(|(t, _)| t.clone());
      if let Some(tab) = tab {
        app.set_category(tab);
        return Ok(());
      }
      let card = app.hits.cards.iter().find(|(_, area)| contains(*area, column, row)).map(|(i, _)| *i);
      if let Some(index) = card {
        app.mode = AppMode::Browse;
        app.open_visible(index).await;
      }
    }
    MouseEventKind::ScrollDown if !app.modal.is_open() => app.move_selection(0, 1),
    MouseEventKind::ScrollUp if !app.modal.is_open() => app.move_selection(0, -1),
    _ => {}
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::app::AppOptions;
  use crate::config::Config;
  use crate::display::DisplayMode;
  use crate::manifest::parse_manifest;
  use crate::modal::{ModalState, PlaybackModal, PlayerFrame};
  use crate::player::MpvFrame;
  use ratatui::crossterm::event::{KeyEvent, KeyEventKind, KeyEventState};

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("hello", 0), 0);
    assert_eq!(char_to_byte_index("hello", 3), 3);
    assert_eq!(char_to_byte_index("hello", 5), 5); // past end
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "aé日"; // a=1 byte, é=2 bytes, 日=3 bytes
    assert_eq!(char_to_byte_index(s, 1), 1);
    assert_eq!(char_to_byte_index(s, 2), 3);
    assert_eq!(char_to_byte_index(s, 3), 6);
  }

  // --- key handling ---

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent { code, modifiers: KeyModifiers::NONE, kind: KeyEventKind::Press, state: KeyEventState::NONE }
  }

  fn app_with(body: &str) -> App {
    let options =
      AppOptions { sources: Vec::new(), probe_availability: false, audio_only: true, display_mode: DisplayMode::Off };
    let mut app = App::new(options, Config::default(), reqwest::Client::new());
    app.view.replace(parse_manifest(body, "test").unwrap().records);
    app
  }

  const BODY: &str = r#"{"videos":[
    {"id":"aaaaaaaaaa1","title":"Guitar Solo"},
    {"id":"aaaaaaaaaa2","title":"Piano Cover"},
    {"id":"aaaaaaaaaa3","title":"Drum Lesson"}
  ]}"#;

  #[tokio::test]
  async fn typing_filters_as_you_go() {
    let mut app = app_with(BODY);
    handle_key_event(&mut app, key(KeyCode::Char('/'))).await.unwrap();
    assert_eq!(app.mode, AppMode::Search);
    for c in "PIANO".chars() {
      handle_key_event(&mut app, key(KeyCode::Char(c))).await.unwrap();
    }
    assert_eq!(app.view.visible_len(), 1);
    handle_key_event(&mut app, key(KeyCode::Backspace)).await.unwrap();
    assert_eq!(app.search_input, "PIAN");
    handle_key_event(&mut app, key(KeyCode::Esc)).await.unwrap();
    assert_eq!(app.mode, AppMode::Browse);
    assert_eq!(app.view.visible_len(), 3);
  }

  #[tokio::test]
  async fn esc_in_browse_clears_search_before_quitting() {
    let mut app = app_with(BODY);
    app.search_input = "drum".to_string();
    app.search_changed();
    handle_key_event(&mut app, key(KeyCode::Esc)).await.unwrap();
    assert!(app.search_input.is_empty());
    assert!(!app.should_quit);
    handle_key_event(&mut app, key(KeyCode::Esc)).await.unwrap();
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn backdrop_click_is_ignored_when_modal_closed() {
    let mut app = app_with(BODY);
    handle_mouse_event(&mut app, left_click(0, 0)).await.unwrap();
    assert!(!app.modal.is_open());
  }

  fn left_click(column: u16, row: u16) -> MouseEvent {
    MouseEvent { kind: MouseEventKind::Down(MouseButton::Left), column, row, modifiers: KeyModifiers::NONE }
  }

  /// An app whose player is `true`, which accepts mpv's arguments and exits.
  fn app_with_stub_player() -> App {
    let mut app = app_with(BODY);
    app.modal = PlaybackModal::new(MpvFrame::with_program("true", true));
    app
  }

  #[tokio::test]
  async fn escape_closes_open_modal_and_releases_player() {
    let mut app = app_with_stub_player();
    handle_key_event(&mut app, key(KeyCode::Enter)).await.unwrap();
    assert!(app.modal.is_open());
    assert!(app.modal.frame().source().is_some_and(|s| s.contains("aaaaaaaaaa1")));

    handle_key_event(&mut app, key(KeyCode::Esc)).await.unwrap();
    assert_eq!(app.modal.state(), &ModalState::Closed);
    assert_eq!(app.modal.frame().source(), None);
    assert!(!app.should_quit);
  }

  #[tokio::test]
  async fn backdrop_click_closes_but_content_click_does_not() {
    let mut app = app_with_stub_player();
    app.selected = 1;
    handle_key_event(&mut app, key(KeyCode::Enter)).await.unwrap();
    assert!(app.modal.current().is_some_and(|r| r.title == "Piano Cover"));
    app.hits.modal = Some(Rect::new(10, 5, 40, 12));

    handle_mouse_event(&mut app, left_click(20, 8)).await.unwrap();
    assert!(app.modal.is_open());

    handle_mouse_event(&mut app, left_click(2, 1)).await.unwrap();
    assert_eq!(app.modal.state(), &ModalState::Closed);
    assert_eq!(app.modal.frame().source(), None);
  }

  #[tokio::test]
  async fn clicking_a_card_opens_it() {
    let mut app = app_with_stub_player();
    app.hits.cards = vec![(0, Rect::new(0, 2, 34, 6)), (2, Rect::new(34, 2, 34, 6))];
    handle_mouse_event(&mut app, left_click(40, 4)).await.unwrap();
    assert_eq!(app.selected, 2);
    assert!(app.modal.current().is_some_and(|r| r.title == "Drum Lesson"));
    app.close_modal().await;
  }

  #[test]
  fn hit_testing_uses_inclusive_origin() {
    let area = Rect::new(2, 2, 4, 2);
    assert!(contains(area, 2, 2));
    assert!(contains(area, 5, 3));
    assert!(!contains(area, 6, 3));
  }
}
