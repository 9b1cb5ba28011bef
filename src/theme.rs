use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub card_bg: Color,
  pub status: Color,
  pub error: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "ember",
    bg: Color::Rgb(17, 24, 39),
    fg: Color::Rgb(229, 231, 235),
    accent: Color::Rgb(255, 165, 0),
    muted: Color::Rgb(156, 163, 175),
    border: Color::Rgb(55, 65, 81),
    highlight_fg: Color::Rgb(17, 24, 39),
    highlight_bg: Color::Rgb(255, 165, 0),
    card_bg: Color::Rgb(31, 41, 55),
    status: Color::Rgb(253, 224, 71),
    error: Color::Rgb(239, 68, 68),
    key_fg: Color::Rgb(17, 24, 39),
    key_bg: Color::Rgb(156, 163, 175),
  },
  Theme {
    name: "paper",
    bg: Color::Rgb(250, 248, 242),
    fg: Color::Rgb(40, 40, 40),
    accent: Color::Rgb(204, 36, 29),
    muted: Color::Rgb(124, 111, 100),
    border: Color::Rgb(189, 174, 147),
    highlight_fg: Color::Rgb(250, 248, 242),
    highlight_bg: Color::Rgb(204, 36, 29),
    card_bg: Color::Rgb(242, 236, 222),
    status: Color::Rgb(181, 118, 20),
    error: Color::Rgb(157, 0, 6),
    key_fg: Color::Rgb(250, 248, 242),
    key_bg: Color::Rgb(124, 111, 100),
  },
  Theme {
    name: "mono",
    bg: Color::Reset,
    fg: Color::White,
    accent: Color::Cyan,
    muted: Color::DarkGray,
    border: Color::Gray,
    highlight_fg: Color::Black,
    highlight_bg: Color::Cyan,
    card_bg: Color::Reset,
    status: Color::Yellow,
    error: Color::Red,
    key_fg: Color::Black,
    key_bg: Color::Gray,
  },
];

/// Index of the theme called `name`, falling back to the first one.
pub fn theme_index(name: Option<&str>) -> usize {
  name.and_then(|n| THEMES.iter().position(|t| t.name == n)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_theme_falls_back_to_first() {
    assert_eq!(theme_index(Some("paper")), 1);
    assert_eq!(theme_index(Some("nope")), 0);
    assert_eq!(theme_index(None), 0);
  }
}
