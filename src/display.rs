use clap::ValueEnum;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliDisplayMode {
  Auto,
  Direct,
  Ascii,
  Off,
}

/// How thumbnails are drawn in the modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
  /// No preview; nothing is fetched.
  Off,
  Ascii,
  /// True-color half-block cells, two pixels per cell.
  Direct,
}

impl DisplayMode {
  pub fn label(self) -> &'static str {
    match self {
      DisplayMode::Off => "off",
      DisplayMode::Ascii => "ascii",
      DisplayMode::Direct => "half-block",
    }
  }
}

/// Pick half-block rendering on true-color terminals, ASCII elsewhere.
pub fn detect_display_mode() -> DisplayMode {
  let var = |name: &str| std::env::var(name).unwrap_or_default();
  mode_for_terminal(&var("TERM"), &var("COLORTERM"))
}

/// `TERM=dumb` turns previews off; `COLORTERM` of `truecolor`/`24bit`
/// selects half-blocks.
fn mode_for_terminal(term: &str, colorterm: &str) -> DisplayMode {
  if term == "dumb" {
    DisplayMode::Off
  } else if colorterm.eq_ignore_ascii_case("truecolor") || colorterm.eq_ignore_ascii_case("24bit") {
    DisplayMode::Direct
  } else {
    DisplayMode::Ascii
  }
}

pub fn resolve_display_mode(cli: CliDisplayMode) -> DisplayMode {
  match cli {
    CliDisplayMode::Auto => detect_display_mode(),
    CliDisplayMode::Direct => DisplayMode::Direct,
    CliDisplayMode::Ascii => DisplayMode::Ascii,
    CliDisplayMode::Off => DisplayMode::Off,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn explicit_modes_skip_detection() {
    assert_eq!(resolve_display_mode(CliDisplayMode::Direct), DisplayMode::Direct);
    assert_eq!(resolve_display_mode(CliDisplayMode::Ascii), DisplayMode::Ascii);
    assert_eq!(resolve_display_mode(CliDisplayMode::Off), DisplayMode::Off);
  }

  #[test]
  fn terminal_capabilities_pick_mode() {
    assert_eq!(mode_for_terminal("dumb", "truecolor"), DisplayMode::Off);
    assert_eq!(mode_for_terminal("xterm-256color", "TrueColor"), DisplayMode::Direct);
    assert_eq!(mode_for_terminal("xterm-256color", "24bit"), DisplayMode::Direct);
    assert_eq!(mode_for_terminal("xterm", ""), DisplayMode::Ascii);
  }
}
