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
  pub stripe_bg: Color,
  pub status: Color,
  pub queued: Color,
  pub error: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

/// Dark first: it's the default when no preference is stored.
pub static THEMES: [Theme; 2] = [
  Theme {
    name: "dark",
    bg: Color::Rgb(18, 18, 24),
    fg: Color::Rgb(222, 222, 230),
    accent: Color::Rgb(255, 64, 64),
    muted: Color::Rgb(120, 120, 135),
    border: Color::Rgb(70, 70, 85),
    highlight_fg: Color::Rgb(18, 18, 24),
    highlight_bg: Color::Rgb(255, 96, 96),
    stripe_bg: Color::Rgb(26, 26, 34),
    status: Color::Rgb(240, 190, 90),
    queued: Color::Rgb(120, 200, 140),
    error: Color::Rgb(255, 110, 110),
    key_fg: Color::Rgb(18, 18, 24),
    key_bg: Color::Rgb(150, 150, 165),
  },
  Theme {
    name: "light",
    bg: Color::Rgb(248, 248, 250),
    fg: Color::Rgb(30, 30, 36),
    accent: Color::Rgb(204, 0, 0),
    muted: Color::Rgb(110, 110, 120),
    border: Color::Rgb(200, 200, 208),
    highlight_fg: Color::Rgb(255, 255, 255),
    highlight_bg: Color::Rgb(204, 0, 0),
    stripe_bg: Color::Rgb(238, 238, 242),
    status: Color::Rgb(170, 110, 0),
    queued: Color::Rgb(30, 130, 60),
    error: Color::Rgb(190, 20, 20),
    key_fg: Color::Rgb(255, 255, 255),
    key_bg: Color::Rgb(90, 90, 100),
  },
];

/// Index of the theme called `name`, falling back to the first one.
pub fn index_of(name: Option<&str>) -> usize {
  name.and_then(|n| THEMES.iter().position(|t| t.name == n)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lookup_by_name() {
    assert_eq!(index_of(Some("light")), 1);
    assert_eq!(index_of(Some("solarized")), 0);
    assert_eq!(index_of(None), 0);
  }
}
