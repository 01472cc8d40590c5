//! Theme color definitions for the dashboard chrome
//!
//! Field colors come from the fieldspec; the theme only covers the header,
//! footer, legend decorations and gutter.

use crate::config::Theme;
use crate::fields::FieldColor;
use crossterm::style::Color;

/// Complete color palette for the chrome
#[derive(Debug, Clone, Copy)]
pub struct ThemeColors {
    /// Primary foreground text
    pub fg: Color,
    /// Dimmed/secondary text (help line, gutter counter)
    pub dim: Color,
    /// Accent color (title, autorange label)
    pub accent: Color,
    /// Shortcut keys in the legend
    pub key: Color,
    /// Disabled marker
    pub off: Color,
    /// Status line
    pub status: Color,
}

impl ThemeColors {
    /// Create a color palette for the given theme variant
    pub fn from_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self::dark(),
            Theme::Light => Self::light(),
        }
    }

    pub fn dark() -> Self {
        Self {
            fg: Color::Rgb { r: 200, g: 200, b: 210 },
            dim: Color::Rgb { r: 90, g: 90, b: 110 },
            accent: Color::Rgb { r: 80, g: 200, b: 220 },
            key: Color::Rgb { r: 240, g: 180, b: 80 },
            off: Color::Rgb { r: 240, g: 90, b: 100 },
            status: Color::Rgb { r: 80, g: 200, b: 120 },
        }
    }

    /// High contrast for bright terminals
    pub fn light() -> Self {
        Self {
            fg: Color::Rgb { r: 30, g: 30, b: 40 },
            dim: Color::Rgb { r: 130, g: 130, b: 150 },
            accent: Color::Rgb { r: 0, g: 130, b: 160 },
            key: Color::Rgb { r: 180, g: 120, b: 0 },
            off: Color::Rgb { r: 200, g: 50, b: 60 },
            status: Color::Rgb { r: 30, g: 150, b: 70 },
        }
    }
}

impl From<FieldColor> for Color {
    fn from(color: FieldColor) -> Self {
        match color {
            FieldColor::Palette(index) => Color::AnsiValue(index),
            FieldColor::Rgb(r, g, b) => Color::Rgb { r, g, b },
        }
    }
}
