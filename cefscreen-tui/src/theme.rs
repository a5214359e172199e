//! Dark terminal theme for the screen dashboard.
//!
//! Grid backgrounds come from the runner's color scales; everything else
//! (borders, focus, log levels) uses the palette below.

use ratatui::style::{Color, Modifier, Style};

use cefscreen_runner::dashboard::LogLevel;
use cefscreen_runner::format::{Rgb, TextColor};

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    /// Focus, highlights, panel titles
    pub accent: Color,
    /// Warnings in the activity log
    pub warning: Color,
    /// Errors in the activity log
    pub negative: Color,
    /// Hints and secondary text
    pub muted: Color,
    pub text_primary: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(0, 200, 255),
            warning: Color::Rgb(255, 140, 0),
            negative: Color::Rgb(255, 60, 90),
            muted: Color::Rgb(120, 130, 150),
            text_primary: Color::White,
        }
    }
}

impl Theme {
    pub fn log_color(&self, level: LogLevel) -> Color {
        match level {
            LogLevel::Info => self.text_primary,
            LogLevel::Warning => self.warning,
            LogLevel::Error => self.negative,
        }
    }
}

pub fn accent() -> Style {
    Style::default().fg(Theme::default().accent)
}

pub fn accent_bold() -> Style {
    accent().add_modifier(Modifier::BOLD)
}

pub fn muted() -> Style {
    Style::default().fg(Theme::default().muted)
}

pub fn warning() -> Style {
    Style::default().fg(Theme::default().warning)
}

pub fn log_level(level: LogLevel) -> Style {
    Style::default().fg(Theme::default().log_color(level))
}

pub fn panel_border(focused: bool) -> Style {
    if focused {
        accent()
    } else {
        muted()
    }
}

pub fn panel_title(focused: bool) -> Style {
    if focused {
        accent_bold()
    } else {
        muted()
    }
}

/// Highlight for the focused control.
pub fn focused_control() -> Style {
    accent().add_modifier(Modifier::REVERSED)
}

pub fn rgb(color: Rgb) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

/// Style of a grid cell: scale background plus the column's text color.
pub fn grid_cell(background: Option<Rgb>, text: TextColor) -> Style {
    let mut style = Style::default();
    if let Some(bg) = background {
        style = style.bg(rgb(bg));
    }
    match text {
        TextColor::Black => style.fg(Color::Black),
        TextColor::White => style.fg(Color::White),
        // Scaled cells are pale to mid-tone; keep text readable on them.
        TextColor::Default if background.is_some() => style.fg(Color::Black),
        TextColor::Default => style,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_maps_channels() {
        assert_eq!(rgb(Rgb(1, 2, 3)), Color::Rgb(1, 2, 3));
    }

    #[test]
    fn errors_and_warnings_stand_out() {
        let theme = Theme::default();
        assert_eq!(theme.log_color(LogLevel::Error), theme.negative);
        assert_eq!(theme.log_color(LogLevel::Warning), theme.warning);
        assert_ne!(theme.log_color(LogLevel::Info), theme.warning);
    }

    #[test]
    fn scaled_cells_get_dark_text() {
        let style = grid_cell(Some(Rgb(255, 255, 191)), TextColor::Default);
        assert_eq!(style.fg, Some(Color::Black));
        assert_eq!(style.bg, Some(Color::Rgb(255, 255, 191)));
        assert_eq!(grid_cell(None, TextColor::Default).fg, None);
    }
}
