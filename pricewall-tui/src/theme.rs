//! Parrot/neon palette and the styles built from it.
//!
//! - **Accent**: electric cyan (focus, headers)
//! - **Positive / Negative**: neon green / hot pink (price moves)
//! - **Warning**: neon orange (stale data, retries)
//! - **Neutral**: cool purple (subheaders)
//! - **Muted**: steel blue (secondary text)

use ratatui::style::{Color, Modifier, Style};

pub const ACCENT: Color = Color::Rgb(0, 255, 255);
pub const POSITIVE: Color = Color::Rgb(0, 255, 128);
pub const NEGATIVE: Color = Color::Rgb(255, 20, 147);
pub const WARNING: Color = Color::Rgb(255, 140, 0);
pub const NEUTRAL: Color = Color::Rgb(147, 112, 219);
pub const MUTED: Color = Color::Rgb(100, 149, 237);
pub const TEXT: Color = Color::White;
pub const TEXT_SECONDARY: Color = Color::Rgb(170, 170, 170);

pub fn accent() -> Style {
    Style::default().fg(ACCENT)
}

pub fn accent_bold() -> Style {
    accent().add_modifier(Modifier::BOLD)
}

pub fn positive() -> Style {
    Style::default().fg(POSITIVE)
}

pub fn negative() -> Style {
    Style::default().fg(NEGATIVE)
}

pub fn warning() -> Style {
    Style::default().fg(WARNING)
}

pub fn neutral() -> Style {
    Style::default().fg(NEUTRAL)
}

pub fn muted() -> Style {
    Style::default().fg(MUTED)
}

pub fn text() -> Style {
    Style::default().fg(TEXT)
}

pub fn text_secondary() -> Style {
    Style::default().fg(TEXT_SECONDARY)
}

pub fn panel_border(active: bool) -> Style {
    if active { accent() } else { muted() }
}

pub fn panel_title(active: bool) -> Style {
    if active { accent_bold() } else { muted() }
}

/// Color for a percentage change; flat and unknown read as secondary text.
pub fn change(pct: Option<f64>) -> Style {
    match pct {
        Some(p) if p > 0.0 => positive(),
        Some(p) if p < 0.0 => negative(),
        _ => text_secondary(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_colors() {
        assert_eq!(change(Some(1.5)), positive());
        assert_eq!(change(Some(-0.1)), negative());
        assert_eq!(change(Some(0.0)), text_secondary());
        assert_eq!(change(None), text_secondary());
    }

    #[test]
    fn active_panel_uses_accent() {
        assert_eq!(panel_border(true), accent());
        assert_eq!(panel_border(false), muted());
    }
}
