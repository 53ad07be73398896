use iced::Color;

use crate::drawing::Tone;

// Background colors
pub const BG_DARK: Color = Color::from_rgb(0.04, 0.04, 0.06);
pub const BG_CARD: Color = Color::from_rgb(0.09, 0.11, 0.15);

// Stroke/border colors
pub const STROKE_DIM: Color = Color::from_rgb(0.2, 0.22, 0.28);

// Accent colors
pub const ACCENT_BLUE: Color = Color::from_rgb(0.35, 0.65, 0.95);
pub const ACCENT_CYAN: Color = Color::from_rgb(0.2, 0.9, 0.9);
pub const ACCENT_GREEN: Color = Color::from_rgb(0.2, 0.85, 0.5);
pub const ACCENT_ORANGE: Color = Color::from_rgb(1.0, 0.6, 0.2);
pub const ACCENT_RED: Color = Color::from_rgb(1.0, 0.35, 0.35);

// Text colors
pub const TEXT_BRIGHT: Color = Color::from_rgb(0.96, 0.97, 0.99);
pub const TEXT_MUTED: Color = Color::from_rgb(0.6, 0.63, 0.7);

// Overlay colors
pub const TOOLTIP_BG: Color = Color::from_rgba(0.09, 0.11, 0.15, 0.95);
pub const BACKDROP: Color = Color::from_rgba(0.0, 0.0, 0.0, 0.6);

/// Palette color of a drawing tone.
pub fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Good => ACCENT_GREEN,
        Tone::Bad => ACCENT_RED,
        Tone::Warning => ACCENT_ORANGE,
        Tone::Track => STROKE_DIM,
        Tone::Text => TEXT_BRIGHT,
        Tone::Muted => TEXT_MUTED,
        Tone::Accent => ACCENT_BLUE,
        Tone::Background => BG_CARD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tones_match_accents() {
        assert_eq!(tone_color(Tone::Good), ACCENT_GREEN);
        assert_eq!(tone_color(Tone::Bad), ACCENT_RED);
        assert_eq!(tone_color(Tone::Warning), ACCENT_ORANGE);
    }
}
