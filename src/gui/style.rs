use iced::{Background, Border, Color, Shadow, Theme};
use iced::widget::container::{StyleSheet, Appearance};

use crate::gui::threshold::Level;

pub const LOW_COLOR: Color = Color::from_rgb(0.18, 0.62, 0.27);
pub const MODERATE_COLOR: Color = Color::from_rgb(1.0, 0.72, 0.30);
pub const HIGH_COLOR: Color = Color::from_rgb(0.96, 0.49, 0.0);
pub const CRITICAL_COLOR: Color = Color::from_rgb(0.83, 0.18, 0.18);

pub fn level_color(level: Level) -> Color {
    match level {
        Level::Low => LOW_COLOR,
        Level::Moderate => MODERATE_COLOR,
        Level::High => HIGH_COLOR,
        Level::Critical => CRITICAL_COLOR,
    }
}

/// Rounded card behind the status line and the current value.
pub struct StatusCardStyleSheet;

impl StyleSheet for StatusCardStyleSheet {
    type Style = Theme;

    fn appearance(&self, _style: &Self::Style) -> Appearance {
        Appearance {
            text_color: None,
            background: Some(Background::Color(Color::from_rgb(0.95, 0.95, 0.95))),
            border: Border {
                color: Color::from_rgb(0.85, 0.85, 0.85),
                width: 1.0,
                radius: 8.0.into(),
            },
            shadow: Shadow::default(),
        }
    }
}
