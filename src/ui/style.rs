use crossterm::style::Color;
use opencode_limits_core::usage::UsageWindow;

/// Severity bucket for a usage percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageLevel {
    /// Up to 80%
    Normal,
    /// Above 80%
    Warning,
    /// 99% and up
    Critical,
}

impl UsageLevel {
    /// Bucket a percentage (callers pass the clamped value)
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 99.0 {
            UsageLevel::Critical
        } else if percent > 80.0 {
            UsageLevel::Warning
        } else {
            UsageLevel::Normal
        }
    }

    /// Bucket a window by its clamped percentage
    pub fn of(window: &UsageWindow) -> Self {
        Self::from_percent(window.clamped_percent())
    }

    /// Terminal colour
    pub fn color(self) -> Color {
        match self {
            UsageLevel::Normal => Color::Cyan,
            UsageLevel::Warning => Color::Yellow,
            UsageLevel::Critical => Color::Red,
        }
    }

    /// Colour name as tmux spells it
    pub fn colour_name(self) -> &'static str {
        match self {
            UsageLevel::Normal => "cyan",
            UsageLevel::Warning => "yellow",
            UsageLevel::Critical => "red",
        }
    }
}
