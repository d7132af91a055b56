//! Compact tmux status line.
//!
//! `<codex icon> <5HR>/<Weekly> <copilot icon> <copilot>` with each value
//! wrapped in tmux `#[fg=...]` styles.

use opencode_limits_core::usage::UsageWindow;

use crate::ui::UsageLevel;

/// Nerd Font glyph shown before the Codex windows
pub const CODEX_ICON: char = '\u{f1cb}';
/// Nerd Font glyph shown before the Copilot window
pub const COPILOT_ICON: char = '\u{ec1e}';

const MISSING_PERCENT: &str = "--%";

/// Render the status line. Empty when there is no data at all.
pub fn render_tmux_status(codex: &[UsageWindow], copilot: Option<&UsageWindow>) -> String {
    if codex.is_empty() && copilot.is_none() {
        return String::new();
    }

    let five_hour = find_window(codex, "5HR");
    let weekly = find_window(codex, "Weekly");

    format!(
        "{} {}/{} {} {}",
        styled_icon(CODEX_ICON, five_hour),
        styled_percent(five_hour),
        styled_percent(weekly),
        styled_icon(COPILOT_ICON, copilot),
        styled_percent(copilot),
    )
}

fn find_window<'a>(windows: &'a [UsageWindow], label: &str) -> Option<&'a UsageWindow> {
    let target = label.trim().to_lowercase();
    windows
        .iter()
        .find(|window| window.label.trim().to_lowercase() == target)
}

fn styled_icon(icon: char, window: Option<&UsageWindow>) -> String {
    match window {
        Some(window) => style_text(&icon.to_string(), UsageLevel::of(window)),
        None => icon.to_string(),
    }
}

fn styled_percent(window: Option<&UsageWindow>) -> String {
    match window {
        Some(window) => {
            let value = format!("{}%", window.clamped_percent().round_ties_even() as u8);
            style_text(&value, UsageLevel::of(window))
        }
        None => MISSING_PERCENT.to_string(),
    }
}

fn style_text(text: &str, level: UsageLevel) -> String {
    format!("#[fg={}]{}#[default]", level.colour_name(), text)
}
