//! Plain-terminal usage report.
//!
//! One section per provider with data, one row per window:
//! `label [####--------] 42% 17/40 Resets: 2026-01-01 17:00:00 +01:00`

use std::fmt;
use std::io::{self, Write};

use chrono::{DateTime, Local, TimeZone, Utc};
use crossterm::style::{style, Color, Stylize};
use opencode_limits_core::providers::Provider;
use opencode_limits_core::service::FetchEvent;
use opencode_limits_core::usage::UsageWindow;
use unicode_width::UnicodeWidthStr;

use super::style::UsageLevel;

/// Cells in a usage bar
pub const BAR_WIDTH: usize = 28;

const RESET_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// A titled group of windows
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub provider: Provider,
    pub windows: Vec<UsageWindow>,
}

impl ReportSection {
    /// Sections for providers that produced data, Codex first
    pub fn collect(codex: &[UsageWindow], copilot: Option<&UsageWindow>) -> Vec<Self> {
        let mut sections = Vec::new();
        if !codex.is_empty() {
            sections.push(Self {
                provider: Provider::Codex,
                windows: codex.to_vec(),
            });
        }
        if let Some(window) = copilot {
            sections.push(Self {
                provider: Provider::Copilot,
                windows: vec![window.clone()],
            });
        }
        sections
    }
}

/// Write the report. Nothing is written when there are no windows.
pub fn render_report<W: Write>(out: &mut W, sections: &[ReportSection], color: bool) -> io::Result<()> {
    let windows = || sections.iter().flat_map(|s| s.windows.iter());
    if windows().next().is_none() {
        return Ok(());
    }

    // Shared column widths across every section
    let label_width = windows().map(|w| w.label.width()).max().unwrap_or(0);
    let usage_width = windows().map(|w| usage_suffix(w).width()).max().unwrap_or(0);

    for (index, section) in sections.iter().enumerate() {
        if index > 0 {
            writeln!(out)?;
        }
        let title = section.provider.display_name();
        if color {
            writeln!(out, "{}", title.magenta().bold())?;
        } else {
            writeln!(out, "{}", title)?;
        }

        for window in &section.windows {
            write_row(out, window, label_width, usage_width, color)?;
        }
    }
    Ok(())
}

fn write_row<W: Write>(
    out: &mut W,
    window: &UsageWindow,
    label_width: usize,
    usage_width: usize,
    color: bool,
) -> io::Result<()> {
    let percent = window.clamped_percent();
    let level = UsageLevel::from_percent(percent);
    let filled = filled_cells(percent);
    let percent_text = format!("{:>3}%", percent.round_ties_even() as u8);

    write!(out, "{} ", pad_right(&window.label, label_width))?;
    if color {
        write!(
            out,
            "[{}{}] {}",
            style("#".repeat(filled)).with(level.color()),
            style("-".repeat(BAR_WIDTH - filled)).with(Color::DarkGrey),
            style(percent_text).with(level.color()),
        )?;
    } else {
        write!(
            out,
            "[{}{}] {}",
            "#".repeat(filled),
            "-".repeat(BAR_WIDTH - filled),
            percent_text
        )?;
    }
    if usage_width > 0 {
        write!(out, " {}", pad_left(&usage_suffix(window), usage_width))?;
    }
    writeln!(out, " Resets: {}", format_reset_in(window.reset_at, &Local))
}

/// Filled bar cells for a clamped percentage
fn filled_cells(percent: f64) -> usize {
    let filled = (BAR_WIDTH as f64 * percent / 100.0).round_ties_even();
    (filled.max(0.0) as usize).min(BAR_WIDTH)
}

/// `used/limit` when both counts are known
fn usage_suffix(window: &UsageWindow) -> String {
    match (window.used, window.limit) {
        (Some(used), Some(limit)) => {
            format!("{:.0}/{:.0}", used.round_ties_even(), limit.round_ties_even())
        }
        _ => String::new(),
    }
}

/// Reset instant rendered in `tz`, or `n/a`
pub fn format_reset_in<Tz>(reset_at: Option<DateTime<Utc>>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    match reset_at {
        Some(at) => at.with_timezone(tz).format(RESET_FORMAT).to_string(),
        None => "n/a".to_string(),
    }
}

fn pad_right(text: &str, width: usize) -> String {
    format!("{}{}", text, " ".repeat(width.saturating_sub(text.width())))
}

fn pad_left(text: &str, width: usize) -> String {
    format!("{}{}", " ".repeat(width.saturating_sub(text.width())), text)
}

/// One progress line for a finished provider fetch
pub fn progress_line(event: &FetchEvent, color: bool) -> String {
    let name = event.provider.display_name();
    match (event.ok, color) {
        (true, true) => format!("{} {}", "✔".green(), name),
        (false, true) => format!("{} {}", "✘".red(), name),
        (true, false) => format!("✔ {}", name),
        (false, false) => format!("✘ {}", name),
    }
}

/// Write a non-fatal failure message
pub fn write_failure<W: Write>(out: &mut W, message: &str, color: bool) -> io::Result<()> {
    if color {
        writeln!(out, "{}", message.red())
    } else {
        writeln!(out, "{}", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(sections: &[ReportSection]) -> String {
        let mut buf = Vec::new();
        render_report(&mut buf, sections, false).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_plain_report_layout() {
        let codex = vec![
            UsageWindow::new("5HR", 50.0, None),
            UsageWindow::new("Weekly", 100.0, None),
        ];
        let copilot = UsageWindow::new("monthly", 50.0, None).with_counts(Some(150.0), Some(300.0));

        let output = render(&ReportSection::collect(&codex, Some(&copilot)));

        let expected = [
            "Codex",
            "5HR     [##############--------------]  50%         Resets: n/a",
            "Weekly  [############################] 100%         Resets: n/a",
            "",
            "GitHub Copilot",
            "monthly [##############--------------]  50% 150/300 Resets: n/a",
            "",
        ]
        .join("\n");
        assert_eq!(output, expected);
    }

    #[test]
    fn test_report_without_counts_has_no_usage_column() {
        let codex = vec![UsageWindow::new("5HR", 0.0, None)];
        let output = render(&ReportSection::collect(&codex, None));
        assert_eq!(
            output,
            "Codex\n5HR [----------------------------]   0% Resets: n/a\n"
        );
    }

    #[test]
    fn test_report_clamps_out_of_range_percent() {
        let codex = vec![
            UsageWindow::new("a", 130.0, None),
            UsageWindow::new("b", -5.0, None),
        ];
        let output = render(&ReportSection::collect(&codex, None));
        assert!(output.contains("a [############################] 100% "));
        assert!(output.contains("b [----------------------------]   0% "));
    }

    #[test]
    fn test_empty_report_writes_nothing() {
        assert_eq!(render(&ReportSection::collect(&[], None)), "");
    }

    #[test]
    fn test_colored_report_contains_ansi() {
        let codex = vec![UsageWindow::new("5HR", 90.0, None)];
        let mut buf = Vec::new();
        render_report(&mut buf, &ReportSection::collect(&codex, None), true).unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.contains('\u{1b}'));
        assert!(output.contains("Resets: n/a"));
    }

    #[test]
    fn test_filled_cells() {
        assert_eq!(filled_cells(0.0), 0);
        assert_eq!(filled_cells(50.0), 14);
        assert_eq!(filled_cells(100.0), BAR_WIDTH);
        assert_eq!(filled_cells(25.0), 7);
        assert_eq!(filled_cells(1.7857), 0);
    }

    #[test]
    fn test_format_reset_in_utc() {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(format_reset_in(Some(at), &Utc), "2026-02-01 00:00:00 UTC");
        assert_eq!(format_reset_in(None, &Utc), "n/a");
    }

    #[test]
    fn test_progress_and_failure_lines() {
        let ok = FetchEvent {
            provider: Provider::Codex,
            ok: true,
        };
        let failed = FetchEvent {
            provider: Provider::Copilot,
            ok: false,
        };
        assert_eq!(progress_line(&ok, false), "✔ Codex");
        assert_eq!(progress_line(&failed, false), "✘ GitHub Copilot");

        let mut buf = Vec::new();
        write_failure(&mut buf, "Codex failed: timeout", false).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Codex failed: timeout\n");
    }
}
