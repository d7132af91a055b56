//! Canonical usage window and the lenient value helpers the normalizers share.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Epoch values above this are treated as milliseconds
const EPOCH_MILLIS_THRESHOLD: f64 = 1_000_000_000_000.0;

/// A single quota window (e.g., Codex "5HR", Copilot "monthly")
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageWindow {
    /// Short label, unique within one provider's result list
    pub label: String,
    /// Percentage used. Not clamped: upstream values above 100 are kept as-is
    pub used_percent: f64,
    /// When the window rolls over, if known
    pub reset_at: Option<DateTime<Utc>>,
    /// Raw consumption count, when the provider reports one
    pub used: Option<f64>,
    /// Raw quota size, when the provider reports one
    pub limit: Option<f64>,
}

impl UsageWindow {
    /// Create a window without raw counts
    pub fn new(label: impl Into<String>, used_percent: f64, reset_at: Option<DateTime<Utc>>) -> Self {
        Self {
            label: label.into(),
            used_percent,
            reset_at,
            used: None,
            limit: None,
        }
    }

    /// Attach raw used/limit counts
    pub fn with_counts(mut self, used: Option<f64>, limit: Option<f64>) -> Self {
        self.used = used;
        self.limit = limit;
        self
    }

    /// Percentage clamped to 0..=100 for display
    pub fn clamped_percent(&self) -> f64 {
        self.used_percent.clamp(0.0, 100.0)
    }
}

/// Parse a timestamp that may be an RFC 3339 string, a naive ISO date-time,
/// a bare date, or epoch seconds/milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let mut seconds = n.as_f64()?;
            if !seconds.is_finite() {
                return None;
            }
            if seconds > EPOCH_MILLIS_THRESHOLD {
                seconds /= 1000.0;
            }
            DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)
        }
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Naive date-times carry no offset; treat them as UTC
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Coerce a JSON value into a finite float.
///
/// Numbers and numeric strings succeed; anything else is `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}
