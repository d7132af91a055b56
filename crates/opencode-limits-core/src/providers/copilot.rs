//! GitHub Copilot usage normalizer.
//!
//! Two upstream shapes exist: the billing "premium request usage" report
//! (line items summed against a fixed monthly quota) and the internal
//! `copilot_internal/user` quota snapshot.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde_json::Value;

use super::FetchError;
use crate::usage::{coerce_number, parse_timestamp, UsageWindow};

/// Premium requests included in Copilot Pro per month
pub const COPILOT_PRO_MONTHLY_LIMIT: f64 = 300.0;

/// Billing line items for this product are counted
const COPILOT_PRODUCT: &str = "Copilot";

/// Label for windows built from the billing report
pub const MONTHLY_LABEL: &str = "monthly";

/// Label for windows built from the internal quota snapshot
pub const REQUESTS_LABEL: &str = "Requests";

/// Known Copilot payload shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopilotPayload {
    /// Billing usage report (`usageItems` / `grossQuantity`)
    Billing,
    /// Internal quota snapshot (`quota_snapshots`)
    Internal,
}

impl CopilotPayload {
    /// Classify a payload by its discriminating keys
    pub fn classify(payload: &Value) -> Option<Self> {
        if payload.get("usageItems").is_some() || payload.get("grossQuantity").is_some() {
            Some(Self::Billing)
        } else if payload.get("quota_snapshots").is_some() {
            Some(Self::Internal)
        } else {
            None
        }
    }
}

/// Classify `payload` and decode it with the matching shape decoder.
///
/// `today` anchors the monthly reset for the billing shape.
pub fn parse_copilot_payload(payload: &Value, today: NaiveDate) -> Result<UsageWindow, FetchError> {
    match CopilotPayload::classify(payload) {
        Some(CopilotPayload::Billing) => {
            Ok(build_copilot_window(parse_copilot_usage(payload), today))
        }
        Some(CopilotPayload::Internal) => Ok(parse_copilot_internal(payload)),
        None => Err(FetchError::UnrecognizedPayload {
            provider: "GitHub Copilot",
        }),
    }
}

/// Sum premium request usage for the Copilot product from a billing report
pub fn parse_copilot_usage(payload: &Value) -> f64 {
    match payload.get("usageItems").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => items
            .iter()
            .filter(|item| item.get("product").and_then(Value::as_str) == Some(COPILOT_PRODUCT))
            .map(|item| quantity(item.get("grossQuantity")))
            .sum(),
        _ => quantity(payload.get("grossQuantity")),
    }
}

/// Build the monthly window for `used` premium requests
pub fn build_copilot_window(used: f64, today: NaiveDate) -> UsageWindow {
    let used_percent = if COPILOT_PRO_MONTHLY_LIMIT > 0.0 {
        used / COPILOT_PRO_MONTHLY_LIMIT * 100.0
    } else {
        0.0
    };
    UsageWindow::new(MONTHLY_LABEL, used_percent, next_month_start(today))
        .with_counts(Some(used), Some(COPILOT_PRO_MONTHLY_LIMIT))
}

/// Decode the internal quota snapshot
pub fn parse_copilot_internal(payload: &Value) -> UsageWindow {
    let premium = payload
        .get("quota_snapshots")
        .and_then(|s| s.get("premium_interactions"));
    let read = |key: &str| premium.and_then(|p| p.get(key));

    let entitlement = quantity(read("entitlement"));
    let remaining = quantity(read("remaining"));
    let unlimited = read("unlimited").is_some_and(is_truthy);

    let reset_at = ["quota_reset_date", "quota_reset_date_utc"]
        .iter()
        .filter_map(|key| payload.get(*key))
        .find(|value| is_truthy(value))
        .and_then(parse_timestamp);

    if unlimited || entitlement <= 0.0 {
        return UsageWindow::new(REQUESTS_LABEL, 0.0, reset_at);
    }

    let used = (entitlement - remaining).max(0.0);
    UsageWindow::new(REQUESTS_LABEL, used / entitlement * 100.0, reset_at)
        .with_counts(Some(used), Some(entitlement))
}

/// First instant of the month following `today`, in UTC
fn next_month_start(today: NaiveDate) -> Option<DateTime<Utc>> {
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Missing or non-numeric quantities count as zero
fn quantity(value: Option<&Value>) -> f64 {
    value.and_then(coerce_number).unwrap_or(0.0)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(obj) => !obj.is_empty(),
    }
}
