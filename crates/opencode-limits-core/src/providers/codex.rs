//! Codex (ChatGPT backend) usage normalizer.
//!
//! The `rate_limit` member of the usage response has shipped in several
//! shapes; each is classified first and then decoded by a dedicated path.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::usage::{coerce_number, parse_timestamp, UsageWindow};

/// Keys whose presence marks an object as a window body rather than a
/// name → body mapping
const ENTRY_KEYS: [&str; 4] = ["used_percent", "limit", "reset_at", "used"];

/// Compact spellings of the five-hour window
const FIVE_HOUR_ALIASES: [&str; 7] = [
    "5h", "5hr", "5hrs", "5hour", "5hours", "fivehour", "fivehours",
];

static NULL: Value = Value::Null;

/// Runs of whitespace inside window names
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid WHITESPACE regex"));

/// Shape of the window collection inside `rate_limit`
#[derive(Debug)]
enum WindowsShape<'a> {
    /// Member missing or null
    Absent,
    /// A single window body
    Single(&'a Map<String, Value>),
    /// Window name → window body
    Named(&'a Map<String, Value>),
    /// Window bodies carrying their own name
    List(&'a [Value]),
    /// Anything else (string, number, bool)
    Unrecognized(&'a Value),
}

impl<'a> WindowsShape<'a> {
    fn classify(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::Object(obj)) if looks_like_entry(obj) => Self::Single(obj),
            Some(Value::Object(obj)) => Self::Named(obj),
            Some(Value::Array(items)) => Self::List(items),
            Some(other) => Self::Unrecognized(other),
        }
    }
}

/// Parse a Codex usage response into usage windows
pub fn parse_codex_usage(payload: &Value) -> Vec<UsageWindow> {
    match WindowsShape::classify(payload.get("rate_limit")) {
        WindowsShape::Absent => {
            debug!("Codex payload has no rate_limit member");
            Vec::new()
        }
        WindowsShape::Single(entry) => vec![parse_window(entry, None)],
        WindowsShape::Named(entries) => entries
            .iter()
            .filter_map(|(name, body)| {
                body.as_object()
                    .map(|obj| parse_window(obj, Some(name.as_str())))
            })
            .collect(),
        WindowsShape::List(items) => items
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| parse_window(obj, None))
            .collect(),
        WindowsShape::Unrecognized(value) => {
            warn!("Unrecognized Codex rate_limit shape: {}", value);
            Vec::new()
        }
    }
}

fn looks_like_entry(obj: &Map<String, Value>) -> bool {
    ENTRY_KEYS.iter().any(|key| obj.contains_key(*key))
}

/// Decode one window body. `fallback_name` is the mapping key for the
/// name → body shape; an explicit `window` field in the body wins over it.
fn parse_window(entry: &Map<String, Value>, fallback_name: Option<&str>) -> UsageWindow {
    let raw_name = name_field(entry, "window")
        .or_else(|| fallback_name.map(str::to_string))
        .or_else(|| name_field(entry, "name"))
        .unwrap_or_else(|| "window".to_string());

    let used = coerce_number(field(entry, "used"));
    let limit = coerce_number(field(entry, "limit"));

    UsageWindow::new(
        canonical_label(&raw_name),
        derive_used_percent(coerce_number(field(entry, "used_percent")), used, limit),
        parse_timestamp(field(entry, "reset_at")),
    )
    .with_counts(used, limit)
}

fn field<'a>(entry: &'a Map<String, Value>, key: &str) -> &'a Value {
    entry.get(key).unwrap_or(&NULL)
}

/// Read a name-like field, ignoring empty and non-scalar values
fn name_field(entry: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match entry.get(key)? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Map a raw window name onto its display label.
///
/// `"primary_window"` and the five-hour spellings become `5HR`,
/// `"secondary_window"` becomes `Weekly`; anything else keeps its
/// separator-normalized text with ` window` appended.
pub fn canonical_label(raw: &str) -> String {
    let spaced = raw.replace('_', " ");
    let spaced = WHITESPACE.replace_all(spaced.trim(), " ").into_owned();
    let lowered = spaced.to_lowercase();
    let compact: String = lowered.chars().filter(|c| *c != ' ' && *c != '-').collect();

    let label = if FIVE_HOUR_ALIASES.contains(&compact.as_str()) {
        "5HR".to_string()
    } else {
        match lowered.as_str() {
            "primary window" => "5HR".to_string(),
            "secondary window" => "Weekly".to_string(),
            _ => spaced,
        }
    };

    let label_lower = label.to_lowercase();
    if label_lower.contains("window") || label_lower == "weekly" || label_lower == "5hr" {
        label
    } else {
        format!("{} window", label)
    }
}

/// An explicit percentage wins; otherwise derive it from raw counts.
/// Unknown usage reads as zero.
fn derive_used_percent(direct: Option<f64>, used: Option<f64>, limit: Option<f64>) -> f64 {
    if let Some(percent) = direct {
        return percent;
    }
    match (used, limit) {
        (Some(used), Some(limit)) if limit != 0.0 => used / limit * 100.0,
        _ => 0.0,
    }
}
