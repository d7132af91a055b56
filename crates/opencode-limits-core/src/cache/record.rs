//! Persisted usage snapshot and its JSON encoding.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::auth::AuthTokens;
use crate::usage::{coerce_number, parse_timestamp, UsageWindow};

/// Current cache schema version. Records with any other version are ignored.
pub const FORMAT_VERSION: u32 = 1;

/// Label given to the Copilot window when it is restored from cache
pub const CACHED_COPILOT_LABEL: &str = "Copilot";

/// Cached subset of a usage window (raw counts are not persisted)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedWindow {
    /// Percentage used, unclamped
    pub used_percent: f64,
    /// Reset instant, if known
    pub reset_at: Option<DateTime<Utc>>,
}

impl CachedWindow {
    fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let used_percent = coerce_number(obj.get("used_percent")?)?;
        let reset_at = obj.get("reset_at").and_then(parse_timestamp);
        Some(Self {
            used_percent,
            reset_at,
        })
    }

    fn into_window(self, label: &str) -> UsageWindow {
        UsageWindow::new(label, self.used_percent, self.reset_at)
    }
}

impl From<&UsageWindow> for CachedWindow {
    fn from(window: &UsageWindow) -> Self {
        Self {
            used_percent: window.used_percent,
            reset_at: window.reset_at,
        }
    }
}

/// One persisted snapshot of both providers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheRecord {
    /// When the snapshot was fetched
    pub fetched_at: DateTime<Utc>,
    /// Codex windows keyed by canonical label
    pub codex: BTreeMap<String, CachedWindow>,
    /// Copilot window, if one was fetched
    pub copilot: Option<CachedWindow>,
    /// Fingerprint of the credentials the snapshot was fetched with
    pub auth_fingerprint: String,
    /// Schema version
    pub format_version: u32,
}

impl CacheRecord {
    /// Encode as a JSON value
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Encode as pretty-printed JSON bytes
    pub fn serialize(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// Decode from bytes. Anything unusable yields `None`.
    pub fn deserialize(bytes: &[u8]) -> Option<Self> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => Self::from_json(&value),
            Err(e) => {
                debug!("Cache payload is not valid JSON: {}", e);
                None
            }
        }
    }

    /// Decode from a JSON value.
    ///
    /// `fetched_at`, `auth_fingerprint` and `format_version` are required;
    /// malformed windows are dropped individually.
    pub fn from_json(payload: &Value) -> Option<Self> {
        let obj = payload.as_object()?;

        let fetched_at = obj.get("fetched_at").and_then(parse_timestamp)?;
        let auth_fingerprint = obj
            .get("auth_fingerprint")
            .and_then(Value::as_str)
            .filter(|fp| !fp.is_empty())?
            .to_string();
        let format_version = obj.get("format_version").and_then(parse_version)?;

        let codex: BTreeMap<String, CachedWindow> = obj
            .get("codex")
            .and_then(Value::as_object)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(label, entry)| {
                        CachedWindow::from_json(entry).map(|w| (label.clone(), w))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let copilot = obj.get("copilot").and_then(CachedWindow::from_json);

        Some(Self {
            fetched_at,
            codex,
            copilot,
            auth_fingerprint,
            format_version,
        })
    }

    /// Every reset instant carried by the record
    pub fn reset_instants(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.codex
            .values()
            .chain(self.copilot.iter())
            .filter_map(|window| window.reset_at)
    }

    /// Whether the record holds no windows at all
    pub fn is_empty(&self) -> bool {
        self.codex.is_empty() && self.copilot.is_none()
    }

    /// Restore usage windows for rendering
    pub fn to_windows(&self) -> (Vec<UsageWindow>, Option<UsageWindow>) {
        let codex = self
            .codex
            .iter()
            .map(|(label, window)| window.clone().into_window(label))
            .collect();
        let copilot = self
            .copilot
            .clone()
            .map(|window| window.into_window(CACHED_COPILOT_LABEL));
        (codex, copilot)
    }
}

/// Accept integers and integer-valued strings
fn parse_version(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Digest binding a snapshot to one credential set.
///
/// Order-sensitive: each secret is separated by `:` before hashing.
pub fn build_fingerprint(tokens: &AuthTokens) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tokens.openai.as_bytes());
    hasher.update(b":");
    hasher.update(tokens.github_copilot.as_bytes());
    hasher.update(b":");
    hasher.update(tokens.chatgpt_account_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Only the status-line windows are cached
fn cached_codex_label(label: &str) -> Option<&'static str> {
    match label.trim().to_lowercase().as_str() {
        "5hr" => Some("5HR"),
        "weekly" => Some("Weekly"),
        _ => None,
    }
}

/// Build a record from freshly fetched windows
pub fn build_cache_record(
    codex_windows: &[UsageWindow],
    copilot_window: Option<&UsageWindow>,
    auth_fingerprint: &str,
    fetched_at: DateTime<Utc>,
) -> CacheRecord {
    let codex: BTreeMap<String, CachedWindow> = codex_windows
        .iter()
        .filter_map(|window| {
            cached_codex_label(&window.label).map(|label| (label.to_string(), window.into()))
        })
        .collect();

    CacheRecord {
        fetched_at,
        codex,
        copilot: copilot_window.map(CachedWindow::from),
        auth_fingerprint: auth_fingerprint.to_string(),
        format_version: FORMAT_VERSION,
    }
}
