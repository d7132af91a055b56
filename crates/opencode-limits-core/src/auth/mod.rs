//! Credential loading from the opencode auth file.
//!
//! The file is written by opencode itself; this module only reads the three
//! secrets needed to query Codex and GitHub Copilot.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

/// Default location of the opencode auth file (relative to the home directory)
pub const DEFAULT_AUTH_FILE: &str = ".local/share/opencode/auth.json";

/// Keys that may hold an access token inside a provider object
const TOKEN_KEYS: [&str; 3] = ["access", "accessToken", "token"];

/// Error type for credential loading
#[derive(Debug, Error)]
pub enum AuthError {
    /// The auth file does not exist
    #[error("Auth file not found at {}", path.display())]
    NotFound { path: PathBuf },

    /// The auth file exists but is not valid JSON
    #[error("Auth file at {} is not valid JSON", path.display())]
    InvalidJson { path: PathBuf },

    /// The auth file could not be read
    #[error("Failed to read auth file at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One or more required keys are missing
    #[error("Auth file missing required keys: {}", keys.join(", "))]
    MissingKeys { keys: Vec<&'static str> },
}

/// Secrets required to query both providers
#[derive(Clone, PartialEq, Eq)]
pub struct AuthTokens {
    /// ChatGPT/Codex bearer token
    pub openai: String,
    /// GitHub Copilot bearer token
    pub github_copilot: String,
    /// ChatGPT account id sent alongside the Codex token
    pub chatgpt_account_id: String,
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens")
            .field("openai", &"<redacted>")
            .field("github_copilot", &"<redacted>")
            .field("chatgpt_account_id", &"<redacted>")
            .finish()
    }
}

/// Resolve the default auth file path
pub fn default_auth_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("~"))
        .join(DEFAULT_AUTH_FILE)
}

/// Load tokens from the auth file at `path`
pub fn load_auth(path: &Path) -> Result<AuthTokens, AuthError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            AuthError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            AuthError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let data: Value = serde_json::from_str(&content).map_err(|_| AuthError::InvalidJson {
        path: path.to_path_buf(),
    })?;

    parse_auth(&data)
}

/// Extract tokens from an already-decoded auth document
pub fn parse_auth(data: &Value) -> Result<AuthTokens, AuthError> {
    let (openai, account_id) = extract_openai(data);
    let github_copilot = data.get("github-copilot").and_then(extract_token);

    let mut missing = Vec::new();
    if openai.is_none() {
        missing.push("openai.access");
    }
    if github_copilot.is_none() {
        missing.push("github-copilot.access");
    }
    if account_id.is_none() {
        missing.push("openai.accountId");
    }

    match (openai, github_copilot, account_id) {
        (Some(openai), Some(github_copilot), Some(chatgpt_account_id)) => Ok(AuthTokens {
            openai,
            github_copilot,
            chatgpt_account_id,
        }),
        _ => Err(AuthError::MissingKeys { keys: missing }),
    }
}

/// The `openai` entry is either an object carrying token and account id,
/// or a bare token with the account id stored at the top level.
fn extract_openai(data: &Value) -> (Option<String>, Option<String>) {
    match data.get("openai") {
        Some(value @ Value::Object(obj)) => (
            extract_token(value),
            obj.get("accountId").and_then(string_or_none),
        ),
        Some(value) => (
            string_or_none(value),
            data.get("chatgpt-account-id").and_then(string_or_none),
        ),
        None => (
            None,
            data.get("chatgpt-account-id").and_then(string_or_none),
        ),
    }
}

fn extract_token(value: &Value) -> Option<String> {
    match value {
        Value::Object(obj) => TOKEN_KEYS
            .iter()
            .filter_map(|key| obj.get(*key))
            .find_map(string_or_none),
        other => string_or_none(other),
    }
}

fn string_or_none(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
