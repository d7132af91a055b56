//! Blocking HTTP transport for both providers.

use std::time::Duration;

use chrono::{Datelike, Local};
use serde_json::Value;
use tracing::{debug, info};
use ureq::typestate::WithoutBody;
use ureq::{Agent, RequestBuilder};

use super::codex::parse_codex_usage;
use super::copilot::{parse_copilot_internal, parse_copilot_payload};
use super::{FetchError, UsageSource};
use crate::auth::AuthTokens;
use crate::usage::UsageWindow;

/// Codex usage endpoint on the ChatGPT backend
const CODEX_USAGE_URL: &str = "https://chatgpt.com/backend-api/wham/usage";

/// GitHub REST API base
const GITHUB_API_URL: &str = "https://api.github.com";

/// Pinned GitHub REST API version
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// [`UsageSource`] backed by the real provider APIs
pub struct HttpUsageSource {
    agent: Agent,
    codex_usage_url: String,
    github_api_url: String,
}

impl HttpUsageSource {
    /// Create a source pointing at the production endpoints
    pub fn new() -> Self {
        Self::with_endpoints(CODEX_USAGE_URL, GITHUB_API_URL)
    }

    /// Create a source with custom endpoints
    pub fn with_endpoints(codex_usage_url: &str, github_api_url: &str) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            codex_usage_url: codex_usage_url.to_string(),
            github_api_url: github_api_url.trim_end_matches('/').to_string(),
        }
    }

    fn github_get(&self, path: &str, token: &str) -> RequestBuilder<WithoutBody> {
        self.agent
            .get(format!("{}{}", self.github_api_url, path))
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .header("User-Agent", "opencode-limits")
    }

    /// Premium request billing report for the current month.
    ///
    /// Returns `Ok(None)` on 404 so the caller can fall back to the
    /// internal quota endpoint.
    fn copilot_billing(&self, token: &str) -> Result<Option<UsageWindow>, FetchError> {
        let user: Value = self
            .github_get("/user", token)
            .call()?
            .body_mut()
            .read_json()?;
        let login = user
            .get("login")
            .and_then(Value::as_str)
            .filter(|login| !login.is_empty())
            .ok_or(FetchError::MissingLogin)?;

        let today = Local::now().date_naive();
        let path = format!("/users/{}/settings/billing/premium_request/usage", login);
        let response = self
            .github_get(&path, token)
            .query("year", today.year().to_string())
            .query("month", today.month().to_string())
            .call();

        let mut response = match response {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(404)) => {
                debug!("Copilot billing usage not available for {}, falling back", login);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let payload: Value = response.body_mut().read_json()?;
        parse_copilot_payload(&payload, today).map(Some)
    }

    /// Internal quota snapshot used by the Copilot editors.
    ///
    /// The endpoint fixes the shape, so a response without quota data
    /// decodes as an unbounded 0% window.
    fn copilot_internal(&self, token: &str) -> Result<UsageWindow, FetchError> {
        let payload: Value = self
            .github_get("/copilot_internal/user", token)
            .call()?
            .body_mut()
            .read_json()?;
        Ok(parse_copilot_internal(&payload))
    }
}

impl Default for HttpUsageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageSource for HttpUsageSource {
    fn codex(&self, tokens: &AuthTokens) -> Result<Vec<UsageWindow>, FetchError> {
        let payload: Value = self
            .agent
            .get(&self.codex_usage_url)
            .header("Authorization", format!("Bearer {}", tokens.openai))
            .header("chatgpt-account-id", &tokens.chatgpt_account_id)
            .call()?
            .body_mut()
            .read_json()?;
        let windows = parse_codex_usage(&payload);
        info!("Codex usage: {} window(s)", windows.len());
        Ok(windows)
    }

    fn copilot(&self, tokens: &AuthTokens) -> Result<UsageWindow, FetchError> {
        let window = match self.copilot_billing(&tokens.github_copilot)? {
            Some(window) => window,
            None => self.copilot_internal(&tokens.github_copilot)?,
        };
        info!("Copilot usage: {:.1}% ({})", window.used_percent, window.label);
        Ok(window)
    }
}
