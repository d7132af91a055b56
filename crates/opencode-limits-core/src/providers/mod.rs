//! Usage providers: payload normalizers plus the transport seam.
//!
//! The normalizers in [`codex`] and [`copilot`] are pure functions over
//! decoded JSON. [`UsageSource`] is the network boundary; [`HttpUsageSource`]
//! is the production implementation.

pub mod codex;
pub mod copilot;
mod http;

use std::fmt;

use thiserror::Error;

use crate::auth::AuthTokens;
use crate::usage::UsageWindow;

pub use http::HttpUsageSource;

/// Upstream usage providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Codex via the ChatGPT backend (multiple windows)
    Codex,
    /// GitHub Copilot premium requests (single window)
    Copilot,
}

impl Provider {
    /// Human-readable name used in headings and failure messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Codex => "Codex",
            Provider::Copilot => "GitHub Copilot",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error type for provider fetches
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport or HTTP status failure
    #[error("{0}")]
    Http(#[from] ureq::Error),

    /// GitHub `/user` response carried no login
    #[error("GitHub response missing login")]
    MissingLogin,

    /// Response matched none of the known payload shapes
    #[error("unrecognized {provider} usage payload")]
    UnrecognizedPayload { provider: &'static str },
}

/// Source of live usage data.
///
/// Implementations block; callers run them on blocking tasks.
pub trait UsageSource: Send + Sync {
    /// Fetch all Codex usage windows
    fn codex(&self, tokens: &AuthTokens) -> Result<Vec<UsageWindow>, FetchError>;

    /// Fetch the Copilot premium request window
    fn copilot(&self, tokens: &AuthTokens) -> Result<UsageWindow, FetchError>;
}
