//! Concurrent fetch of both providers.
//!
//! Each provider runs on its own blocking task; the two are joined before
//! the combined report is built. A failure in one never affects the other.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::auth::AuthTokens;
use crate::providers::{FetchError, Provider, UsageSource};
use crate::usage::UsageWindow;

/// Emitted as each provider fetch completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchEvent {
    /// Which provider finished
    pub provider: Provider,
    /// Whether it produced data
    pub ok: bool,
}

/// Sender for fetch completion events
pub type FetchEventSender = mpsc::UnboundedSender<FetchEvent>;
/// Receiver for fetch completion events
pub type FetchEventReceiver = mpsc::UnboundedReceiver<FetchEvent>;

/// Create a channel for fetch completion events
pub fn fetch_event_channel() -> (FetchEventSender, FetchEventReceiver) {
    mpsc::unbounded_channel()
}

/// Combined result of one live fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchReport {
    /// Codex windows (empty when the fetch failed)
    pub codex: Vec<UsageWindow>,
    /// Copilot window (None when the fetch failed)
    pub copilot: Option<UsageWindow>,
    /// One message per failed provider, e.g. "Codex failed: ..."
    pub failures: Vec<String>,
}

impl FetchReport {
    /// Whether any provider produced a window
    pub fn has_data(&self) -> bool {
        !self.codex.is_empty() || self.copilot.is_some()
    }

    /// Whether both providers succeeded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fetch both providers concurrently.
///
/// `events`, when given, receives one [`FetchEvent`] per provider as soon
/// as that provider finishes.
pub async fn fetch_all(
    source: Arc<dyn UsageSource>,
    tokens: Arc<AuthTokens>,
    events: Option<FetchEventSender>,
) -> FetchReport {
    let codex_task = {
        let source = Arc::clone(&source);
        let tokens = Arc::clone(&tokens);
        let events = events.clone();
        tokio::task::spawn_blocking(move || {
            let result = source.codex(&tokens);
            notify(events.as_ref(), Provider::Codex, result.is_ok());
            result
        })
    };

    let copilot_task = {
        let source = Arc::clone(&source);
        let tokens = Arc::clone(&tokens);
        let events = events.clone();
        tokio::task::spawn_blocking(move || {
            let result = source.copilot(&tokens);
            notify(events.as_ref(), Provider::Copilot, result.is_ok());
            result
        })
    };

    let (codex, copilot) = tokio::join!(codex_task, copilot_task);

    let mut report = FetchReport::default();
    match settle(Provider::Codex, codex, events.as_ref()) {
        Ok(windows) => report.codex = windows,
        Err(message) => report.failures.push(message),
    }
    match settle(Provider::Copilot, copilot, events.as_ref()) {
        Ok(window) => report.copilot = Some(window),
        Err(message) => report.failures.push(message),
    }

    debug!(
        "Fetch finished: {} codex window(s), copilot={}, {} failure(s)",
        report.codex.len(),
        report.copilot.is_some(),
        report.failures.len()
    );
    report
}

fn notify(events: Option<&FetchEventSender>, provider: Provider, ok: bool) {
    if let Some(tx) = events {
        // Receiver may already be gone; progress is best-effort
        let _ = tx.send(FetchEvent { provider, ok });
    }
}

/// Flatten a joined task result into data or a user-facing failure message
fn settle<T>(
    provider: Provider,
    joined: Result<Result<T, FetchError>, JoinError>,
    events: Option<&FetchEventSender>,
) -> Result<T, String> {
    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            warn!("{} fetch failed: {}", provider, e);
            Err(format!("{} failed: {}", provider, e))
        }
        Err(e) => {
            // The task panicked before it could report completion
            warn!("{} fetch task aborted: {}", provider, e);
            notify(events, provider, false);
            Err(format!("{} failed: {}", provider, e))
        }
    }
}
