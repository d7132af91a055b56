//! Top-level flows: the interactive report and the tmux status line.

use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use opencode_limits_core::auth::{load_auth, AuthTokens};
use opencode_limits_core::cache::{cache_path, CacheStore};
use opencode_limits_core::config::CacheSettings;
use opencode_limits_core::providers::{HttpUsageSource, UsageSource};
use opencode_limits_core::service::{
    fetch_all, fetch_event_channel, resolve_usage, FetchEventReceiver, FetchReport, UsageOrigin,
};
use tracing::{debug, warn};

use crate::config::{resolve_settings, Cli};
use crate::tmux::render_tmux_status;
use crate::ui::{progress_line, render_report, write_failure, ReportSection};

/// Run the mode selected on the command line
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let settings = resolve_settings(&cli)?;

    let auth_path = settings.auth_file();
    debug!("Loading credentials from {:?}", auth_path);
    let tokens = match load_auth(&auth_path) {
        Ok(tokens) => Arc::new(tokens),
        Err(e) => {
            let stderr = io::stderr();
            let color = stderr.is_terminal();
            write_failure(&mut stderr.lock(), &e.to_string(), color)?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let source: Arc<dyn UsageSource> = Arc::new(HttpUsageSource::new());

    if cli.tmux {
        run_tmux(source, tokens, &settings.cache).await
    } else {
        run_report(source, tokens).await
    }
}

/// Fetch both providers and print the bar-chart report
pub async fn run_report(source: Arc<dyn UsageSource>, tokens: Arc<AuthTokens>) -> Result<ExitCode> {
    let show_progress = io::stderr().is_terminal();

    let (events, printer) = if show_progress {
        let (tx, rx) = fetch_event_channel();
        (Some(tx), Some(tokio::spawn(print_progress(rx))))
    } else {
        (None, None)
    };

    let report = fetch_all(source, tokens, events).await;

    if let Some(printer) = printer {
        // Completes once both fetch tasks dropped their senders
        if let Err(e) = printer.await {
            debug!("Progress printer stopped: {}", e);
        }
    }

    let stdout = io::stdout();
    let stderr = io::stderr();
    write_report(
        &mut stdout.lock(),
        &mut stderr.lock(),
        &report,
        stdout.is_terminal(),
        stderr.is_terminal(),
    )?;

    Ok(exit_code(report.has_data()))
}

async fn print_progress(mut events: FetchEventReceiver) {
    while let Some(event) = events.recv().await {
        eprintln!("{}", progress_line(&event, true));
    }
}

/// Report on `out`, provider failures on `err`
fn write_report<O: Write, E: Write>(
    out: &mut O,
    err: &mut E,
    report: &FetchReport,
    out_color: bool,
    err_color: bool,
) -> io::Result<()> {
    let sections = ReportSection::collect(&report.codex, report.copilot.as_ref());
    render_report(out, &sections, out_color)?;
    out.flush()?;

    for message in &report.failures {
        write_failure(err, message, err_color)?;
    }
    Ok(())
}

/// Print the tmux status line, serving a cached snapshot when possible
pub async fn run_tmux(
    source: Arc<dyn UsageSource>,
    tokens: Arc<AuthTokens>,
    cache: &CacheSettings,
) -> Result<ExitCode> {
    let store = CacheStore::new(cache_path(cache.path.as_deref()));

    let status = tmux_status(source, tokens, cache, &store, Utc::now).await;
    let Some(status) = status else {
        return Ok(ExitCode::FAILURE);
    };

    let mut out = io::stdout().lock();
    out.write_all(status.as_bytes())?;
    out.flush()?;
    Ok(ExitCode::SUCCESS)
}

/// Resolve usage and render it; `None` when nothing can be shown
async fn tmux_status<C>(
    source: Arc<dyn UsageSource>,
    tokens: Arc<AuthTokens>,
    cache: &CacheSettings,
    store: &CacheStore,
    clock: C,
) -> Option<String>
where
    C: Fn() -> DateTime<Utc>,
{
    let resolved = resolve_usage(source, tokens, cache, store, clock).await?;

    for message in &resolved.failures {
        warn!("{}", message);
    }
    if resolved.origin == UsageOrigin::StaleCache {
        debug!("Status line served from stale cache");
    }

    let status = render_tmux_status(&resolved.codex, resolved.copilot.as_ref());
    (!status.is_empty()).then_some(status)
}

fn exit_code(has_data: bool) -> ExitCode {
    if has_data {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
