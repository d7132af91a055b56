use anyhow::{Context, Result};
use opencode_limits_core::config::CacheOptions;
use std::process::Command;
use tracing::debug;

/// tmux global options that override cache settings
const OPTION_CACHE_PATH: &str = "@opencode_limits_cache_path";
const OPTION_CACHE_TTL: &str = "@opencode_limits_cache_ttl";
const OPTION_CACHE_DISABLE: &str = "@opencode_limits_cache_disable";
const OPTION_REFRESH: &str = "@opencode_limits_refresh";

/// Whether this process runs inside a tmux session
fn in_tmux() -> bool {
    std::env::var_os("TMUX").is_some()
}

/// Read a global tmux option. Unset or empty options read as `None`.
pub fn show_option(option: &str) -> Result<Option<String>> {
    let output = Command::new("tmux")
        .args(["show-option", "-gqv", option])
        .output()
        .context("Failed to execute tmux show-option")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("tmux show-option failed: {}", stderr.trim());
    }

    Ok(option_value(&output.stdout))
}

fn option_value(stdout: &[u8]) -> Option<String> {
    let value = String::from_utf8_lossy(stdout).trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Cache overrides from tmux global options; empty outside tmux
pub fn read_cache_options() -> CacheOptions {
    if !in_tmux() {
        return CacheOptions::default();
    }

    let read = |option: &str| match show_option(option) {
        Ok(value) => value,
        Err(e) => {
            debug!("Skipping tmux option {}: {:#}", option, e);
            None
        }
    };

    CacheOptions {
        path: read(OPTION_CACHE_PATH),
        ttl: read(OPTION_CACHE_TTL),
        disable: read(OPTION_CACHE_DISABLE),
        refresh: read(OPTION_REFRESH),
    }
}
