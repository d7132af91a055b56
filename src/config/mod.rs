mod cli;

pub use cli::Cli;

use anyhow::Result;
use opencode_limits_core::config::{CacheOptions, Settings};

use crate::tmux;

/// Load settings and layer overrides on top.
///
/// Precedence, lowest first: config file, tmux global options (status-line
/// mode inside tmux only), `OPENCODE_LIMITS_*` environment, CLI flags.
pub fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_ref())?;

    if let Some(auth_file) = &cli.auth_file {
        settings.auth_path = Some(auth_file.display().to_string());
    }

    if cli.tmux {
        settings.cache.merge(&tmux::read_cache_options());
    }
    settings.cache.merge(&CacheOptions::from_env());
    settings.cache.merge(&cli.cache_options());

    Ok(settings)
}
