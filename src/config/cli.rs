use clap::Parser;
use opencode_limits_core::config::CacheOptions;
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "opencode-limits",
    author,
    version,
    about = "Show usage limits for Codex and GitHub Copilot."
)]
pub struct Cli {
    /// Print tmux-ready usage status line
    #[arg(long)]
    pub tmux: bool,

    /// Enable debug logging (stderr)
    #[arg(short, long)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the opencode auth file
    #[arg(long, value_name = "PATH")]
    pub auth_file: Option<PathBuf>,

    /// Status-line cache file
    #[arg(long, value_name = "PATH")]
    pub cache_path: Option<String>,

    /// Seconds a cached status line stays fresh
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub cache_ttl: Option<u64>,

    /// Never read or write the status-line cache
    #[arg(long)]
    pub no_cache: bool,

    /// Ignore a fresh cached status line for this run
    #[arg(long)]
    pub refresh: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Cache overrides given on the command line. Absent flags leave the
    /// lower layers untouched.
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            path: self.cache_path.clone(),
            ttl: self.cache_ttl.map(|ttl| ttl.to_string()),
            disable: self.no_cache.then(|| "true".to_string()),
            refresh: self.refresh.then(|| "true".to_string()),
        }
    }
}
