use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use opencode_limits::app;
use opencode_limits::config::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Setup logging
    setup_logging(cli.debug);

    app::run(cli).await
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("opencode_limits=debug,opencode_limits_core=debug")
    } else {
        EnvFilter::new("warn")
    };

    // stdout carries the report or the tmux status line
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
