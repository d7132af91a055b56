mod client;
mod status;

pub use client::{read_cache_options, show_option};
pub use status::{render_tmux_status, CODEX_ICON, COPILOT_ICON};
