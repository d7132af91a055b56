mod settings;

use std::path::PathBuf;

pub use settings::{
    parse_bool, parse_ttl, CacheOptions, CacheSettings, Settings, ENV_CACHE_DISABLE,
    ENV_CACHE_PATH, ENV_CACHE_TTL, ENV_REFRESH,
};

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
