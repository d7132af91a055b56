use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::expand_home;
use crate::auth::default_auth_path;
use crate::cache::DEFAULT_CACHE_TTL_SECONDS;

/// Environment variables that override cache settings
pub const ENV_CACHE_PATH: &str = "OPENCODE_LIMITS_CACHE_PATH";
pub const ENV_CACHE_TTL: &str = "OPENCODE_LIMITS_CACHE_TTL";
pub const ENV_CACHE_DISABLE: &str = "OPENCODE_LIMITS_CACHE_DISABLE";
pub const ENV_REFRESH: &str = "OPENCODE_LIMITS_REFRESH";

/// Application settings (from config file)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the opencode auth file
    #[serde(default)]
    pub auth_path: Option<String>,

    /// Status-line cache settings
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Cache settings for the status-line mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Cache file path override
    #[serde(default)]
    pub path: Option<String>,

    /// Seconds a snapshot is served without refreshing
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Never read or write the cache
    #[serde(default)]
    pub disabled: bool,

    /// Skip the fresh-cache check for this run
    #[serde(default)]
    pub refresh: bool,
}

fn default_ttl_seconds() -> u64 {
    DEFAULT_CACHE_TTL_SECONDS
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            path: None,
            ttl_seconds: default_ttl_seconds(),
            disabled: false,
            refresh: false,
        }
    }
}

/// Raw, unvalidated cache overrides from one source (tmux options, env)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    pub path: Option<String>,
    pub ttl: Option<String>,
    pub disable: Option<String>,
    pub refresh: Option<String>,
}

impl CacheOptions {
    /// Read overrides from `OPENCODE_LIMITS_*` environment variables
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok();
        Self {
            path: var(ENV_CACHE_PATH),
            ttl: var(ENV_CACHE_TTL),
            disable: var(ENV_CACHE_DISABLE),
            refresh: var(ENV_REFRESH),
        }
    }
}

impl CacheSettings {
    /// Apply overrides; unparseable values keep the current setting
    pub fn merge(&mut self, options: &CacheOptions) {
        if let Some(path) = options.path.as_deref().filter(|p| !p.is_empty()) {
            self.path = Some(path.to_string());
        }
        self.ttl_seconds = parse_ttl(options.ttl.as_deref(), self.ttl_seconds);
        self.disabled = parse_bool(options.disable.as_deref(), self.disabled);
        self.refresh = parse_bool(options.refresh.as_deref(), self.refresh);
    }
}

/// Parse a boolean flag, falling back to `default`
pub fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

/// Parse a positive TTL in seconds, falling back to `default`
pub fn parse_ttl(value: Option<&str>, default: u64) -> u64 {
    match value.map(|v| v.trim().parse::<i64>()) {
        Some(Ok(parsed)) if parsed > 0 => parsed as u64,
        _ => default,
    }
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // Try custom path first
        if let Some(p) = path {
            if p.exists() {
                return Self::read(p);
            }
        }

        // Try default config locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("opencode-limits/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/opencode-limits/config.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::read(path);
            }
        }

        // Return defaults if no config file found
        Ok(Self::default())
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Resolved auth file path
    pub fn auth_file(&self) -> PathBuf {
        self.auth_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(|p| expand_home(p.trim()))
            .unwrap_or_else(default_auth_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.cache.ttl_seconds, 180);
        assert!(!settings.cache.disabled);
        assert!(!settings.cache.refresh);
        assert!(settings.auth_file().ends_with(".local/share/opencode/auth.json"));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            auth_path = "/etc/opencode/auth.json"

            [cache]
            ttl_seconds = 600
            disabled = true
        "#;

        let settings: Settings = toml::from_str(toml).expect("Should parse TOML");
        assert_eq!(settings.auth_file(), PathBuf::from("/etc/opencode/auth.json"));
        assert_eq!(settings.cache.ttl_seconds, 600);
        assert!(settings.cache.disabled);
        assert_eq!(settings.cache.path, None);
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\npath = \"/tmp/x.json\"\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.cache.path.as_deref(), Some("/tmp/x.json"));
        assert_eq!(settings.cache.ttl_seconds, 180);
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache\n").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool(Some("YES"), false));
        assert!(parse_bool(Some(" on "), false));
        assert!(!parse_bool(Some("0"), true));
        assert!(!parse_bool(Some("off"), true));
        assert!(parse_bool(Some("maybe"), true));
        assert!(!parse_bool(None, false));
    }

    #[test]
    fn test_parse_ttl() {
        assert_eq!(parse_ttl(Some("60"), 180), 60);
        assert_eq!(parse_ttl(Some("0"), 180), 180);
        assert_eq!(parse_ttl(Some("-5"), 180), 180);
        assert_eq!(parse_ttl(Some("soon"), 180), 180);
        assert_eq!(parse_ttl(None, 180), 180);
    }

    #[test]
    fn test_merge_layers() {
        let mut settings = CacheSettings::default();
        settings.merge(&CacheOptions {
            path: Some("/tmp/tmux-cache.json".to_string()),
            ttl: Some("30".to_string()),
            disable: None,
            refresh: Some("true".to_string()),
        });
        settings.merge(&CacheOptions {
            path: Some(String::new()),
            ttl: Some("bogus".to_string()),
            disable: Some("yes".to_string()),
            refresh: None,
        });

        assert_eq!(
            settings,
            CacheSettings {
                path: Some("/tmp/tmux-cache.json".to_string()),
                ttl_seconds: 30,
                disabled: true,
                refresh: true,
            }
        );
    }

    #[test]
    fn test_cache_options_from_env() {
        temp_env::with_vars(
            [
                (ENV_CACHE_PATH, Some("/tmp/env.json")),
                (ENV_CACHE_TTL, Some("90")),
                (ENV_CACHE_DISABLE, None),
                (ENV_REFRESH, Some("1")),
            ],
            || {
                let options = CacheOptions::from_env();
                assert_eq!(options.path.as_deref(), Some("/tmp/env.json"));
                assert_eq!(options.ttl.as_deref(), Some("90"));
                assert_eq!(options.disable, None);
                assert_eq!(options.refresh.as_deref(), Some("1"));
            },
        );
    }
}
