//! Configuration management for livetv
//!
//! Handles config file loading and environment overrides.
//! Config is stored at ~/.config/livetv/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::TimeFormat;

/// Desktop Chrome user agent replayed on every upstream request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36";

/// Public XMLTV feed used for programme lookups
pub const DEFAULT_EPG_URL: &str =
    "https://epgshare01.online/epgshare01/epg_ripper_ALL_SOURCES1.xml.gz";

/// Value of `adult_pw` that unlocks adult channels
const ADULT_UNLOCK: &str = "lol";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site base URL, e.g. https://daddylivehd.sx
    pub base_url: String,
    /// Path of the schedule JSON, appended to the base URL
    pub schedule_path: String,
    /// Path inserted between the signing key host and the channel key
    pub stream_path: String,
    pub user_agent: String,
    /// Freshness window for channel list and schedule
    pub cache_duration_secs: u64,
    /// Per-hop timeout while resolving a stream
    pub hop_timeout_secs: u64,
    /// Timeout for channel list and schedule fetches
    pub feed_timeout_secs: u64,
    pub epg_url: String,
    pub epg_timeout_secs: u64,
    /// Viewer's UTC offset in whole hours
    pub epg_timezone: i32,
    pub dst_enabled: bool,
    pub time_format: TimeFormat,
    /// Adult content opt-in token
    pub adult_pw: Option<String>,
    /// Preferred local player (mpv or vlc)
    pub player: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://daddylivehd.sx".to_string(),
            schedule_path: "/schedule/schedule-generated.json".to_string(),
            stream_path: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_duration_secs: 600,
            hop_timeout_secs: 15,
            feed_timeout_secs: 10,
            epg_url: DEFAULT_EPG_URL.to_string(),
            epg_timeout_secs: 30,
            epg_timezone: 0,
            dst_enabled: false,
            time_format: TimeFormat::TwelveHour,
            adult_pw: None,
            player: None,
        }
    }
}

impl Config {
    /// Get config file path (~/.config/livetv/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("livetv").join("config.toml"))
    }

    /// Load config from the default path, or return defaults if not found.
    /// Environment overrides are applied either way.
    pub fn load() -> Self {
        let config: Self = Self::path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default();
        config.with_env_overrides()
    }

    /// Load config from an explicit file. Unlike [`Config::load`], a missing
    /// or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config.with_env_overrides())
    }

    /// Apply LIVETV_BASE_URL and LIVETV_STREAM_PATH when set
    fn with_env_overrides(mut self) -> Self {
        if let Ok(base) = std::env::var("LIVETV_BASE_URL") {
            self.base_url = base;
        }
        if let Ok(path) = std::env::var("LIVETV_STREAM_PATH") {
            self.stream_path = path;
        }
        self
    }

    /// Base URL without a trailing slash
    pub fn site_base(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    /// Full schedule URL
    pub fn schedule_url(&self) -> String {
        let path = self.schedule_path.trim();
        if path.starts_with('/') {
            format!("{}{}", self.site_base(), path)
        } else {
            format!("{}/{}", self.site_base(), path)
        }
    }

    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_duration_secs)
    }

    pub fn hop_timeout(&self) -> Duration {
        Duration::from_secs(self.hop_timeout_secs)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    pub fn epg_timeout(&self) -> Duration {
        Duration::from_secs(self.epg_timeout_secs)
    }

    /// Effective UTC offset in hours, DST included
    pub fn utc_offset_hours(&self) -> i32 {
        if self.dst_enabled {
            self.epg_timezone + 1
        } else {
            self.epg_timezone
        }
    }

    /// Whether the adult opt-in token is set to the unlock value
    pub fn adult_enabled(&self) -> bool {
        self.adult_pw.as_deref().map(str::trim) == Some(ADULT_UNLOCK)
    }
}
