use core::fmt::{Debug, Display};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "solo.toml";
pub const ENV_PREFIX: &str = "SOLO_";
/// Upper bound for [`Config::event_buffer`].
pub const MAX_EVENT_BUFFER: usize = 1 << 16;

#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Without a database the portal runs in demo mode.
    #[serde(default)]
    pub database_url: Option<String>,
    /// Grid size used until `max_slots` is stored in the config table.
    #[serde(default = "default_max_slots")]
    pub default_max_slots: i32,
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: u64,
    /// Offset applied to timestamps in the CSV export.
    #[serde(default)]
    pub export_utc_offset_minutes: i32,
    /// Change events buffered per subscriber before it has to resync.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

const fn default_listen() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 3000))
}

const fn default_max_slots() -> i32 {
    50
}

const fn default_session_ttl_minutes() -> u64 {
    12 * 60
}

const fn default_event_buffer() -> usize {
    256
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            database_url: None,
            default_max_slots: default_max_slots(),
            session_ttl_minutes: default_session_ttl_minutes(),
            export_utc_offset_minutes: 0,
            event_buffer: default_event_buffer(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Clamped to `1..=MAX_EVENT_BUFFER`.
    #[must_use]
    pub fn event_buffer(&self) -> usize {
        self.event_buffer.clamp(1, MAX_EVENT_BUFFER)
    }
}

// the database url carries credentials
impl Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("listen", &self.listen)
            .field("database_url", &self.database_url().map(|_| "<redacted>"))
            .field("default_max_slots", &self.default_max_slots)
            .field("session_ttl_minutes", &self.session_ttl_minutes)
            .field("export_utc_offset_minutes", &self.export_utc_offset_minutes)
            .field("event_buffer", &self.event_buffer)
            .finish()
    }
}

#[derive(thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Figment(#[from] figment::Error),
}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

#[must_use]
pub fn figment() -> Figment {
    Figment::new()
        .merge(Toml::file(CONFIG_FILE))
        .merge(Env::prefixed(ENV_PREFIX))
}

pub fn get_config() -> Result<Config, ConfigError> {
    Ok(figment().extract()?)
}
