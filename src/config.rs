use crate::error::{ResolverError, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory the embedded cache store lives in. If absent the handler
    /// runs cache-less and every request fully resolves.
    pub path: Option<String>,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { path: None, ttl_secs: default_ttl_secs() }
    }
}

fn default_ttl_secs() -> u64 {
    2_592_000 // 30 days
}

#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_batch_sleep_ms")]
    pub batch_sleep_ms: u64,
    #[serde(default = "default_musicbrainz_pace_ms")]
    pub musicbrainz_pace_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            batch_sleep_ms: default_batch_sleep_ms(),
            musicbrainz_pace_ms: default_musicbrainz_pace_ms(),
        }
    }
}

fn default_batch_sleep_ms() -> u64 {
    500
}

fn default_musicbrainz_pace_ms() -> u64 {
    1_100
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { max_retries: default_max_retries(), user_agent: default_user_agent() }
    }
}

fn default_max_retries() -> u32 {
    2
}

fn default_user_agent() -> String {
    "artist-locator/0.1 (+https://example.invalid/contact)".to_string()
}

impl Config {
    /// Loads `config.toml` from the working directory, falling back to
    /// all-default configuration when the file is absent.
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        match fs::read_to_string(config_path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(ResolverError::Config(format!(
                "failed to read config file '{config_path}': {e}"
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
            pacing: PacingConfig::default(),
            http: HttpConfig::default(),
        }
    }
}
