use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::session::resolve_endpoint;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Address of the hosting page; the socket endpoint is derived from it
    #[serde(default = "default_origin")]
    pub origin: String,
    /// Explicit ws:// or wss:// endpoint, overrides `origin`
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    /// Interval between messages-per-second samples, in milliseconds
    #[serde(default = "default_sample_interval")]
    pub sample_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_sample_interval() -> u64 {
    1000 // 1 second
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("session.origin", default_origin())?
            .set_default("api.enabled", default_enabled())?
            .set_default("api.host", default_host())?
            .set_default("api.port", i64::from(default_port()))?
            .set_default("stats.sample_interval_ms", default_sample_interval() as i64)?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", "pretty")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // STREAM_MONITOR__SESSION__ORIGIN, STREAM_MONITOR__API__PORT, etc.
            .add_source(
                Environment::with_prefix("STREAM_MONITOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Socket endpoint: the explicit url if set, otherwise derived from the origin
    pub fn endpoint(&self) -> crate::error::Result<String> {
        match self.session.url.as_deref() {
            Some(url) => resolve_endpoint(url),
            None => resolve_endpoint(&self.session.origin),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            url: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
