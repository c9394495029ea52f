//! Application configuration. Bot token, paths, HTTP bind address.

use serde::Deserialize;

/// Default capacity for the inbound event channel. Bounded channel provides
/// backpressure: when full, the poll loop blocks on send().await until the
/// pipeline catches up.
pub const DEFAULT_EVENT_QUEUE_SIZE: usize = 1000;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Telegram bot token. Absent = degraded mode: no polling, no send API.
    /// Read from TG_RELAY_TELEGRAM_TOKEN.
    #[serde(default)]
    pub telegram_token: Option<String>,

    pub data_dir: Option<String>,

    /// HTTP bind host (default 127.0.0.1). Read from TG_RELAY_HTTP_HOST.
    #[serde(default)]
    pub http_host: Option<String>,

    /// HTTP port (default 4000). Read from TG_RELAY_HTTP_PORT or plain PORT.
    #[serde(default)]
    pub http_port: Option<u16>,

    /// getUpdates long-poll window in seconds (default 30). Read from
    /// TG_RELAY_POLL_TIMEOUT_SECS.
    #[serde(default)]
    pub poll_timeout_secs: Option<u64>,

    /// Max inbound events buffered between poll loop and pipeline
    /// (backpressure). Read from TG_RELAY_EVENT_QUEUE_SIZE.
    #[serde(default)]
    pub event_queue_size: Option<usize>,

    /// Allowed CORS origin for the dashboard (default: any). Read from
    /// TG_RELAY_CORS_ORIGIN.
    #[serde(default)]
    pub cors_origin: Option<String>,
}

impl AppConfig {
    /// Build from environment (TG_RELAY_ prefix) and optional config file.
    /// The caller loads .env first; this reads the process environment only.
    pub fn load() -> Result<Self, config::ConfigError> {
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("TG_RELAY"));
        if let Ok(path) = std::env::var("TG_RELAY_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        let mut cfg: Self = c.build()?.try_deserialize()?;
        // PORT is read directly (no TG_RELAY_ prefix) so hosting platforms
        // that inject PORT keep working.
        if cfg.http_port.is_none() {
            if let Ok(s) = std::env::var("PORT") {
                if let Ok(p) = s.parse::<u16>() {
                    cfg.http_port = Some(p);
                }
            }
        }
        Ok(cfg)
    }

    /// Returns the bot token if configured and non-empty.
    pub fn telegram_token(&self) -> Option<&str> {
        self.telegram_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Returns true if the Telegram integration can start.
    pub fn is_telegram_configured(&self) -> bool {
        self.telegram_token().is_some()
    }

    pub fn data_dir_or_default(&self) -> &str {
        self.data_dir.as_deref().unwrap_or("./data")
    }

    pub fn http_host_or_default(&self) -> &str {
        self.http_host.as_deref().unwrap_or("127.0.0.1")
    }

    pub fn http_port_or_default(&self) -> u16 {
        self.http_port.unwrap_or(4000)
    }

    pub fn poll_timeout_secs_or_default(&self) -> u64 {
        self.poll_timeout_secs.unwrap_or(30)
    }

    pub fn event_queue_size_or_default(&self) -> usize {
        self.event_queue_size.unwrap_or(DEFAULT_EVENT_QUEUE_SIZE)
    }
}
