use std::env;
use std::time::Duration;

use lightctl_core::DEFAULT_PLUGIN_ID;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub plugin_id: String,
    pub request_timeout_ms: u64,
    /// Delay before the one unsolicited status query after startup.
    pub startup_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            api_key: None,
            plugin_id: DEFAULT_PLUGIN_ID.to_string(),
            request_timeout_ms: 10_000,
            startup_delay_ms: 1_500,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let mut cfg = ClientConfig::default();

        if let Ok(v) = env::var("LIGHTCTL_BASE_URL") {
            if !v.is_empty() {
                cfg.base_url = v;
            }
        }
        if let Ok(v) = env::var("LIGHTCTL_API_KEY") {
            if !v.is_empty() {
                cfg.api_key = Some(v);
            }
        }
        if let Ok(v) = env::var("LIGHTCTL_PLUGIN_ID") {
            if !v.is_empty() {
                cfg.plugin_id = v;
            }
        }
        if let Ok(v) = env::var("LIGHTCTL_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = v.parse::<u64>() {
                cfg.request_timeout_ms = ms;
            }
        }
        if let Ok(v) = env::var("LIGHTCTL_STARTUP_DELAY_MS") {
            if let Ok(ms) = v.parse::<u64>() {
                cfg.startup_delay_ms = ms;
            }
        }

        cfg
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
}
