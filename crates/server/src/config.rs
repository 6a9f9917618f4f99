use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use lightctl_core::DEFAULT_PLUGIN_ID;

/// G-code the plugin sends for each action. `gcode_on` may carry a `{p}`
/// token that is replaced by the requested PWM value.
#[derive(Debug, Clone)]
pub struct GcodeSettings {
    pub gcode_on: String,
    pub gcode_off: String,
    pub gcode_toggle: String,
    pub status_query: String,
    pub status_parse_token: String,
}

impl Default for GcodeSettings {
    fn default() -> Self {
        Self {
            gcode_on: "M355 S1".to_string(),
            gcode_off: "M355 S0".to_string(),
            gcode_toggle: String::new(),
            status_query: String::new(),
            status_parse_token: String::new(),
        }
    }
}

impl GcodeSettings {
    pub fn from_env() -> Self {
        let mut cfg = GcodeSettings::default();
        // Empty values are meaningful here (they disable toggle/status G-code)
        if let Ok(v) = env::var("LIGHTCTL_GCODE_ON") { cfg.gcode_on = v; }
        if let Ok(v) = env::var("LIGHTCTL_GCODE_OFF") { cfg.gcode_off = v; }
        if let Ok(v) = env::var("LIGHTCTL_GCODE_TOGGLE") { cfg.gcode_toggle = v; }
        if let Ok(v) = env::var("LIGHTCTL_STATUS_QUERY") { cfg.status_query = v; }
        if let Ok(v) = env::var("LIGHTCTL_STATUS_PARSE_TOKEN") { cfg.status_parse_token = v; }
        cfg
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_addr: SocketAddr,
    pub plugin_id: String,
    pub api_key: Option<String>,
    /// Serial device or file G-code is written to; log only when unset.
    pub gcode_output: Option<PathBuf>,
    pub gcode: GcodeSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            plugin_id: DEFAULT_PLUGIN_ID.to_string(),
            api_key: None,
            gcode_output: None,
            gcode: GcodeSettings::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut cfg = ServerConfig::default();

        if let Ok(v) = env::var("LIGHTCTL_HTTP_ADDR") {
            match v.parse::<SocketAddr>() {
                Ok(addr) => cfg.http_addr = addr,
                Err(err) => tracing::warn!(value = %v, %err, "Invalid LIGHTCTL_HTTP_ADDR; using default"),
            }
        }
        if let Ok(v) = env::var("LIGHTCTL_PLUGIN_ID") {
            if !v.is_empty() {
                cfg.plugin_id = v;
            }
        }
        if let Ok(v) = env::var("LIGHTCTL_API_KEY") {
            if !v.is_empty() {
                cfg.api_key = Some(v);
            }
        }
        if let Ok(v) = env::var("LIGHTCTL_GCODE_OUTPUT") {
            if !v.is_empty() {
                cfg.gcode_output = Some(PathBuf::from(v));
            }
        }
        cfg.gcode = GcodeSettings::from_env();

        cfg
    }
}
