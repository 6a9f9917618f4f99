use async_trait::async_trait;
use lightctl_core::{plugin_api_path, Command, CommandResponse, API_KEY_HEADER};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::GatewayError;

/// Request/response channel to the device-control API.
#[async_trait]
pub trait CommandGateway: Send + Sync {
    async fn send(&self, command: &Command) -> Result<CommandResponse, GatewayError>;
}

/// Gateway speaking the plugin simple API over HTTP.
#[derive(Clone)]
pub struct HttpGateway {
    http: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
        let mut base = Url::parse(&config.base_url)?;
        // Keep any path prefix the host is mounted under
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(plugin_api_path(&config.plugin_id).trim_start_matches('/'))?;
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { http, endpoint, api_key: config.api_key.clone() })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CommandGateway for HttpGateway {
    async fn send(&self, command: &Command) -> Result<CommandResponse, GatewayError> {
        let mut req = self.http.post(self.endpoint.clone()).json(command);
        if let Some(key) = &self.api_key {
            req = req.header(API_KEY_HEADER, key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        debug!(command = command.name(), status = status.as_u16(), len = body.len(), "Command response");

        if !status.is_success() {
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }

        // A 2xx with no body is a valid "nothing to report"
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(CommandResponse::default());
        }
        let value: Value = serde_json::from_slice(&body)?;
        Ok(CommandResponse::from_value(value))
    }
}

fn rejection_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
