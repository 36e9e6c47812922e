//! Gateway client: one shared HTTP connection pool, one `StepExecutor`
//! per execution.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use tracing::info;

use chatloop_config::GatewayConfig;
use chatloop_core::TransportError;

use crate::executor::StepExecutor;

#[derive(Clone)]
pub struct GatewayClient {
    client: reqwest::Client,
    url: String,
}

impl GatewayClient {
    /// Build a client from gateway settings.
    ///
    /// Timeouts, the bearer token and static headers are baked into the
    /// underlying `reqwest::Client`.
    pub fn new(config: &GatewayConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| TransportError::Request(format!("invalid gateway token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Request(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Request(format!("invalid value for {name}: {e}")))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let url = config.agent_url();
        info!(url = %url, timeout_secs = config.timeout_secs, "Gateway client ready");

        Ok(Self { client, url })
    }

    /// A fresh executor with an empty scratchpad.
    pub fn step_executor(&self) -> StepExecutor {
        StepExecutor::new(self.client.clone(), self.url.clone())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}
