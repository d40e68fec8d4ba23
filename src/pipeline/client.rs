use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::payload::RunPayload;
use crate::app::PipelineConfig;
use crate::constants::{API_KEY_HEADER, ERROR_EXCERPT_CHARS, REACHABILITY_TIMEOUT_MS, RUN_API_PATH};
use crate::utils::ProxyError;

/// Remote pipeline execution endpoint
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Execute the pipeline once and return the raw JSON reply
    async fn run(&self, payload: &RunPayload) -> Result<Value, ProxyError>;

    /// Whether the pipeline host answers HTTP at all
    async fn is_reachable(&self) -> bool;

    /// Human-readable target, used in logs
    fn describe(&self) -> String;
}

/// HTTP client for `POST {base_url}/api/v1/run/{endpoint}`
pub struct RemotePipeline {
    client: Client,
    base_url: String,
    run_url: String,
    api_key: Option<String>,
}

impl RemotePipeline {
    pub fn new(
        base_url: &str,
        endpoint: &str,
        timeout: Duration,
        api_key: Option<String>,
    ) -> Result<Self, ProxyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProxyError::ConfigError(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            run_url: run_url(base_url, endpoint),
            api_key,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, ProxyError> {
        Self::new(
            &config.base_url,
            &config.endpoint,
            config.timeout(),
            config.api_key.clone(),
        )
    }

    pub fn run_url(&self) -> &str {
        &self.run_url
    }
}

#[async_trait]
impl Pipeline for RemotePipeline {
    async fn run(&self, payload: &RunPayload) -> Result<Value, ProxyError> {
        let mut request = self.client.post(&self.run_url).json(payload);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProxyError::UpstreamError(
                status.as_u16(),
                excerpt(&body, ERROR_EXCERPT_CHARS),
            ));
        }

        let bytes = response.bytes().await.map_err(classify_transport_error)?;
        serde_json::from_slice(&bytes).map_err(|e| ProxyError::MalformedResponse(e.to_string()))
    }

    async fn is_reachable(&self) -> bool {
        // Any HTTP answer counts; only transport failures mean unreachable
        self.client
            .get(&self.base_url)
            .timeout(Duration::from_millis(REACHABILITY_TIMEOUT_MS))
            .send()
            .await
            .is_ok()
    }

    fn describe(&self) -> String {
        self.run_url.clone()
    }
}

/// Join base URL and endpoint name into the run URL
pub fn run_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}{}/{}",
        base_url.trim_end_matches('/'),
        RUN_API_PATH,
        endpoint.trim_matches('/')
    )
}

fn classify_transport_error(err: reqwest::Error) -> ProxyError {
    if err.is_timeout() {
        ProxyError::UpstreamTimeout
    } else {
        ProxyError::UpstreamUnavailable(err.to_string())
    }
}

fn excerpt(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
