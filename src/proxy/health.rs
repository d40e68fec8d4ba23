use std::time::Duration;

use super::server::HealthResponse;
use crate::constants::{HEALTH_STATUS, REACHABILITY_TIMEOUT_MS};

/// Check if a chat proxy is answering its health endpoint at `base_url`
pub async fn is_proxy_running(base_url: &str) -> bool {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(REACHABILITY_TIMEOUT_MS))
        .build();

    let Ok(client) = client else {
        return false;
    };

    let url = format!("{}/health", base_url.trim_end_matches('/'));
    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => resp
            .json::<HealthResponse>()
            .await
            .map(|health| health.status == HEALTH_STATUS)
            .unwrap_or(false),
        _ => false,
    }
}
