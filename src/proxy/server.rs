use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::service::{PredictOutcome, PredictResponse, SessionProxy};
use crate::app::{Config, ServerConfig};
use crate::constants::{HEALTH_STATUS, SERVICE_NAME};
use crate::utils::ProxyError;

/// Shared handler state; everything behind it is read-only
#[derive(Clone)]
pub struct AppState {
    proxy: Arc<SessionProxy>,
    server: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(proxy: SessionProxy, server: ServerConfig) -> Self {
        Self {
            proxy: Arc::new(proxy),
            server: Arc::new(server),
        }
    }

    pub fn proxy(&self) -> &SessionProxy {
        &self.proxy
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

impl HealthResponse {
    pub fn ready() -> Self {
        Self {
            status: HEALTH_STATUS.to_string(),
            service: SERVICE_NAME.to_string(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.server.cors_origins));

    Router::new()
        .route("/predict", post(predict_handler))
        .route("/health", get(health_handler))
        .layer(middleware)
        .layer(DefaultBodyLimit::max(state.server.max_body_bytes))
        .with_state(state)
}

/// Bind, serve, and stop cleanly on Ctrl-C
pub async fn serve(config: Config) -> Result<()> {
    let proxy = SessionProxy::from_config(&config).context("Failed to initialise session proxy")?;
    info!(
        pipeline = %proxy.pipeline().describe(),
        components = proxy.template().len(),
        bindings = proxy.bindings().len(),
        policy = ?proxy.policy(),
        "session proxy ready"
    );

    let addr = config.server.bind_address();
    let app = build_router(AppState::new(proxy, config.server));
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

async fn predict_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> (StatusCode, Json<PredictResponse>) {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return reject_body(&rejection),
    };

    let outcome = match serde_json::from_slice::<Value>(&body) {
        Ok(raw) => state.proxy().respond(&raw).await,
        Err(err) => {
            warn!(error = %err, "predict body is not valid JSON");
            PredictOutcome::from_error(&ProxyError::InvalidRequest(
                "malformed request body".to_string(),
            ))
        }
    };
    (outcome.status, Json(outcome.body))
}

/// Body-level failures keep the `{response}` shape and the rejection's status
fn reject_body(rejection: &BytesRejection) -> (StatusCode, Json<PredictResponse>) {
    let status = rejection.status();
    warn!(%status, error = %rejection.body_text(), "predict body rejected");

    let reason = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "request body too large"
    } else {
        "unreadable request body"
    };
    let outcome = PredictOutcome::from_error(&ProxyError::InvalidRequest(reason.to_string()));
    (status, Json(outcome.body))
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ready())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
