use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::app::Config;
use crate::pipeline::{
    build_payload, BindingTable, ComponentTemplate, ExtractorChain, Pipeline, RemotePipeline,
};
use crate::session::{decode_request, PredictInput, SessionPolicy};
use crate::utils::ProxyError;

/// Client-facing body of `/predict`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub response: String,
}

/// Encoded result of one `/predict` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictOutcome {
    pub status: StatusCode,
    pub body: PredictResponse,
}

impl PredictOutcome {
    pub fn ok(response: String) -> Self {
        Self {
            status: StatusCode::OK,
            body: PredictResponse { response },
        }
    }

    /// Errors become readable chat text. Only bad input changes the status;
    /// upstream trouble is still a 200 so the client renders it as a reply.
    pub fn from_error(err: &ProxyError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::OK
        };
        Self {
            status,
            body: PredictResponse {
                response: err.user_message(),
            },
        }
    }
}

/// Stateless relay between chat clients and the remote pipeline
pub struct SessionProxy {
    template: ComponentTemplate,
    bindings: BindingTable,
    extractors: ExtractorChain,
    pipeline: Arc<dyn Pipeline>,
    policy: SessionPolicy,
}

impl SessionProxy {
    /// Fails when the bindings do not fit the template
    pub fn new(
        template: ComponentTemplate,
        bindings: BindingTable,
        extractors: ExtractorChain,
        pipeline: Arc<dyn Pipeline>,
        policy: SessionPolicy,
    ) -> Result<Self, ProxyError> {
        bindings.validate(&template)?;
        Ok(Self {
            template,
            bindings,
            extractors,
            pipeline,
            policy,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ProxyError> {
        let template = match &config.pipeline.template_path {
            Some(path) => ComponentTemplate::from_path(path)?,
            None => ComponentTemplate::builtin()?,
        };
        let bindings = if config.bindings.is_empty() {
            BindingTable::standard()
        } else {
            BindingTable::new(config.bindings.clone())
        };
        let pipeline = Arc::new(RemotePipeline::from_config(&config.pipeline)?);

        Self::new(
            template,
            bindings,
            ExtractorChain::standard(),
            pipeline,
            config.session.policy,
        )
    }

    pub fn template(&self) -> &ComponentTemplate {
        &self.template
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Decode a raw request and relay it
    pub async fn predict(&self, raw: &Value) -> Result<String, ProxyError> {
        let input = decode_request(raw, self.policy)?;
        self.forward(&input).await
    }

    /// One outbound call for an already validated request
    pub async fn forward(&self, input: &PredictInput) -> Result<String, ProxyError> {
        let payload = build_payload(&self.template, &self.bindings, input)?;

        debug!(
            session_id = %input.session_id,
            query_chars = input.query.chars().count(),
            "forwarding query to pipeline"
        );
        let started = Instant::now();
        let body = self.pipeline.run(&payload).await?;
        let reply = self.extractors.extract_or_fallback(&body);

        info!(
            session_id = %input.session_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            reply_chars = reply.chars().count(),
            "pipeline replied"
        );
        Ok(reply)
    }

    /// Full request cycle with every failure folded into the response body
    pub async fn respond(&self, raw: &Value) -> PredictOutcome {
        let input = match decode_request(raw, self.policy) {
            Ok(input) => input,
            Err(err) => {
                warn!(error = %err, "rejected predict request");
                return PredictOutcome::from_error(&err);
            }
        };

        match self.forward(&input).await {
            Ok(reply) => PredictOutcome::ok(reply),
            Err(err) => {
                error!(session_id = %input.session_id, error = %err, "session request failed");
                PredictOutcome::from_error(&err)
            }
        }
    }
}

impl std::fmt::Debug for SessionProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionProxy")
            .field("components", &self.template.len())
            .field("bindings", &self.bindings.len())
            .field("pipeline", &self.pipeline.describe())
            .field("policy", &self.policy)
            .finish()
    }
}
