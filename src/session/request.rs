use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::utils::ProxyError;

/// What to do when a request arrives without a session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPolicy {
    /// Start a fresh conversation under a new random identifier
    #[default]
    Generate,
    /// Refuse the request
    Reject,
}

/// A validated `/predict` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictInput {
    pub query: String,
    pub session_id: String,
}

impl PredictInput {
    pub fn new(query: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            session_id: session_id.into(),
        }
    }
}

/// Generate a new opaque session identifier
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Normalize a raw JSON request body into a query/session pair
pub fn decode_request(raw: &Value, policy: SessionPolicy) -> Result<PredictInput, ProxyError> {
    let fields = raw
        .as_object()
        .ok_or_else(|| ProxyError::InvalidRequest("malformed request body".to_string()))?;

    let query = fields
        .get("query")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if query.is_empty() {
        return Err(ProxyError::InvalidRequest("empty query".to_string()));
    }

    // Blank ids count as missing; anything else is forwarded verbatim
    let supplied = fields
        .get("session_id")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty());

    let session_id = match (supplied, policy) {
        (Some(id), _) => id.to_string(),
        (None, SessionPolicy::Generate) => new_session_id(),
        (None, SessionPolicy::Reject) => {
            return Err(ProxyError::InvalidRequest("missing session".to_string()))
        }
    };

    Ok(PredictInput::new(query, session_id))
}
