use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::bindings::BindingTable;
use super::template::ComponentTemplate;
use crate::session::PredictInput;
use crate::utils::ProxyError;

/// Body of `POST /api/v1/run/{endpoint}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPayload {
    pub output_type: String,
    pub input_type: String,
    pub tweaks: Map<String, Value>,
    /// Mirrors the session bound into the tweaks
    pub session_id: String,
}

impl RunPayload {
    pub fn chat(tweaks: Map<String, Value>, session_id: impl Into<String>) -> Self {
        Self {
            output_type: "chat".to_string(),
            input_type: "chat".to_string(),
            tweaks,
            session_id: session_id.into(),
        }
    }
}

/// Build the outbound payload for one request from a fresh template copy
pub fn build_payload(
    template: &ComponentTemplate,
    bindings: &BindingTable,
    input: &PredictInput,
) -> Result<RunPayload, ProxyError> {
    let mut tweaks = template.instantiate();
    bindings.apply(&mut tweaks, input)?;
    Ok(RunPayload::chat(tweaks, input.session_id.clone()))
}
