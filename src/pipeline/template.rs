use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::utils::ProxyError;

/// Component configuration shipped with the binary
const BUILTIN_TEMPLATE: &str = include_str!("../../assets/default_tweaks.json");

/// Immutable master copy of the pipeline component configuration.
///
/// Maps a component id (for example `ChatInput-8fGO2`) to its parameter
/// block. Cloning the template is cheap and shares the same master; every
/// request works on [`ComponentTemplate::instantiate`] instead.
#[derive(Debug, Clone)]
pub struct ComponentTemplate {
    components: Arc<Map<String, Value>>,
}

impl ComponentTemplate {
    /// Template bundled in `assets/default_tweaks.json`
    pub fn builtin() -> Result<Self, ProxyError> {
        let value: Value = serde_json::from_str(BUILTIN_TEMPLATE)
            .map_err(|e| ProxyError::ConfigError(format!("bundled template: {}", e)))?;
        Self::from_value(value)
    }

    /// Load a template from a JSON file
    pub fn from_path(path: &Path) -> Result<Self, ProxyError> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content).map_err(|e| {
            ProxyError::ConfigError(format!("template {}: {}", path.display(), e))
        })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ProxyError> {
        let Value::Object(components) = value else {
            return Err(ProxyError::ConfigError(
                "template must be a JSON object of component blocks".to_string(),
            ));
        };
        if components.is_empty() {
            return Err(ProxyError::ConfigError("template has no components".to_string()));
        }
        if let Some((name, _)) = components.iter().find(|(_, block)| !block.is_object()) {
            return Err(ProxyError::ConfigError(format!(
                "component '{}' must be a JSON object",
                name
            )));
        }

        Ok(Self {
            components: Arc::new(components),
        })
    }

    /// Independent deep copy for one request
    pub fn instantiate(&self) -> Map<String, Value> {
        self.components.as_ref().clone()
    }

    pub fn get(&self, component: &str) -> Option<&Map<String, Value>> {
        self.components.get(component).and_then(Value::as_object)
    }

    pub fn contains(&self, component: &str) -> bool {
        self.components.contains_key(component)
    }

    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
