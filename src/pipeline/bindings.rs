use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::template::ComponentTemplate;
use crate::constants::{
    CHAT_INPUT_COMPONENT, CHAT_OUTPUT_COMPONENT, MEMORY_KEY_PREFIX, MEMORY_STORE_COMPONENT,
    MEMORY_TTL_SECS, MEMORY_WINDOW_COMPONENT, STORE_MESSAGE_COMPONENTS,
};
use crate::session::PredictInput;
use crate::utils::ProxyError;

/// Logical role a binding plays in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingRole {
    /// The component that receives the user's question
    UserInput,
    /// Session scoping on the input side
    Session,
    /// Short-term conversation window
    MemoryWindow,
    /// Long-term memory store
    MemoryStore,
    /// Output and message store components
    OutputSink,
}

impl BindingRole {
    pub fn as_str(self) -> &'static str {
        match self {
            BindingRole::UserInput => "user_input",
            BindingRole::Session => "session",
            BindingRole::MemoryWindow => "memory_window",
            BindingRole::MemoryStore => "memory_store",
            BindingRole::OutputSink => "output_sink",
        }
    }
}

/// Where the bound value comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BindSource {
    Query,
    SessionId,
    /// `prefix` followed by the session id
    PrefixedSession { prefix: String },
    Fixed { value: Value },
}

impl BindSource {
    fn resolve(&self, input: &PredictInput) -> Value {
        match self {
            BindSource::Query => Value::String(input.query.clone()),
            BindSource::SessionId => Value::String(input.session_id.clone()),
            BindSource::PrefixedSession { prefix } => {
                Value::String(format!("{}{}", prefix, input.session_id))
            }
            BindSource::Fixed { value } => value.clone(),
        }
    }

    /// True when the bound value changes with the session
    pub fn is_session_scoped(&self) -> bool {
        matches!(
            self,
            BindSource::SessionId | BindSource::PrefixedSession { .. }
        )
    }
}

/// One field of one component that gets overwritten per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub role: BindingRole,
    pub component: String,
    /// Dot-separated field path inside the component block
    pub path: String,
    pub source: BindSource,
}

impl Binding {
    pub fn new(
        role: BindingRole,
        component: impl Into<String>,
        path: impl Into<String>,
        source: BindSource,
    ) -> Self {
        Self {
            role,
            component: component.into(),
            path: path.into(),
            source,
        }
    }

    fn segments(&self) -> Vec<&str> {
        self.path.split('.').filter(|s| !s.is_empty()).collect()
    }

    fn target(&self) -> String {
        format!("{}.{}", self.component, self.path)
    }
}

/// Ordered set of bindings applied in a single pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BindingTable {
    bindings: Vec<Binding>,
}

impl BindingTable {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    /// Bindings for the bundled template
    pub fn standard() -> Self {
        use BindSource::*;
        use BindingRole::*;

        let mut bindings = vec![
            Binding::new(UserInput, CHAT_INPUT_COMPONENT, "input_value", Query),
            Binding::new(Session, CHAT_INPUT_COMPONENT, "session_id", SessionId),
            Binding::new(MemoryWindow, MEMORY_WINDOW_COMPONENT, "session_id", SessionId),
            Binding::new(MemoryStore, MEMORY_STORE_COMPONENT, "session_id", SessionId),
            Binding::new(
                MemoryStore,
                MEMORY_STORE_COMPONENT,
                "key_prefix",
                PrefixedSession {
                    prefix: MEMORY_KEY_PREFIX.to_string(),
                },
            ),
            Binding::new(
                MemoryStore,
                MEMORY_STORE_COMPONENT,
                "ttl",
                Fixed {
                    value: Value::from(MEMORY_TTL_SECS),
                },
            ),
            Binding::new(OutputSink, CHAT_OUTPUT_COMPONENT, "session_id", SessionId),
        ];
        bindings.extend(
            STORE_MESSAGE_COMPONENTS
                .iter()
                .map(|component| Binding::new(OutputSink, *component, "session_id", SessionId)),
        );

        Self { bindings }
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Check the table against a template once, at startup
    pub fn validate(&self, template: &ComponentTemplate) -> Result<(), ProxyError> {
        if !self.bindings.iter().any(|b| b.role == BindingRole::UserInput) {
            return Err(ProxyError::ConfigError(
                "bindings must include a user_input binding".to_string(),
            ));
        }
        if !self.bindings.iter().any(|b| b.source.is_session_scoped()) {
            return Err(ProxyError::ConfigError(
                "bindings must bind the session id somewhere".to_string(),
            ));
        }

        for binding in &self.bindings {
            if binding.segments().is_empty() {
                return Err(ProxyError::ConfigError(format!(
                    "binding on '{}' has an empty field path",
                    binding.component
                )));
            }
            if template.get(&binding.component).is_none() {
                return Err(ProxyError::ConfigError(format!(
                    "binding {} references unknown component '{}'",
                    binding.role.as_str(),
                    binding.component
                )));
            }
        }

        // Dry run catches paths that cross a non-object field
        let probe = PredictInput::new("probe", "probe");
        self.apply(&mut template.instantiate(), &probe)
    }

    /// Write the request's values into a per-request copy of the template
    pub fn apply(
        &self,
        tweaks: &mut Map<String, Value>,
        input: &PredictInput,
    ) -> Result<(), ProxyError> {
        for binding in &self.bindings {
            let block = tweaks
                .get_mut(&binding.component)
                .and_then(Value::as_object_mut)
                .ok_or_else(|| {
                    ProxyError::ConfigError(format!(
                        "component '{}' missing from template",
                        binding.component
                    ))
                })?;

            assign(block, &binding.segments(), binding.source.resolve(input)).map_err(
                |reason| ProxyError::ConfigError(format!("{}: {}", binding.target(), reason)),
            )?;
        }
        Ok(())
    }
}

fn assign(block: &mut Map<String, Value>, segments: &[&str], value: Value) -> Result<(), String> {
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| "empty field path".to_string())?;

    let mut cursor = block;
    for segment in parents {
        cursor = cursor
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| format!("'{}' is not an object", segment))?;
    }
    cursor.insert(last.to_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn builtin() -> ComponentTemplate {
        ComponentTemplate::builtin().unwrap()
    }

    #[test]
    fn test_standard_table_validates_against_builtin() {
        BindingTable::standard().validate(&builtin()).unwrap();
    }

    #[test]
    fn test_apply_binds_query_and_memory_settings() {
        let mut tweaks = builtin().instantiate();
        let input = PredictInput::new("What are ISAs?", "sess-1");
        BindingTable::standard().apply(&mut tweaks, &input).unwrap();

        assert_eq!(tweaks["ChatInput-8fGO2"]["input_value"], json!("What are ISAs?"));
        assert_eq!(tweaks["RedisChatMemory-03Kf3"]["key_prefix"], json!("godiva:sess-1"));
        assert_eq!(tweaks["RedisChatMemory-03Kf3"]["ttl"], json!(172_800));
        // untouched fields survive
        assert_eq!(tweaks["ChatInput-8fGO2"]["sender"], json!("User"));
        assert_eq!(tweaks["RedisChatMemory-03Kf3"]["port"], json!(6380));
    }

    #[test]
    fn test_every_session_field_is_bound() {
        let template = builtin();
        let mut tweaks = template.instantiate();
        let input = PredictInput::new("q", "sess-42");
        BindingTable::standard().apply(&mut tweaks, &input).unwrap();

        let session_blocks: Vec<&String> = tweaks
            .iter()
            .filter(|(_, block)| block.get("session_id").is_some())
            .map(|(name, _)| name)
            .collect();
        assert_eq!(session_blocks.len(), 6);

        for name in session_blocks {
            assert_eq!(
                tweaks[name.as_str()]["session_id"],
                json!("sess-42"),
                "stale session id left in {}",
                name
            );
        }
    }

    #[test]
    fn test_unknown_component_rejected() {
        let table = BindingTable::new(vec![
            Binding::new(BindingRole::UserInput, "ChatInput-8fGO2", "input_value", BindSource::Query),
            Binding::new(BindingRole::Session, "ChatInput-gone", "session_id", BindSource::SessionId),
        ]);
        let err = table.validate(&builtin()).unwrap_err();
        assert!(err.to_string().contains("ChatInput-gone"));
    }

    #[test]
    fn test_table_without_user_input_rejected() {
        let table = BindingTable::new(vec![Binding::new(
            BindingRole::Session,
            "ChatInput-8fGO2",
            "session_id",
            BindSource::SessionId,
        )]);
        assert!(table.validate(&builtin()).is_err());
    }

    #[test]
    fn test_table_without_session_rejected() {
        let table = BindingTable::new(vec![Binding::new(
            BindingRole::UserInput,
            "ChatInput-8fGO2",
            "input_value",
            BindSource::Query,
        )]);
        assert!(table.validate(&builtin()).is_err());
    }

    #[test]
    fn test_nested_path_created_on_demand() {
        let template =
            ComponentTemplate::from_value(json!({"Agent": {"input_value": "", "memory": {}}}))
                .unwrap();
        let table = BindingTable::new(vec![
            Binding::new(BindingRole::UserInput, "Agent", "input_value", BindSource::Query),
            Binding::new(
                BindingRole::MemoryStore,
                "Agent",
                "memory.redis.session",
                BindSource::SessionId,
            ),
        ]);
        table.validate(&template).unwrap();

        let mut tweaks = template.instantiate();
        table.apply(&mut tweaks, &PredictInput::new("hi", "s-9")).unwrap();
        assert_eq!(tweaks["Agent"]["memory"]["redis"]["session"], json!("s-9"));
    }

    #[test]
    fn test_path_through_scalar_rejected() {
        let template =
            ComponentTemplate::from_value(json!({"Agent": {"input_value": "", "memory": "flat"}}))
                .unwrap();
        let table = BindingTable::new(vec![
            Binding::new(BindingRole::UserInput, "Agent", "input_value", BindSource::Query),
            Binding::new(BindingRole::Session, "Agent", "memory.session", BindSource::SessionId),
        ]);
        let err = table.validate(&template).unwrap_err();
        assert!(err.to_string().contains("Agent.memory.session"));
    }

    #[test]
    fn test_binding_deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            bindings: Vec<Binding>,
        }

        let doc: Doc = toml::from_str(
            r#"
            [[bindings]]
            role = "memory_store"
            component = "Redis-1"
            path = "key_prefix"
            source = { kind = "prefixed_session", prefix = "acme:" }

            [[bindings]]
            role = "memory_store"
            component = "Redis-1"
            path = "ttl"
            source = { kind = "fixed", value = 60 }
            "#,
        )
        .unwrap();

        assert_eq!(
            doc.bindings[0].source,
            BindSource::PrefixedSession {
                prefix: "acme:".to_string()
            }
        );
        assert_eq!(doc.bindings[1].source, BindSource::Fixed { value: json!(60) });
    }
}
