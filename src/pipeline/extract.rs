use serde_json::Value;
use tracing::debug;

use crate::constants::{MIN_SCAN_TEXT_LEN, NO_VALID_RESPONSE, SCAN_IGNORED_KEYS};

/// A single strategy for locating answer text in a pipeline reply
pub trait ReplyExtractor: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self, body: &Value) -> Option<String>;
}

/// Looks up one JSON pointer.
///
/// Accepts a non-blank string, or an object whose `text` field is one.
#[derive(Debug, Clone)]
pub struct PointerExtractor {
    pointer: String,
}

impl PointerExtractor {
    pub fn new(pointer: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
        }
    }
}

impl ReplyExtractor for PointerExtractor {
    fn name(&self) -> &str {
        &self.pointer
    }

    fn extract(&self, body: &Value) -> Option<String> {
        match body.pointer(&self.pointer)? {
            Value::String(text) => non_blank(text),
            Value::Object(fields) => fields.get("text").and_then(Value::as_str).and_then(non_blank),
            _ => None,
        }
    }
}

/// Last resort: the first string longer than `min_len` in document order
#[derive(Debug, Clone)]
pub struct StringScanExtractor {
    min_len: usize,
    ignored_keys: &'static [&'static str],
}

impl StringScanExtractor {
    pub fn new(min_len: usize) -> Self {
        Self {
            min_len,
            ignored_keys: SCAN_IGNORED_KEYS,
        }
    }

    fn scan(&self, value: &Value) -> Option<String> {
        match value {
            Value::String(text) if text.trim().chars().count() > self.min_len => Some(text.clone()),
            Value::Object(fields) => fields
                .iter()
                .filter(|(key, _)| !self.ignored_keys.contains(&key.as_str()))
                .find_map(|(_, nested)| self.scan(nested)),
            Value::Array(items) => items.iter().find_map(|item| self.scan(item)),
            _ => None,
        }
    }
}

impl Default for StringScanExtractor {
    fn default() -> Self {
        Self::new(MIN_SCAN_TEXT_LEN)
    }
}

impl ReplyExtractor for StringScanExtractor {
    fn name(&self) -> &str {
        "string-scan"
    }

    fn extract(&self, body: &Value) -> Option<String> {
        self.scan(body)
    }
}

/// Ordered extractor strategies; first match wins
pub struct ExtractorChain {
    extractors: Vec<Box<dyn ReplyExtractor>>,
    fallback: String,
}

impl ExtractorChain {
    pub fn new(extractors: Vec<Box<dyn ReplyExtractor>>) -> Self {
        Self {
            extractors,
            fallback: NO_VALID_RESPONSE.to_string(),
        }
    }

    /// Native run-API shape first, then common flat fields, then a scan
    pub fn standard() -> Self {
        let pointers = [
            "/outputs/0/outputs/0/results/message/text",
            "/outputs/0/outputs/0/results/message/data/text",
            "/outputs/0/outputs/0/artifacts/message",
            "/outputs/0/outputs/0/messages/0/message",
            "/data/text",
            "/output",
            "/response",
            "/message",
        ];

        let mut extractors: Vec<Box<dyn ReplyExtractor>> = pointers
            .iter()
            .map(|p| Box::new(PointerExtractor::new(*p)) as Box<dyn ReplyExtractor>)
            .collect();
        extractors.push(Box::new(StringScanExtractor::default()));

        Self::new(extractors)
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    pub fn extract(&self, body: &Value) -> Option<String> {
        self.extractors.iter().find_map(|extractor| {
            let text = extractor.extract(body)?;
            debug!(strategy = extractor.name(), "reply text located");
            Some(text)
        })
    }

    /// Never fails: unknown reply shapes degrade to the fallback text
    pub fn extract_or_fallback(&self, body: &Value) -> String {
        self.extract(body).unwrap_or_else(|| {
            debug!("no extractor matched the pipeline reply");
            self.fallback.clone()
        })
    }
}

impl std::fmt::Debug for ExtractorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorChain")
            .field("extractors", &self.names())
            .field("fallback", &self.fallback)
            .finish()
    }
}

fn non_blank(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn native_reply(text: &str) -> Value {
        json!({
            "session_id": "4f1c0c7e-0000-4000-8000-000000000000",
            "outputs": [{
                "inputs": {"input_value": "question"},
                "outputs": [{
                    "results": {
                        "message": {
                            "text": text,
                            "sender": "Machine",
                            "sender_name": "AI Assistant",
                            "session_id": "4f1c0c7e-0000-4000-8000-000000000000"
                        }
                    },
                    "artifacts": {"message": text}
                }]
            }]
        })
    }

    #[test]
    fn test_native_shape() {
        let chain = ExtractorChain::standard();
        assert_eq!(chain.extract_or_fallback(&native_reply("X")), "X");
    }

    #[test]
    fn test_flat_fields_in_order() {
        let chain = ExtractorChain::standard();
        assert_eq!(chain.extract_or_fallback(&json!({"data": {"text": "from data"}})), "from data");
        assert_eq!(chain.extract_or_fallback(&json!({"output": "o", "response": "r"})), "o");
        assert_eq!(chain.extract_or_fallback(&json!({"response": "r", "message": "m"})), "r");
        assert_eq!(chain.extract_or_fallback(&json!({"message": "m"})), "m");
        assert_eq!(chain.extract_or_fallback(&json!({"message": {"text": "nested"}})), "nested");
    }

    #[test]
    fn test_blank_candidates_are_skipped() {
        let chain = ExtractorChain::standard();
        let body = json!({"output": "   ", "response": "real answer"});
        assert_eq!(chain.extract_or_fallback(&body), "real answer");
    }

    #[test]
    fn test_scan_finds_long_string_but_skips_ids() {
        let chain = ExtractorChain::standard();
        let body = json!({
            "session_id": "4f1c0c7e-0000-4000-8000-000000000000",
            "result": {"short": "ok", "answer": "Pensions can be transferred."}
        });
        assert_eq!(chain.extract_or_fallback(&body), "Pensions can be transferred.");
    }

    #[test]
    fn test_blank_native_answer_never_echoes_the_question() {
        let chain = ExtractorChain::standard();
        let body = json!({
            "outputs": [{
                "inputs": {"input_value": "What is my pension worth today?"},
                "outputs": [{"results": {"message": {"text": ""}}}]
            }]
        });
        assert_eq!(chain.extract_or_fallback(&body), NO_VALID_RESPONSE);
    }

    #[test]
    fn test_scan_respects_document_order() {
        let scan = StringScanExtractor::default();
        let body = json!({"zeta": "first long string here", "alpha": "second long string here"});
        assert_eq!(scan.extract(&body).as_deref(), Some("first long string here"));
    }

    #[test]
    fn test_scan_threshold_is_exclusive() {
        let scan = StringScanExtractor::new(5);
        assert_eq!(scan.extract(&json!({"a": "12345"})), None);
        assert_eq!(scan.extract(&json!({"a": "123456"})).as_deref(), Some("123456"));
    }

    #[test]
    fn test_unrecognized_shape_falls_back() {
        let chain = ExtractorChain::standard();
        assert_eq!(chain.extract_or_fallback(&json!({"foo": 1})), NO_VALID_RESPONSE);
        assert_eq!(chain.extract_or_fallback(&json!([])), NO_VALID_RESPONSE);
        assert_eq!(chain.extract_or_fallback(&json!(null)), NO_VALID_RESPONSE);
    }

    #[test]
    fn test_custom_fallback() {
        let chain = ExtractorChain::new(vec![]).with_fallback("nothing");
        assert_eq!(chain.extract_or_fallback(&native_reply("X")), "nothing");
    }
}
