/// Constants module to avoid magic numbers in the codebase

// Network Configuration
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 7898;
pub const DEFAULT_PIPELINE_URL: &str = "http://localhost:7860";
pub const DEFAULT_PIPELINE_ENDPOINT: &str = "dxr-rag-godiva";
pub const RUN_API_PATH: &str = "/api/v1/run";
pub const API_KEY_HEADER: &str = "x-api-key";

// Timeouts
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 90;
pub const MIN_UPSTREAM_TIMEOUT_SECS: u64 = 90;
pub const MAX_UPSTREAM_TIMEOUT_SECS: u64 = 300;
pub const REACHABILITY_TIMEOUT_MS: u64 = 2000;

// Transport guard only; queries themselves are not length-checked
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

// Session-scoped memory on the pipeline side
pub const MEMORY_KEY_PREFIX: &str = "godiva:";
pub const MEMORY_TTL_SECS: u64 = 172_800; // 48 hours

// Default component ids in the bundled template
pub const CHAT_INPUT_COMPONENT: &str = "ChatInput-8fGO2";
pub const MEMORY_WINDOW_COMPONENT: &str = "Memory-3Qm7y";
pub const MEMORY_STORE_COMPONENT: &str = "RedisChatMemory-03Kf3";
pub const CHAT_OUTPUT_COMPONENT: &str = "ChatOutput-TR3Kc";
pub const STORE_MESSAGE_COMPONENTS: &[&str] = &["StoreMessage-MfcnZ", "StoreMessage-ar6CI"];

// Reply extraction
pub const NO_VALID_RESPONSE: &str = "No valid response found.";
pub const MIN_SCAN_TEXT_LEN: usize = 10;
pub const ERROR_EXCERPT_CHARS: usize = 200;

/// Keys whose string values are never treated as answer text when scanning
pub const SCAN_IGNORED_KEYS: &[&str] = &[
    "session_id",
    "id",
    "_id",
    "flow_id",
    "run_id",
    "inputs",
    "input_value",
    "component_id",
    "timestamp",
    "type",
    "sender",
    "sender_name",
    "source",
    "icon",
    "background_color",
    "text_color",
    "content_blocks",
    "properties",
];

// Health
pub const HEALTH_STATUS: &str = "ready";
pub const SERVICE_NAME: &str = "chat_api";
