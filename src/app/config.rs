use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    DEFAULT_HOST, DEFAULT_MAX_BODY_BYTES, DEFAULT_PIPELINE_ENDPOINT, DEFAULT_PIPELINE_URL,
    DEFAULT_PORT, DEFAULT_UPSTREAM_TIMEOUT_SECS, MAX_UPSTREAM_TIMEOUT_SECS,
    MIN_UPSTREAM_TIMEOUT_SECS,
};
use crate::pipeline::Binding;
use crate::session::SessionPolicy;

const APP_NAME: &str = "chat-relay";
const ENV_PREFIX: &str = "CHAT_RELAY_";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Inbound HTTP server
    #[serde(default)]
    pub server: ServerConfig,

    /// Remote pipeline endpoint
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Session handling
    #[serde(default)]
    pub session: SessionConfig,

    /// Template field bindings; the standard table is used when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<Binding>,
}

/// Inbound HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: vec![],
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Address a local client should use to reach this server
    pub fn local_url(&self) -> String {
        let host = match self.host.as_str() {
            "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
            other => other,
        };
        format!("http://{}:{}", host, self.port)
    }
}

/// Remote pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Base URL of the pipeline server
    pub base_url: String,
    /// Flow name or id appended to `/api/v1/run/`
    pub endpoint: String,
    /// Outbound timeout, clamped to 90..=300 seconds
    pub timeout_secs: u64,
    /// Sent as `x-api-key` when set
    pub api_key: Option<String>,
    /// JSON component template; the bundled one is used when unset
    pub template_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PIPELINE_URL.to_string(),
            endpoint: DEFAULT_PIPELINE_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
            api_key: None,
            template_path: None,
        }
    }
}

impl PipelineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(
            self.timeout_secs
                .clamp(MIN_UPSTREAM_TIMEOUT_SECS, MAX_UPSTREAM_TIMEOUT_SECS),
        )
    }
}

/// Session handling configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// `generate` or `reject` when a request carries no session id
    pub policy: SessionPolicy,
}

/// Load configuration from multiple sources
///
/// Later sources win: defaults, global file, `.chat-relay/config.toml`,
/// the explicit `--config` file, then `CHAT_RELAY_*` variables
/// (`__` separates nested keys, e.g. `CHAT_RELAY_PIPELINE__BASE_URL`).
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let global = get_config_dir().map(|dir| dir.join("config.toml"));
    let local = PathBuf::from(".chat-relay/config.toml");

    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
    }

    build_figment(global.as_deref(), &local, explicit)
        .extract()
        .context("Failed to load configuration")
}

fn build_figment(global: Option<&Path>, local: &Path, explicit: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Some(global) = global.filter(|p| p.exists()) {
        figment = figment.merge(Toml::file(global));
    }

    if local.exists() {
        figment = figment.merge(Toml::file(local));
    }

    if let Some(explicit) = explicit {
        figment = figment.merge(Toml::file(explicit));
    }

    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Get the configuration directory
pub fn get_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Save configuration to file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file, returning where it lives
pub fn init_config(path: Option<PathBuf>, force: bool) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p,
        None => get_config_dir()
            .context("Could not determine config directory")?
            .join("config.toml"),
    };

    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    save_config(&Config::default(), &path)?;
    Ok(path)
}
