//! Configuration loading, validation, and management for chatloop.
//!
//! Loads configuration from `~/.chatloop/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chatloop_core::{ChatContext, ModelMetadata, ModelMetadataResolver, SliLabels};

const REDACTED: &str = "[REDACTED]";

/// The root configuration structure.
///
/// Maps directly to `~/.chatloop/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the agent gateway lives and how to reach it
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// ReAct loop limits and answer post-processing
    #[serde(default)]
    pub agent: AgentSettings,

    /// Which model the gateway should run
    #[serde(default)]
    pub model_selection: ModelSelectionConfig,

    /// SLI labelling
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_true() -> bool {
    true
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => REDACTED,
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_agent_path")]
    pub agent_path: String,

    /// Whole-request timeout, including the time spent streaming.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Bearer token sent as `Authorization`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Extra static headers added to every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_base_url() -> String {
    "http://localhost:5052".into()
}
fn default_agent_path() -> String {
    "/v2/chat/agent".into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_connect_timeout_secs() -> u64 {
    10
}

impl GatewayConfig {
    /// Full URL of the streaming agent endpoint.
    pub fn agent_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.agent_path.trim_start_matches('/')
        )
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            agent_path: default_agent_path(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            token: None,
            headers: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("agent_path", &self.agent_path)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("token", &redact(&self.token))
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Turns allowed before the loop gives up.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Retryable gateway errors tolerated per execution.
    #[serde(default = "default_max_retry_step_forward")]
    pub max_retry_step_forward: u32,

    /// Time-to-first-token target for the apdex SLI.
    #[serde(default = "default_first_token_apdex_threshold_ms")]
    pub first_token_apdex_threshold_ms: u64,

    /// Include tool input and thought in dispatch logs.
    #[serde(default)]
    pub expanded_logging: bool,

    #[serde(default = "default_unavailable_resources")]
    pub unavailable_resources: Vec<String>,

    /// Neutralise links to non-allow-listed hosts in final answers.
    #[serde(default = "default_true")]
    pub sanitize_final_answer: bool,

    #[serde(default = "default_allowed_link_hosts")]
    pub allowed_link_hosts: Vec<String>,
}

fn default_max_iterations() -> usize {
    10
}
fn default_max_retry_step_forward() -> u32 {
    2
}
fn default_first_token_apdex_threshold_ms() -> u64 {
    5000
}
fn default_unavailable_resources() -> Vec<String> {
    vec!["Pipelines".into(), "Vulnerabilities".into()]
}
fn default_allowed_link_hosts() -> Vec<String> {
    vec!["docs.gitlab.com".into()]
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_retry_step_forward: default_max_retry_step_forward(),
            first_token_apdex_threshold_ms: default_first_token_apdex_threshold_ms(),
            expanded_logging: false,
            unavailable_resources: default_unavailable_resources(),
            sanitize_final_answer: true,
            allowed_link_hosts: default_allowed_link_hosts(),
        }
    }
}

/// Model selection, resolved per request.
///
/// Precedence: self-hosted model, then the root namespace's feature
/// setting, then Amazon Q when ready, then the gateway default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSelectionConfig {
    #[serde(default = "default_feature_setting")]
    pub feature_setting: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_hosted: Option<SelfHostedModelConfig>,

    /// Keyed by root namespace path.
    #[serde(default)]
    pub namespaces: HashMap<String, NamespaceModelConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amazon_q: Option<AmazonQConfig>,
}

fn default_feature_setting() -> String {
    "duo_chat".into()
}

impl Default for ModelSelectionConfig {
    fn default() -> Self {
        Self {
            feature_setting: default_feature_setting(),
            self_hosted: None,
            namespaces: HashMap::new(),
            amazon_q: None,
        }
    }
}

impl ModelMetadataResolver for ModelSelectionConfig {
    fn resolve(&self, context: &ChatContext) -> Option<ModelMetadata> {
        if let Some(model) = &self.self_hosted {
            return Some(ModelMetadata::SelfHosted {
                api_key: model.api_key.clone(),
                endpoint: model.endpoint.clone(),
                name: model.name.clone(),
                provider: model.provider.clone(),
                identifier: model.identifier.clone(),
            });
        }

        if let Some(namespace) = &context.root_namespace {
            let identifier = self
                .namespaces
                .get(namespace)
                .and_then(|setting| setting.offered_model_ref.clone());
            return Some(ModelMetadata::namespace(identifier, &self.feature_setting));
        }

        match &self.amazon_q {
            Some(q) if q.ready => Some(ModelMetadata::amazon_q(&q.role_arn)),
            _ => None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SelfHostedModelConfig {
    pub endpoint: String,
    pub name: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for SelfHostedModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfHostedModelConfig")
            .field("endpoint", &self.endpoint)
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("identifier", &self.identifier)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamespaceModelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offered_model_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmazonQConfig {
    #[serde(default)]
    pub ready: bool,
    pub role_arn: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_feature_category")]
    pub feature_category: String,

    #[serde(default = "default_service_class")]
    pub service_class: String,
}

fn default_feature_category() -> String {
    "duo_chat".into()
}
fn default_service_class() -> String {
    "Gitlab::Llm::Completions::Chat".into()
}

impl TelemetryConfig {
    pub fn sli_labels(&self) -> SliLabels {
        SliLabels {
            feature_category: self.feature_category.clone(),
            service_class: self.service_class.clone(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            feature_category: default_feature_category(),
            service_class: default_service_class(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location with env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `CHATLOOP_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CHATLOOP_GATEWAY_URL") {
            self.gateway.base_url = url;
        }

        if let Some(token) = lookup("CHATLOOP_GATEWAY_TOKEN") {
            self.gateway.token = Some(token);
        }

        if let Some(raw) = lookup("CHATLOOP_MAX_ITERATIONS") {
            self.agent.max_iterations = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "CHATLOOP_MAX_ITERATIONS must be a positive integer, got {raw:?}"
                ))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".chatloop")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.gateway.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.timeout_secs must be at least 1".into(),
            ));
        }

        if self.gateway.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "gateway.base_url must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// A copy with every secret replaced, safe to print.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.gateway.token.is_some() {
            config.gateway.token = Some(REDACTED.into());
        }
        for value in config.gateway.headers.values_mut() {
            *value = REDACTED.into();
        }
        if let Some(model) = config.model_selection.self_hosted.as_mut() {
            if model.api_key.is_some() {
                model.api_key = Some(REDACTED.into());
            }
        }
        config
    }

    /// Render the configuration as TOML, secrets redacted.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(&self.redacted())
            .map_err(|e| ConfigError::SerializeError(e.to_string()))
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Failed to render configuration: {0}")]
    SerializeError(String),
}
