//! Configuration loading, validation, and management for Tooloop.
//!
//! Loads configuration from `~/.tooloop/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.tooloop/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language model settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Memory store settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider name ("ollama", "openai", "openrouter", ...)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier passed to the provider
    #[serde(default = "default_model")]
    pub model: String,

    /// Override the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Whether the model can emit structured tool calls.
    /// When false, requests go straight to the single-shot fallback path.
    #[serde(default = "default_true")]
    pub supports_tool_calls: bool,

    /// Upper bound on one model call, in seconds
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "qwen2.5:1.5b".into()
}
fn default_true() -> bool {
    true
}
fn default_model_timeout() -> u64 {
    120
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("supports_tool_calls", &self.supports_tool_calls)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key: None,
            temperature: 0.0,
            max_tokens: None,
            supports_tool_calls: true,
            timeout_secs: default_model_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum number of tool rounds per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Upper bound on one tool call, in seconds
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// Run the tool calls of one round concurrently
    #[serde(default)]
    pub parallel_tool_calls: bool,
}

fn default_max_iterations() -> u32 {
    15
}
fn default_tool_timeout() -> u64 {
    30
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tool_timeout_secs: default_tool_timeout(),
            parallel_tool_calls: false,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// OpenWeather API key for `weather_lookup`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openweather_api_key: Option<String>,

    /// Number of snippets `web_search` returns
    #[serde(default = "default_search_results")]
    pub search_max_results: usize,

    /// Offset from UTC used by `current_time`, in minutes
    #[serde(default = "default_tz_offset")]
    pub timezone_offset_minutes: i32,

    /// Label printed after the time
    #[serde(default = "default_tz_label")]
    pub timezone_label: String,
}

fn default_search_results() -> usize {
    3
}
fn default_tz_offset() -> i32 {
    330
}
fn default_tz_label() -> String {
    "IST".into()
}

impl std::fmt::Debug for ToolsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolsConfig")
            .field("openweather_api_key", &redact(&self.openweather_api_key))
            .field("search_max_results", &self.search_max_results)
            .field("timezone_offset_minutes", &self.timezone_offset_minutes)
            .field("timezone_label", &self.timezone_label)
            .finish()
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            openweather_api_key: None,
            search_max_results: default_search_results(),
            timezone_offset_minutes: default_tz_offset(),
            timezone_label: default_tz_label(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Install the demo profile facts at startup
    #[serde(default = "default_true")]
    pub seed_defaults: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            seed_defaults: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.tooloop/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply process environment overrides and
    /// re-validate.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
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

    /// Apply environment variable overrides through `lookup`.
    ///
    /// - `TOOLOOP_PROVIDER`
    /// - `TOOLOOP_MODEL`, then `OLLAMA_MODEL`
    /// - `TOOLOOP_BASE_URL`, then `OLLAMA_BASE_URL`
    /// - `TOOLOOP_API_KEY` (always wins), `OPENAI_API_KEY` (only if unset)
    /// - `TOOLOOP_SUPPORTS_TOOLS` (`true`/`false`/`1`/`0`/`yes`/`no`)
    /// - `OPENWEATHER_API_KEY` (only if unset)
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = get("TOOLOOP_PROVIDER") {
            self.model.provider = provider;
        }

        if let Some(model) = get("TOOLOOP_MODEL").or_else(|| get("OLLAMA_MODEL")) {
            self.model.model = model;
        }

        if let Some(url) = get("TOOLOOP_BASE_URL").or_else(|| get("OLLAMA_BASE_URL")) {
            self.model.base_url = Some(url);
        }

        if let Some(key) = get("TOOLOOP_API_KEY") {
            self.model.api_key = Some(key);
        } else if self.model.api_key.is_none() {
            self.model.api_key = get("OPENAI_API_KEY");
        }

        if let Some(raw) = get("TOOLOOP_SUPPORTS_TOOLS") {
            match parse_bool(&raw) {
                Some(flag) => self.model.supports_tool_calls = flag,
                None => tracing::warn!(value = %raw, "Ignoring unrecognised TOOLOOP_SUPPORTS_TOOLS"),
            }
        }

        if self.tools.openweather_api_key.is_none() {
            self.tools.openweather_api_key = get("OPENWEATHER_API_KEY");
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".tooloop")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model.model must not be empty".into()));
        }

        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.model.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "model.timeout_secs must be greater than 0".into(),
            ));
        }

        if !(1..=50).contains(&self.agent.max_iterations) {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be between 1 and 50".into(),
            ));
        }

        if self.agent.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.tool_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.tools.search_max_results == 0 {
            return Err(ConfigError::ValidationError(
                "tools.search_max_results must be at least 1".into(),
            ));
        }

        if !(-720..=840).contains(&self.tools.timezone_offset_minutes) {
            return Err(ConfigError::ValidationError(
                "tools.timezone_offset_minutes must be between -720 and 840".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.model.provider, "ollama");
        assert_eq!(config.model.model, "qwen2.5:1.5b");
        assert_eq!(config.model.temperature, 0.0);
        assert!(config.model.supports_tool_calls);
        assert_eq!(config.agent.max_iterations, 15);
        assert_eq!(config.gateway.port, 3000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model.model, config.model.model);
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.model.temperature = 5.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.max_iterations = 51;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.tool_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.model.model = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.model.provider, "ollama");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[model]\nmodel = \"llama3.2\"\nsupports_tool_calls = false\n\n[agent]\nmax_iterations = 4"
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.model.model, "llama3.2");
        assert!(!config.model.supports_tool_calls);
        assert_eq!(config.model.provider, "ollama");
        assert_eq!(config.agent.max_iterations, 4);
        assert_eq!(config.agent.tool_timeout_secs, 30);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[model\nmodel = ").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn out_of_range_file_is_validation_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[agent]\nmax_iterations = 500").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn env_overrides_apply_in_priority_order() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(env(&[
            ("TOOLOOP_MODEL", "gpt-4o-mini"),
            ("OLLAMA_MODEL", "ignored"),
            ("OLLAMA_BASE_URL", "http://gpu-box:11434"),
            ("OPENAI_API_KEY", "sk-test"),
            ("TOOLOOP_SUPPORTS_TOOLS", "no"),
            ("OPENWEATHER_API_KEY", "ow-key"),
        ]));
        assert_eq!(config.model.model, "gpt-4o-mini");
        assert_eq!(config.model.base_url.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(config.model.api_key.as_deref(), Some("sk-test"));
        assert!(!config.model.supports_tool_calls);
        assert_eq!(config.tools.openweather_api_key.as_deref(), Some("ow-key"));
    }

    #[test]
    fn file_api_key_beats_openai_env_but_not_tooloop_env() {
        let mut config = AppConfig::default();
        config.model.api_key = Some("from-file".into());
        config.apply_env_overrides(env(&[("OPENAI_API_KEY", "sk-env")]));
        assert_eq!(config.model.api_key.as_deref(), Some("from-file"));

        config.apply_env_overrides(env(&[("TOOLOOP_API_KEY", "tl-env")]));
        assert_eq!(config.model.api_key.as_deref(), Some("tl-env"));
    }

    #[test]
    fn unrecognised_bool_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(env(&[("TOOLOOP_SUPPORTS_TOOLS", "maybe")]));
        assert!(config.model.supports_tool_calls);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.model.api_key = Some("sk-secret".into());
        config.tools.openweather_api_key = Some("ow-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("ow-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("qwen2.5:1.5b"));
        assert!(toml_str.contains("max_iterations = 15"));
    }
}
