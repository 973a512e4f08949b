//! Configuration file support.
//!
//! Configuration lives in a TOML file (by default
//! `<config_dir>/shadowscan/config.toml`). Environment variables override
//! the file for credentials and a few operational knobs.

use crate::providers::Backend;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("unknown provider in priority list: {0}")]
    UnknownProvider(String),

    #[error("invalid config file {path}: analysis.timeout_seconds must be greater than 0")]
    ZeroTimeout { path: PathBuf },
}

/// An API credential. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisSettings,

    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Limits and pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Upper bound on a single provider call.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Maximum number of lines accepted for code analysis.
    #[serde(default = "default_max_code_lines")]
    pub max_code_lines: usize,

    /// Maximum diagram size in bytes.
    #[serde(default = "default_max_diagram_bytes")]
    pub max_diagram_bytes: usize,

    #[serde(default = "default_allowed_image_types")]
    pub allowed_image_types: Vec<String>,

    /// Result schema version recorded in metadata.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_max_code_lines() -> usize {
    10_000
}

fn default_max_diagram_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_allowed_image_types() -> Vec<String> {
    vec![
        "image/png".to_string(),
        "image/jpeg".to_string(),
        "image/svg+xml".to_string(),
    ]
}

fn default_schema_version() -> String {
    "1.0.0".to_string()
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            max_code_lines: default_max_code_lines(),
            max_diagram_bytes: default_max_diagram_bytes(),
            allowed_image_types: default_allowed_image_types(),
            schema_version: default_schema_version(),
        }
    }
}

/// Backend configuration and selection order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Backends in the order they are tried. Backends not listed are never used.
    #[serde(default = "default_priority")]
    pub priority: Vec<String>,

    #[serde(default)]
    pub anthropic: CloudProviderConfig,

    #[serde(default)]
    pub openai: CloudProviderConfig,

    #[serde(default)]
    pub ollama: LocalProviderConfig,
}

fn default_priority() -> Vec<String> {
    vec![
        "anthropic".to_string(),
        "openai".to_string(),
        "ollama".to_string(),
    ]
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            priority: default_priority(),
            anthropic: CloudProviderConfig::default(),
            openai: CloudProviderConfig::default(),
            ollama: LocalProviderConfig::default(),
        }
    }
}

impl ProvidersConfig {
    /// Resolve the priority list into backends, rejecting unknown names.
    pub fn priority_backends(&self) -> Result<Vec<Backend>, ConfigError> {
        let mut backends = Vec::new();
        for name in &self.priority {
            let backend: Backend = name
                .parse()
                .map_err(|_| ConfigError::UnknownProvider(name.clone()))?;
            if !backends.contains(&backend) {
                backends.push(backend);
            }
        }
        Ok(backends)
    }
}

/// Settings for an authenticated cloud API. Unset endpoint and model
/// fields fall back to the backend's defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudProviderConfig {
    /// Credential; the backend is considered configured only when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<ApiKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision_model: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.1
}

impl Default for CloudProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            code_model: None,
            vision_model: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl CloudProviderConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key
            .as_ref()
            .map(|k| !k.expose().trim().is_empty())
            .unwrap_or(false)
    }

    pub fn base_url_or(&self, backend: Backend) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| backend.default_base_url().to_string())
    }

    pub fn code_model_or(&self, backend: Backend) -> String {
        self.code_model
            .clone()
            .unwrap_or_else(|| backend.default_code_model().to_string())
    }

    pub fn vision_model_or(&self, backend: Backend) -> String {
        self.vision_model
            .clone()
            .unwrap_or_else(|| backend.default_vision_model().to_string())
    }
}

/// Settings for a self-hosted inference server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalProviderConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_ollama_code_model")]
    pub code_model: String,
    #[serde(default = "default_ollama_vision_model")]
    pub vision_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Pull a missing model before the first generation call.
    #[serde(default = "default_true")]
    pub auto_pull: bool,
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_code_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_ollama_vision_model() -> String {
    "llava:13b".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LocalProviderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_ollama_url(),
            code_model: default_ollama_code_model(),
            vision_model: default_ollama_vision_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            auto_pull: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.providers.priority_backends()?;
        if config.analysis.timeout_seconds == 0 {
            return Err(ConfigError::ZeroTimeout {
                path: path.to_path_buf(),
            });
        }
        Ok(config)
    }

    /// Load from the default location, falling back to built-in defaults.
    pub fn load_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Ignoring config file: {}", e);
                Self::default()
            }
        }
    }

    /// Default config file path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("shadowscan").join("config.toml"))
    }

    /// Apply environment overrides (env vars take precedence over the file).
    pub fn merge_with_env(self) -> Self {
        self.merge_with(|key| std::env::var(key).ok())
    }

    fn merge_with(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = var("ANTHROPIC_API_KEY").filter(|k| !k.is_empty()) {
            self.providers.anthropic.api_key = Some(ApiKey::new(key));
        }

        if let Some(key) = var("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
            self.providers.openai.api_key = Some(ApiKey::new(key));
        }

        if let Some(url) = var("OLLAMA_BASE_URL").filter(|u| !u.is_empty()) {
            self.providers.ollama.base_url = url;
            self.providers.ollama.enabled = true;
        }

        if let Some(priority) = var("SHADOWSCAN_PROVIDER_PRIORITY") {
            self.providers.priority = priority
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(timeout) = var("SHADOWSCAN_TIMEOUT_SECONDS") {
            match timeout.parse::<u64>() {
                Ok(secs) if secs > 0 => self.analysis.timeout_seconds = secs,
                _ => tracing::warn!("Ignoring invalid SHADOWSCAN_TIMEOUT_SECONDS: {}", timeout),
            }
        }

        self
    }
}

/// Generate a default config file with comments.
pub fn generate_default_config() -> String {
    r#"# shadowscan configuration
#
# Credentials may also come from the environment:
#   ANTHROPIC_API_KEY, OPENAI_API_KEY, OLLAMA_BASE_URL

[analysis]
# Upper bound (seconds) on a single AI provider call
timeout_seconds = 300
# Largest accepted input
max_code_lines = 10000
max_diagram_bytes = 52428800
allowed_image_types = ["image/png", "image/jpeg", "image/svg+xml"]
schema_version = "1.0.0"

[providers]
# Backends are tried in this order; the first configured one is used.
# A cloud backend is configured when it has an api_key, ollama when enabled.
priority = ["anthropic", "openai", "ollama"]

[providers.anthropic]
# api_key = "..."
base_url = "https://api.anthropic.com"
code_model = "claude-3-5-sonnet-20241022"
vision_model = "claude-3-5-sonnet-20241022"
max_tokens = 4096
temperature = 0.1

[providers.openai]
# api_key = "..."
base_url = "https://api.openai.com/v1"
code_model = "gpt-4-turbo-preview"
vision_model = "gpt-4o"
max_tokens = 4096
temperature = 0.1

[providers.ollama]
enabled = false
base_url = "http://localhost:11434"
code_model = "llama3.1:8b"
vision_model = "llava:13b"
max_tokens = 4096
temperature = 0.1
# Pull missing models on first use
auto_pull = true
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_template_parses() {
        let config = Config::from_toml(&generate_default_config(), Path::new("test.toml")).unwrap();
        assert_eq!(config.analysis.timeout_seconds, 300);
        assert_eq!(config.analysis.max_code_lines, 10_000);
        assert_eq!(
            config.providers.priority_backends().unwrap(),
            vec![Backend::Anthropic, Backend::OpenAi, Backend::Ollama]
        );
        assert!(!config.providers.anthropic.is_configured());
        assert!(!config.providers.ollama.enabled);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let content = r#"
[providers]
priority = ["ollama"]

[providers.ollama]
enabled = true
"#;
        let config = Config::from_toml(content, Path::new("partial.toml")).unwrap();
        assert_eq!(config.providers.priority_backends().unwrap(), vec![Backend::Ollama]);
        assert_eq!(config.providers.ollama.vision_model, "llava:13b");
        assert_eq!(
            config.providers.openai.base_url_or(Backend::OpenAi),
            "https://api.openai.com/v1"
        );
        assert_eq!(config.analysis.schema_version, "1.0.0");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let content = r#"
[providers]
priority = ["anthropic", "mystery"]
"#;
        let err = Config::from_toml(content, Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProvider(ref name) if name == "mystery"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = Config::from_toml("[analysis]\ntimeout_seconds = 0\n", Path::new("zero.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroTimeout { ref path } if path == Path::new("zero.toml")));
        assert!(err.to_string().contains("timeout_seconds"));

        let config = Config::from_toml("[analysis]\ntimeout_seconds = 1\n", Path::new("one.toml")).unwrap();
        assert_eq!(config.analysis.timeout_seconds, 1);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ANTHROPIC_API_KEY", "sk-ant-test"),
            ("OLLAMA_BASE_URL", "http://gpu-box:11434"),
            ("SHADOWSCAN_PROVIDER_PRIORITY", "ollama, Anthropic"),
            ("SHADOWSCAN_TIMEOUT_SECONDS", "42"),
        ]
        .into_iter()
        .collect();

        let config = Config::default().merge_with(|k| vars.get(k).map(|v| v.to_string()));

        assert!(config.providers.anthropic.is_configured());
        assert!(!config.providers.openai.is_configured());
        assert!(config.providers.ollama.enabled);
        assert_eq!(config.providers.ollama.base_url, "http://gpu-box:11434");
        assert_eq!(config.providers.priority, vec!["ollama", "anthropic"]);
        assert_eq!(config.analysis.timeout_seconds, 42);
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("sk-very-secret");
        assert_eq!(format!("{:?}", key), "ApiKey(***)");
        assert_eq!(key.expose(), "sk-very-secret");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[analysis]\ntimeout_seconds = 12\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.analysis.timeout_seconds, 12);

        let missing = Config::load(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
