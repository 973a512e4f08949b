//! AI backends behind a single generation interface.
//!
//! Every backend family (cloud chat APIs, self-hosted inference servers)
//! implements [`ProviderAdapter`]. Which one runs is decided purely by
//! configuration: [`ProviderRegistry`] walks the configured priority list
//! and [`create_adapter`] builds the client for the selected descriptor.

mod anthropic;
pub mod mock;
mod ollama;
mod openai;

pub use anthropic::AnthropicProvider;
pub use mock::ScriptedProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::config::{ConfigError, ProvidersConfig};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// What a backend is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Capability {
    /// Text in, text out.
    TextGeneration,
    /// Text plus an image in, text out.
    VisionGeneration,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::TextGeneration => write!(f, "text generation"),
            Capability::VisionGeneration => write!(f, "vision generation"),
        }
    }
}

/// Supported backend families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Backend {
    Anthropic,
    OpenAi,
    Ollama,
    /// In-process scripted backend used for tests and headless embedding.
    Scripted,
}

impl Backend {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Backend::Anthropic => "https://api.anthropic.com",
            Backend::OpenAi => "https://api.openai.com/v1",
            Backend::Ollama => "http://localhost:11434",
            Backend::Scripted => "memory://scripted",
        }
    }

    pub fn default_code_model(&self) -> &'static str {
        match self {
            Backend::Anthropic => "claude-3-5-sonnet-20241022",
            Backend::OpenAi => "gpt-4-turbo-preview",
            Backend::Ollama => "llama3.1:8b",
            Backend::Scripted => "scripted-model",
        }
    }

    pub fn default_vision_model(&self) -> &'static str {
        match self {
            Backend::Anthropic => "claude-3-5-sonnet-20241022",
            Backend::OpenAi => "gpt-4o",
            Backend::Ollama => "llava:13b",
            Backend::Scripted => "scripted-model",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Anthropic => write!(f, "anthropic"),
            Backend::OpenAi => write!(f, "openai"),
            Backend::Ollama => write!(f, "ollama"),
            Backend::Scripted => write!(f, "scripted"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Backend::Anthropic),
            "openai" | "gpt" => Ok(Backend::OpenAi),
            "ollama" | "local" => Ok(Backend::Ollama),
            _ => Err(format!("Unknown AI backend: {}", s)),
        }
    }
}

/// One usable (backend, capability) pairing with its sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderDescriptor {
    pub backend: Backend,
    pub capability: Capability,
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ProviderDescriptor {
    /// Vision models accept plain text prompts too.
    pub fn supports(&self, capability: Capability) -> bool {
        match self.capability {
            Capability::VisionGeneration => true,
            Capability::TextGeneration => capability == Capability::TextGeneration,
        }
    }
}

/// Base64-encoded image attached to a generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

/// Input to a single generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub image: Option<ImagePayload>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            image: None,
            temperature: 0.1,
            max_tokens: 4096,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_image(mut self, image: ImagePayload) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Capability this request needs from a backend.
    pub fn required_capability(&self) -> Capability {
        if self.image.is_some() {
            Capability::VisionGeneration
        } else {
            Capability::TextGeneration
        }
    }
}

/// Uniform interface over text and vision generation backends.
///
/// Implementations perform exactly one upstream call per `generate` and
/// never retry.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The configuration this adapter was built from.
    fn descriptor(&self) -> &ProviderDescriptor;

    fn backend(&self) -> Backend {
        self.descriptor().backend
    }

    fn model_name(&self) -> &str {
        &self.descriptor().model
    }

    /// One-time setup before the first call (for example pulling a local model).
    async fn prepare(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Produce raw model text for the request.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}

/// Reject requests the descriptor's capability cannot serve, before any I/O.
pub(crate) fn ensure_supported(
    descriptor: &ProviderDescriptor,
    request: &GenerationRequest,
) -> Result<(), ProviderError> {
    let needed = request.required_capability();
    if descriptor.supports(needed) {
        Ok(())
    } else {
        Err(ProviderError::call_failed(
            descriptor.backend,
            format!("model {} does not support {}", descriptor.model, needed),
        ))
    }
}

/// Configured backends, in explicit priority order.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    descriptors: Vec<ProviderDescriptor>,
}

impl ProviderRegistry {
    /// Build descriptors for every configured backend named in the priority list.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, ConfigError> {
        let mut descriptors = Vec::new();

        for backend in config.priority_backends()? {
            match backend {
                Backend::Anthropic | Backend::OpenAi => {
                    let cloud = if backend == Backend::Anthropic {
                        &config.anthropic
                    } else {
                        &config.openai
                    };
                    if !cloud.is_configured() {
                        tracing::debug!("Skipping {}: no API key", backend);
                        continue;
                    }
                    let endpoint = cloud.base_url_or(backend);
                    descriptors.push(ProviderDescriptor {
                        backend,
                        capability: Capability::TextGeneration,
                        endpoint: endpoint.clone(),
                        model: cloud.code_model_or(backend),
                        max_tokens: cloud.max_tokens,
                        temperature: cloud.temperature,
                    });
                    descriptors.push(ProviderDescriptor {
                        backend,
                        capability: Capability::VisionGeneration,
                        endpoint,
                        model: cloud.vision_model_or(backend),
                        max_tokens: cloud.max_tokens,
                        temperature: cloud.temperature,
                    });
                }
                Backend::Ollama => {
                    let local = &config.ollama;
                    if !local.enabled {
                        tracing::debug!("Skipping ollama: not enabled");
                        continue;
                    }
                    descriptors.push(ProviderDescriptor {
                        backend,
                        capability: Capability::TextGeneration,
                        endpoint: local.base_url.clone(),
                        model: local.code_model.clone(),
                        max_tokens: local.max_tokens,
                        temperature: local.temperature,
                    });
                    descriptors.push(ProviderDescriptor {
                        backend,
                        capability: Capability::VisionGeneration,
                        endpoint: local.base_url.clone(),
                        model: local.vision_model.clone(),
                        max_tokens: local.max_tokens,
                        temperature: local.temperature,
                    });
                }
                Backend::Scripted => {}
            }
        }

        Ok(Self { descriptors })
    }

    /// All descriptors in priority order.
    pub fn descriptors(&self) -> &[ProviderDescriptor] {
        &self.descriptors
    }

    /// The highest-priority descriptor for a capability.
    pub fn select(&self, capability: Capability) -> Result<&ProviderDescriptor, ProviderError> {
        self.descriptors
            .iter()
            .find(|d| d.capability == capability)
            .ok_or(ProviderError::Unavailable(capability))
    }
}

/// Build a ready client for a descriptor.
pub fn create_adapter(
    descriptor: &ProviderDescriptor,
    config: &ProvidersConfig,
    timeout: Duration,
) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
    let adapter: Arc<dyn ProviderAdapter> = match descriptor.backend {
        Backend::Anthropic => {
            let key = config
                .anthropic
                .api_key
                .clone()
                .ok_or(ProviderError::Unavailable(descriptor.capability))?;
            Arc::new(AnthropicProvider::new(descriptor.clone(), key, timeout)?)
        }
        Backend::OpenAi => {
            let key = config
                .openai
                .api_key
                .clone()
                .ok_or(ProviderError::Unavailable(descriptor.capability))?;
            Arc::new(OpenAiProvider::new(descriptor.clone(), key, timeout)?)
        }
        Backend::Ollama => Arc::new(OllamaProvider::new(
            descriptor.clone(),
            config.ollama.auto_pull,
            timeout,
        )?),
        Backend::Scripted => return Err(ProviderError::Unavailable(descriptor.capability)),
    };
    Ok(adapter)
}

/// Shared HTTP client construction; the timeout is a transport backstop.
pub(crate) fn http_client(backend: Backend, timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("shadowscan/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProviderError::call_failed(backend, e.to_string()))
}

/// Send a JSON request and return the decoded JSON envelope, mapping
/// transport errors and HTTP error statuses.
pub(crate) async fn send_json(
    backend: Backend,
    timeout: Duration,
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value, ProviderError> {
    let secs = timeout.as_secs();
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(backend, secs, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(500).collect();
        return Err(ProviderError::call_failed(
            backend,
            format!("HTTP {}: {}", status, body),
        ));
    }

    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| ProviderError::from_reqwest(backend, secs, e))
}
