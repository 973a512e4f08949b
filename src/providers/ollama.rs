//! Client for a self-hosted Ollama inference server.
//!
//! No authentication. Models may have to be pulled onto the server once
//! before they can serve requests; [`OllamaProvider::prepare`] does that at
//! most once per adapter when `auto_pull` is enabled.

use super::{ensure_supported, http_client, send_json, GenerationRequest, ProviderAdapter, ProviderDescriptor};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Large models take a while to download.
const PULL_TIMEOUT: Duration = Duration::from_secs(600);

pub struct OllamaProvider {
    descriptor: ProviderDescriptor,
    client: reqwest::Client,
    timeout: Duration,
    auto_pull: bool,
    prepared: OnceCell<()>,
}

impl OllamaProvider {
    pub fn new(
        descriptor: ProviderDescriptor,
        auto_pull: bool,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = http_client(descriptor.backend, timeout)?;
        Ok(Self {
            descriptor,
            client,
            timeout,
            auto_pull,
            prepared: OnceCell::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.descriptor.endpoint.trim_end_matches('/'), path)
    }

    /// Whether the server already has `model` locally.
    pub async fn is_model_available(&self, model: &str) -> Result<bool, ProviderError> {
        let envelope = send_json(
            self.descriptor.backend,
            self.timeout,
            self.client.get(self.url("/api/tags")),
        )
        .await?;
        Ok(model_names(&envelope).iter().any(|name| name == model))
    }

    /// Ask the server to download `model`.
    pub async fn pull_model(&self, model: &str) -> Result<(), ProviderError> {
        tracing::info!(backend = "ollama", model, "Pulling model");
        let request = self
            .client
            .post(self.url("/api/pull"))
            .timeout(PULL_TIMEOUT)
            .json(&json!({ "name": model, "stream": false }));
        send_json(self.descriptor.backend, PULL_TIMEOUT, request).await?;
        tracing::info!(backend = "ollama", model, "Model pulled");
        Ok(())
    }

    fn build_body(&self, request: &GenerationRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = &request.system_prompt {
            messages.push(json!({ "role": "system", "content": system }));
        }

        let mut user = json!({ "role": "user", "content": request.prompt });
        if let Some(image) = &request.image {
            user["images"] = json!([image.data]);
        }
        messages.push(user);

        json!({
            "model": self.descriptor.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            }
        })
    }
}

fn model_names(envelope: &Value) -> Vec<String> {
    envelope
        .get("models")
        .and_then(Value::as_array)
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_envelope(envelope: &Value) -> Option<String> {
    envelope
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl ProviderAdapter for OllamaProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn prepare(&self) -> Result<(), ProviderError> {
        if !self.auto_pull {
            return Ok(());
        }
        self.prepared
            .get_or_try_init(|| async {
                let model = &self.descriptor.model;
                if !self.is_model_available(model).await? {
                    self.pull_model(model).await?;
                }
                Ok::<(), ProviderError>(())
            })
            .await?;
        Ok(())
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        ensure_supported(&self.descriptor, request)?;

        tracing::info!(
            backend = "ollama",
            model = %self.descriptor.model,
            prompt_length = request.prompt.len(),
            vision = request.image.is_some(),
            "Calling provider"
        );

        let http = self.client.post(self.url("/api/chat")).json(&self.build_body(request));
        let envelope = send_json(self.descriptor.backend, self.timeout, http).await?;
        let text = parse_envelope(&envelope).ok_or_else(|| {
            ProviderError::call_failed(self.descriptor.backend, "response contained no message content")
        })?;

        tracing::debug!(response_length = text.len(), "Ollama generation complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Backend, Capability, ImagePayload};

    fn provider() -> OllamaProvider {
        let descriptor = ProviderDescriptor {
            backend: Backend::Ollama,
            capability: Capability::VisionGeneration,
            endpoint: "http://localhost:11434/".to_string(),
            model: "llava:13b".to_string(),
            max_tokens: 4096,
            temperature: 0.1,
        };
        OllamaProvider::new(descriptor, false, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_url_joins_cleanly() {
        assert_eq!(provider().url("/api/chat"), "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_body_carries_images_and_options() {
        let request = GenerationRequest::new("analyze diagram")
            .with_system_prompt("architect")
            .with_image(ImagePayload {
                mime_type: "image/png".to_string(),
                data: "QUJD".to_string(),
            })
            .with_sampling(0.3, 512);
        let body = provider().build_body(&request);

        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 512);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["images"][0], "QUJD");
    }

    #[test]
    fn test_model_names() {
        let envelope = json!({ "models": [{ "name": "llava:13b" }, { "name": "llama3.1:8b" }] });
        assert_eq!(model_names(&envelope), vec!["llava:13b", "llama3.1:8b"]);
        assert!(model_names(&json!({})).is_empty());
    }

    #[test]
    fn test_parse_envelope() {
        let envelope = json!({ "message": { "role": "assistant", "content": "hello" }, "done": true });
        assert_eq!(parse_envelope(&envelope).unwrap(), "hello");
        assert!(parse_envelope(&json!({ "done": true })).is_none());
    }

    #[tokio::test]
    async fn test_prepare_is_noop_without_auto_pull() {
        assert!(provider().prepare().await.is_ok());
    }
}
