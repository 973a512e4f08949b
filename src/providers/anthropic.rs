//! Anthropic Messages API client.

use super::{
    ensure_supported, http_client, send_json, Backend, GenerationRequest, ProviderAdapter,
    ProviderDescriptor,
};
use crate::config::ApiKey;
use crate::error::ProviderError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

const API_VERSION: &str = "2023-06-01";

/// Image media types the Messages API accepts in a base64 source block.
const IMAGE_MEDIA_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

pub struct AnthropicProvider {
    descriptor: ProviderDescriptor,
    api_key: ApiKey,
    client: reqwest::Client,
    timeout: Duration,
}

impl AnthropicProvider {
    pub fn new(
        descriptor: ProviderDescriptor,
        api_key: ApiKey,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = http_client(descriptor.backend, timeout)?;
        Ok(Self {
            descriptor,
            api_key,
            client,
            timeout,
        })
    }

    fn build_body(&self, request: &GenerationRequest) -> Value {
        let content = match &request.image {
            Some(image) => json!([
                {
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": image.mime_type,
                        "data": image.data,
                    }
                },
                { "type": "text", "text": request.prompt }
            ]),
            None => Value::String(request.prompt.clone()),
        };

        let mut body = json!({
            "model": self.descriptor.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [{ "role": "user", "content": content }],
        });
        if let Some(system) = &request.system_prompt {
            body["system"] = Value::String(system.clone());
        }
        body
    }
}

/// Raster formats only; SVG diagrams have to be converted before upload.
fn ensure_media_type(request: &GenerationRequest) -> Result<(), ProviderError> {
    match &request.image {
        Some(image) => {
            let mime = image.mime_type.trim().to_lowercase();
            if IMAGE_MEDIA_TYPES.contains(&mime.as_str()) {
                Ok(())
            } else {
                Err(ProviderError::call_failed(
                    Backend::Anthropic,
                    format!(
                        "anthropic does not accept {} images; convert the diagram to PNG or JPEG",
                        image.mime_type
                    ),
                ))
            }
        }
        None => Ok(()),
    }
}

/// Concatenate the text blocks of a Messages API response.
fn parse_envelope(envelope: &Value) -> Option<String> {
    let blocks = envelope.get("content")?.as_array()?;
    let text: Vec<&str> = blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text.concat())
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        ensure_supported(&self.descriptor, request)?;
        ensure_media_type(request)?;

        tracing::info!(
            backend = "anthropic",
            model = %self.descriptor.model,
            prompt_length = request.prompt.len(),
            vision = request.image.is_some(),
            "Calling provider"
        );

        let url = format!("{}/v1/messages", self.descriptor.endpoint.trim_end_matches('/'));
        let http = self
            .client
            .post(url)
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", API_VERSION)
            .json(&self.build_body(request));

        let envelope = send_json(self.descriptor.backend, self.timeout, http).await?;
        let text = parse_envelope(&envelope).ok_or_else(|| {
            ProviderError::call_failed(self.descriptor.backend, "response contained no text content")
        })?;

        tracing::debug!(response_length = text.len(), "Anthropic generation complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Backend, Capability, ImagePayload};

    fn provider(capability: Capability) -> AnthropicProvider {
        let descriptor = ProviderDescriptor {
            backend: Backend::Anthropic,
            capability,
            endpoint: "https://api.anthropic.com".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 4096,
            temperature: 0.1,
        };
        AnthropicProvider::new(descriptor, ApiKey::new("sk-ant-test"), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_text_body() {
        let p = provider(Capability::TextGeneration);
        let request = GenerationRequest::new("analyze this")
            .with_system_prompt("be precise")
            .with_sampling(0.2, 1000);
        let body = p.build_body(&request);

        assert_eq!(body["model"], "claude-3-5-sonnet-20241022");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["system"], "be precise");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "analyze this");
    }

    #[test]
    fn test_vision_body_has_image_block() {
        let p = provider(Capability::VisionGeneration);
        let request = GenerationRequest::new("describe").with_image(ImagePayload {
            mime_type: "image/png".to_string(),
            data: "iVBORw0KGgo=".to_string(),
        });
        let body = p.build_body(&request);

        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["media_type"], "image/png");
        assert_eq!(content[0]["source"]["data"], "iVBORw0KGgo=");
        assert_eq!(content[1]["text"], "describe");
        assert!(body.get("system").is_none());
    }

    #[tokio::test]
    async fn test_svg_diagram_rejected_before_sending() {
        let mut p = provider(Capability::VisionGeneration);
        p.descriptor.endpoint = "http://127.0.0.1:9".to_string();
        let request = GenerationRequest::new("describe").with_image(ImagePayload {
            mime_type: "image/svg+xml".to_string(),
            data: "PHN2Zy8+".to_string(),
        });

        match p.generate(&request).await.unwrap_err() {
            ProviderError::CallFailed { backend, message } => {
                assert_eq!(backend, Backend::Anthropic);
                assert!(message.contains("image/svg+xml"), "{}", message);
                assert!(message.contains("PNG or JPEG"), "{}", message);
            }
            other => panic!("expected CallFailed, got {:?}", other),
        }

        let jpeg = GenerationRequest::new("describe").with_image(ImagePayload {
            mime_type: "image/jpeg".to_string(),
            data: "/9j/".to_string(),
        });
        assert!(ensure_media_type(&jpeg).is_ok());
        assert!(ensure_media_type(&GenerationRequest::new("text")).is_ok());
    }

    #[test]
    fn test_parse_envelope() {
        let envelope = json!({
            "content": [
                { "type": "text", "text": "```json\n{}" },
                { "type": "text", "text": "\n```" }
            ]
        });
        assert_eq!(parse_envelope(&envelope).unwrap(), "```json\n{}\n```");
        assert!(parse_envelope(&json!({ "content": [] })).is_none());
        assert!(parse_envelope(&json!({ "error": "x" })).is_none());
    }
}
