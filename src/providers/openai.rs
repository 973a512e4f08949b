//! OpenAI-compatible chat completions client.

use super::{ensure_supported, http_client, send_json, GenerationRequest, ProviderAdapter, ProviderDescriptor};
use crate::config::ApiKey;
use crate::error::ProviderError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

pub struct OpenAiProvider {
    descriptor: ProviderDescriptor,
    api_key: ApiKey,
    client: reqwest::Client,
    timeout: Duration,
}

impl OpenAiProvider {
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
        let mut messages = Vec::new();
        if let Some(system) = &request.system_prompt {
            messages.push(json!({ "role": "system", "content": system }));
        }

        let user_content = match &request.image {
            Some(image) => json!([
                { "type": "text", "text": request.prompt },
                {
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:{};base64,{}", image.mime_type, image.data)
                    }
                }
            ]),
            None => Value::String(request.prompt.clone()),
        };
        messages.push(json!({ "role": "user", "content": user_content }));

        json!({
            "model": self.descriptor.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }
}

fn parse_envelope(envelope: &Value) -> Option<String> {
    envelope
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        ensure_supported(&self.descriptor, request)?;

        tracing::info!(
            backend = "openai",
            model = %self.descriptor.model,
            prompt_length = request.prompt.len(),
            vision = request.image.is_some(),
            "Calling provider"
        );

        let url = format!(
            "{}/chat/completions",
            self.descriptor.endpoint.trim_end_matches('/')
        );
        let http = self
            .client
            .post(url)
            .bearer_auth(self.api_key.expose())
            .json(&self.build_body(request));

        let envelope = send_json(self.descriptor.backend, self.timeout, http).await?;
        let text = parse_envelope(&envelope).ok_or_else(|| {
            ProviderError::call_failed(self.descriptor.backend, "response contained no message content")
        })?;

        tracing::debug!(response_length = text.len(), "OpenAI generation complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Backend, Capability, ImagePayload};

    fn provider() -> OpenAiProvider {
        let descriptor = ProviderDescriptor {
            backend: Backend::OpenAi,
            capability: Capability::VisionGeneration,
            endpoint: "https://api.openai.com/v1/".to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 2048,
            temperature: 0.1,
        };
        OpenAiProvider::new(descriptor, ApiKey::new("sk-test"), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_body_with_system_prompt() {
        let body = provider().build_body(
            &GenerationRequest::new("find bugs").with_system_prompt("You are a security expert."),
        );
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "find bugs");
    }

    #[test]
    fn test_body_with_image_uses_data_url() {
        let body = provider().build_body(&GenerationRequest::new("diagram").with_image(ImagePayload {
            mime_type: "image/jpeg".to_string(),
            data: "/9j/4AAQ".to_string(),
        }));
        let content = &body["messages"][0]["content"];
        assert_eq!(content[1]["image_url"]["url"], "data:image/jpeg;base64,/9j/4AAQ");
    }

    #[test]
    fn test_parse_envelope() {
        let envelope = json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"vulnerabilities\": []}" } }]
        });
        assert_eq!(parse_envelope(&envelope).unwrap(), "{\"vulnerabilities\": []}");
        assert!(parse_envelope(&json!({ "choices": [] })).is_none());
        assert!(parse_envelope(&json!({ "choices": [{ "message": { "content": null } }] })).is_none());
    }
}
