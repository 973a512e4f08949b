//! Scripted provider returning canned output without any network I/O.

use super::{Backend, Capability, GenerationRequest, ProviderAdapter, ProviderDescriptor};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

enum Script {
    Text(String),
    Fail(String),
    Hang(Duration),
}

/// A provider that answers every call the same way.
pub struct ScriptedProvider {
    descriptor: ProviderDescriptor,
    script: Script,
    call_count: AtomicUsize,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl ScriptedProvider {
    fn with_script(script: Script) -> Self {
        Self {
            descriptor: ProviderDescriptor {
                backend: Backend::Scripted,
                capability: Capability::VisionGeneration,
                endpoint: Backend::Scripted.default_base_url().to_string(),
                model: Backend::Scripted.default_code_model().to_string(),
                max_tokens: 4096,
                temperature: 0.1,
            },
            script,
            call_count: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Always return `text` as the raw model output.
    pub fn returning(text: impl Into<String>) -> Self {
        Self::with_script(Script::Text(text.into()))
    }

    /// Always fail with a transport-level error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_script(Script::Fail(message.into()))
    }

    /// Sleep for `delay` before answering; used to exercise timeouts.
    pub fn hanging(delay: Duration) -> Self {
        Self::with_script(Script::Hang(delay))
    }

    /// Restrict the advertised capability (defaults to vision, which covers text).
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.descriptor.capability = capability;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.descriptor.model = model.into();
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// The most recent request seen, if any.
    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(None)
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_request.lock() {
            *guard = Some(request.clone());
        }
        super::ensure_supported(&self.descriptor, request)?;

        match &self.script {
            Script::Text(text) => Ok(text.clone()),
            Script::Fail(message) => Err(ProviderError::call_failed(Backend::Scripted, message.clone())),
            Script::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(String::new())
            }
        }
    }
}
