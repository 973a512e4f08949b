//! Error taxonomy for the analysis pipeline.

use crate::providers::{Backend, Capability};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Failure talking to an AI backend.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No backend is configured for the requested capability.
    #[error("no AI provider configured for {0}")]
    Unavailable(Capability),

    /// Transport error, HTTP error status, or an unusable response envelope.
    #[error("{backend} call failed: {message}")]
    CallFailed { backend: Backend, message: String },

    /// The backend did not answer within the configured bound.
    #[error("{backend} did not respond within {seconds}s")]
    Timeout { backend: Backend, seconds: u64 },
}

impl ProviderError {
    pub fn call_failed(backend: Backend, message: impl Into<String>) -> Self {
        ProviderError::CallFailed {
            backend,
            message: redact_credentials(&message.into()),
        }
    }

    /// Map a reqwest error, stripping the URL so query strings never leak.
    pub fn from_reqwest(backend: Backend, timeout_secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ProviderError::Timeout {
                backend,
                seconds: timeout_secs,
            };
        }
        ProviderError::call_failed(backend, err.without_url().to_string())
    }
}

/// Errors surfaced by the analysis pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no AI provider configured for {0}")]
    ProviderUnavailable(Capability),

    #[error("{backend} call failed: {message}")]
    ProviderCallFailed { backend: Backend, message: String },

    #[error("{backend} did not respond within {seconds}s")]
    ProviderTimeout { backend: Backend, seconds: u64 },

    /// Model output did not contain parseable JSON. Recovered inside the
    /// orchestrator; only visible to direct callers of the extractor.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("analysis failed: {0}")]
    AnalysisFailed(String),
}

impl From<ProviderError> for AnalysisError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable(capability) => AnalysisError::ProviderUnavailable(capability),
            ProviderError::CallFailed { backend, message } => {
                AnalysisError::ProviderCallFailed { backend, message }
            }
            ProviderError::Timeout { backend, seconds } => {
                AnalysisError::ProviderTimeout { backend, seconds }
            }
        }
    }
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;

fn credential_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?i)(\bsk-(?:ant-)?[A-Za-z0-9_\-]{8,})|((?:x-api-key|authorization|api[_-]?key)["']?\s*[:=]\s*["']?(?:bearer\s+)?)[^\s"',}]+"#,
        )
        .expect("credential pattern is valid")
    })
}

/// Mask anything that looks like an API key in text that came back from a backend.
pub fn redact_credentials(text: &str) -> String {
    credential_pattern()
        .replace_all(text, |caps: &regex::Captures<'_>| match caps.get(2) {
            Some(prefix) => format!("{}[REDACTED]", prefix.as_str()),
            None => "[REDACTED]".to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_bare_keys() {
        let out = redact_credentials("invalid key sk-ant-abcdef0123456789 supplied");
        assert_eq!(out, "invalid key [REDACTED] supplied");
    }

    #[test]
    fn test_redacts_header_values() {
        let out = redact_credentials(r#"{"x-api-key": "secret-value-123"}"#);
        assert!(!out.contains("secret-value-123"));
        assert!(out.contains("[REDACTED]"));

        let out = redact_credentials("Authorization: Bearer abc.def.ghi");
        assert!(!out.contains("abc.def.ghi"));
    }

    #[test]
    fn test_leaves_plain_text_alone() {
        let text = "model not found: llama3.1:8b";
        assert_eq!(redact_credentials(text), text);
    }

    #[test]
    fn test_provider_error_conversion() {
        let err: AnalysisError = ProviderError::Timeout {
            backend: Backend::Ollama,
            seconds: 5,
        }
        .into();
        assert!(matches!(
            err,
            AnalysisError::ProviderTimeout { seconds: 5, .. }
        ));
    }
}
