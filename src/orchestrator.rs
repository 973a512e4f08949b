//! Top-level analysis pipeline.
//!
//! `Analyzer` issues the analysis id, builds the prompt, calls the provider,
//! extracts and normalizes the answer, merges auxiliary findings and attaches
//! metadata. Every step runs sequentially inside the caller's task. The
//! provider call is the only suspension point that waits on the network and
//! is bounded by a timeout; dropping the returned future (for example when
//! the caller disconnects) drops the in-flight request with it. Nothing is
//! cached between calls.

use crate::admission::line_count;
use crate::config::Config;
use crate::error::{AnalysisError, ProviderError, Result};
use crate::extract::extract_value;
use crate::merge::{merge, recompute_summary};
use crate::normalize::{normalize, normalize_diagram, CodeFindings, DiagramFindings};
use crate::prompts::{PromptBuilder, CODE_SYSTEM_PROMPT, DIAGRAM_SYSTEM_PROMPT};
use crate::providers::{
    create_adapter, Capability, GenerationRequest, ImagePayload, ProviderAdapter, ProviderRegistry,
};
use crate::scanners::ScannerSet;
use crate::types::{AnalysisReport, AnalysisRequest, CodeAnalysis, DiagramAnalysis, Metadata};
use base64::Engine;
use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_SCHEMA_VERSION: &str = "1.0.0";

/// Drives code and diagram analyses against injected providers.
pub struct Analyzer {
    text_provider: Option<Arc<dyn ProviderAdapter>>,
    vision_provider: Option<Arc<dyn ProviderAdapter>>,
    scanners: ScannerSet,
    prompts: PromptBuilder,
    timeout: Duration,
    schema_version: String,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// An analyzer with no providers; calls fail with `ProviderUnavailable`
    /// until providers are attached.
    pub fn new() -> Self {
        Self {
            text_provider: None,
            vision_provider: None,
            scanners: ScannerSet::new(),
            prompts: PromptBuilder::new(),
            timeout: DEFAULT_TIMEOUT,
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
        }
    }

    /// Build providers from configuration using the explicit priority list.
    ///
    /// A capability with no configured backend is left empty and reported
    /// as `ProviderUnavailable` when first used.
    pub fn with_config(config: &Config) -> Result<Self> {
        let registry = ProviderRegistry::from_config(&config.providers)
            .map_err(|e| AnalysisError::AnalysisFailed(e.to_string()))?;
        let timeout = Duration::from_secs(config.analysis.timeout_seconds);

        let build = |capability: Capability| -> Result<Option<Arc<dyn ProviderAdapter>>> {
            match registry.select(capability) {
                Ok(descriptor) => {
                    tracing::debug!(
                        backend = %descriptor.backend,
                        model = %descriptor.model,
                        %capability,
                        "Selected provider"
                    );
                    Ok(Some(create_adapter(descriptor, &config.providers, timeout)?))
                }
                Err(_) => Ok(None),
            }
        };

        let mut analyzer = Self::new()
            .with_timeout(timeout)
            .with_schema_version(config.analysis.schema_version.clone());
        analyzer.text_provider = build(Capability::TextGeneration)?;
        analyzer.vision_provider = build(Capability::VisionGeneration)?;
        Ok(analyzer)
    }

    pub fn with_text_provider(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.text_provider = Some(provider);
        self
    }

    pub fn with_vision_provider(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.vision_provider = Some(provider);
        self
    }

    pub fn with_scanners(mut self, scanners: ScannerSet) -> Self {
        self.scanners = scanners;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = version.into();
        self
    }

    pub fn text_provider(&self) -> Option<&Arc<dyn ProviderAdapter>> {
        self.text_provider.as_ref()
    }

    pub fn vision_provider(&self) -> Option<&Arc<dyn ProviderAdapter>> {
        self.vision_provider.as_ref()
    }

    /// Dispatch on the request kind.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport> {
        match request {
            AnalysisRequest::Code {
                code,
                language,
                filename,
            } => self
                .analyze_code(code, language, filename.as_deref())
                .await
                .map(AnalysisReport::Code),
            AnalysisRequest::Diagram {
                bytes,
                filename,
                mime_type,
            } => self
                .analyze_diagram(bytes, filename, mime_type)
                .await
                .map(AnalysisReport::Diagram),
        }
    }

    /// Analyze source code for vulnerabilities, secrets, dependencies and compliance.
    pub async fn analyze_code(
        &self,
        code: &str,
        language: &str,
        filename: Option<&str>,
    ) -> Result<CodeAnalysis> {
        let provider = self
            .text_provider
            .as_ref()
            .ok_or(AnalysisError::ProviderUnavailable(Capability::TextGeneration))?;

        let analysis_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(
            analysis_id = %analysis_id,
            language,
            code_length = code.len(),
            "Starting code analysis"
        );

        let prompt = self.prompts.build_code_prompt(code, language, filename)?;
        let request = GenerationRequest::new(prompt)
            .with_system_prompt(CODE_SYSTEM_PROMPT)
            .with_sampling(
                provider.descriptor().temperature,
                provider.descriptor().max_tokens,
            );

        let raw = self.invoke(provider.as_ref(), &request, &analysis_id).await?;

        let primary = match extract_value(&raw) {
            Ok(parsed) => normalize(&parsed),
            Err(e) => {
                tracing::error!(
                    analysis_id = %analysis_id,
                    error = %e,
                    "Failed to parse AI response as JSON, returning empty result"
                );
                CodeFindings::default()
            }
        };

        let auxiliary = self.scanners.run(code, language).await;
        let findings = merge(primary, auxiliary);
        let summary = recompute_summary(&findings.vulnerabilities);

        let mut metadata = Metadata::new();
        metadata.insert("code_hash".to_string(), json!(sha256_hex(code.as_bytes())));
        metadata.insert("lines_of_code".to_string(), json!(line_count(code)));
        metadata.insert("ai_provider".to_string(), json!(provider.backend().to_string()));
        metadata.insert("ai_model".to_string(), json!(provider.model_name()));
        metadata.insert("analyzer_version".to_string(), json!(self.schema_version));
        if let Some(name) = filename {
            metadata.insert("filename".to_string(), json!(name));
        }

        tracing::info!(
            analysis_id = %analysis_id,
            vulnerabilities = summary.total,
            critical = summary.critical,
            high = summary.high,
            secrets = findings.secrets.len(),
            "Code analysis completed"
        );

        Ok(CodeAnalysis {
            analysis_id,
            timestamp: Utc::now(),
            language: Some(language.to_string()),
            vulnerabilities: findings.vulnerabilities,
            summary,
            dependencies: findings.dependencies,
            secrets: findings.secrets,
            compliance: findings.compliance,
            metadata,
        })
    }

    /// Analyze an architecture diagram image.
    pub async fn analyze_diagram(
        &self,
        bytes: &[u8],
        filename: &str,
        mime_type: &str,
    ) -> Result<DiagramAnalysis> {
        let provider = self
            .vision_provider
            .as_ref()
            .ok_or(AnalysisError::ProviderUnavailable(Capability::VisionGeneration))?;

        let analysis_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(
            analysis_id = %analysis_id,
            filename,
            content_type = mime_type,
            size = bytes.len(),
            "Starting diagram analysis"
        );

        let prompt = self.prompts.build_diagram_prompt()?;
        let request = GenerationRequest::new(prompt)
            .with_system_prompt(DIAGRAM_SYSTEM_PROMPT)
            .with_image(ImagePayload {
                mime_type: mime_type.to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            })
            .with_sampling(
                provider.descriptor().temperature,
                provider.descriptor().max_tokens,
            );

        let raw = self.invoke(provider.as_ref(), &request, &analysis_id).await?;

        let findings = match extract_value(&raw) {
            Ok(parsed) => normalize_diagram(&parsed),
            Err(e) => {
                tracing::error!(
                    analysis_id = %analysis_id,
                    error = %e,
                    "Failed to parse AI response as JSON, returning limited result"
                );
                DiagramFindings::limited()
            }
        };

        let mut metadata = Metadata::new();
        metadata.insert("filename".to_string(), json!(filename));
        metadata.insert("file_size".to_string(), json!(bytes.len()));
        metadata.insert("content_type".to_string(), json!(mime_type));
        metadata.insert("content_hash".to_string(), json!(sha256_hex(bytes)));
        metadata.insert("ai_provider".to_string(), json!(provider.backend().to_string()));
        metadata.insert("ai_model".to_string(), json!(provider.model_name()));
        metadata.insert("analyzer_version".to_string(), json!(self.schema_version));

        tracing::info!(
            analysis_id = %analysis_id,
            components = findings.components.len(),
            weaknesses = findings.weaknesses.len(),
            "Diagram analysis completed"
        );

        Ok(DiagramAnalysis {
            analysis_id,
            timestamp: Utc::now(),
            components: findings.components,
            security_assessment: findings.security_assessment,
            weaknesses: findings.weaknesses,
            zero_trust_proposal: findings.zero_trust_proposal,
            secure_by_design: findings.secure_by_design,
            compliance: findings.compliance,
            metadata,
        })
    }

    /// One bounded provider call. No retries.
    async fn invoke(
        &self,
        provider: &dyn ProviderAdapter,
        request: &GenerationRequest,
        analysis_id: &str,
    ) -> Result<String> {
        self.call_provider(provider, request).await.map_err(|e| {
            tracing::error!(
                analysis_id,
                backend = %provider.backend(),
                model = provider.model_name(),
                error = %e,
                "AI provider call failed"
            );
            AnalysisError::from(e)
        })
    }

    async fn call_provider(
        &self,
        provider: &dyn ProviderAdapter,
        request: &GenerationRequest,
    ) -> std::result::Result<String, ProviderError> {
        provider.prepare().await?;
        match tokio::time::timeout(self.timeout, provider.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                backend: provider.backend(),
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
