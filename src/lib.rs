//! Security analysis of source code and architecture diagrams backed by
//! large language models.
//!
//! An [`Analyzer`] takes an [`AnalysisRequest`], renders a prompt, calls a
//! configured [`ProviderAdapter`], pulls the JSON answer out of the model's
//! free-form text and normalizes it into a fixed result schema with
//! severity counts. Malformed model output degrades to an empty result;
//! provider and configuration failures are returned as errors.
//!
//! ```no_run
//! use shadowscan::{Analyzer, ScriptedProvider};
//! use std::sync::Arc;
//!
//! # async fn run() -> shadowscan::Result<()> {
//! let provider = Arc::new(ScriptedProvider::returning(r#"{"vulnerabilities": []}"#));
//! let analyzer = Analyzer::new().with_text_provider(provider);
//! let result = analyzer.analyze_code("print('hi')", "python", None).await?;
//! assert_eq!(result.summary.total, 0);
//! # Ok(())
//! # }
//! ```

pub mod admission;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod merge;
pub mod normalize;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod reporters;
pub mod scanners;
pub mod types;

pub use admission::{admit, AdmissionError, AnalysisLimits};
pub use config::{ApiKey, Config, ConfigError};
pub use error::{AnalysisError, ProviderError, Result};
pub use extract::{extract_json, extract_value};
pub use merge::{merge, recompute_summary};
pub use normalize::{normalize, normalize_vulnerability, CodeFindings, DiagramFindings};
pub use orchestrator::Analyzer;
pub use prompts::PromptBuilder;
pub use providers::{
    Backend, Capability, GenerationRequest, ProviderAdapter, ProviderDescriptor, ProviderRegistry,
    ScriptedProvider,
};
pub use scanners::{AuxiliaryFindings, AuxiliaryScanner, NoopScanner, ScannerSet};
pub use types::{
    AnalysisReport, AnalysisRequest, CodeAnalysis, DiagramAnalysis, LineRef, Location, Severity,
    SeveritySummary, Vulnerability,
};
