//! Auxiliary (non-AI) scanners whose findings merge with the model's.
//!
//! Static-analysis tools plug in by implementing [`AuxiliaryScanner`] and
//! registering with a [`ScannerSet`]. An empty set is the zero-op default.

use crate::types::{Secret, Vulnerability};
use async_trait::async_trait;

/// Findings contributed by one auxiliary scanner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuxiliaryFindings {
    pub vulnerabilities: Vec<Vulnerability>,
    pub secrets: Vec<Secret>,
}

impl AuxiliaryFindings {
    pub fn is_empty(&self) -> bool {
        self.vulnerabilities.is_empty() && self.secrets.is_empty()
    }

    fn absorb(&mut self, other: AuxiliaryFindings) {
        self.vulnerabilities.extend(other.vulnerabilities);
        self.secrets.extend(other.secrets);
    }
}

/// A static-analysis tool run alongside the AI backend.
#[async_trait]
pub trait AuxiliaryScanner: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Whether this scanner understands `language` (already lowercased).
    fn supports(&self, language: &str) -> bool;

    async fn scan(&self, code: &str, language: &str) -> anyhow::Result<AuxiliaryFindings>;
}

/// Scanner that never reports anything.
#[derive(Debug, Default)]
pub struct NoopScanner;

#[async_trait]
impl AuxiliaryScanner for NoopScanner {
    fn name(&self) -> &str {
        "noop"
    }

    fn supports(&self, _language: &str) -> bool {
        true
    }

    async fn scan(&self, _code: &str, _language: &str) -> anyhow::Result<AuxiliaryFindings> {
        Ok(AuxiliaryFindings::default())
    }
}

/// Registered auxiliary scanners, run in registration order.
#[derive(Default)]
pub struct ScannerSet {
    scanners: Vec<Box<dyn AuxiliaryScanner>>,
}

impl ScannerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scanner(mut self, scanner: Box<dyn AuxiliaryScanner>) -> Self {
        self.scanners.push(scanner);
        self
    }

    pub fn len(&self) -> usize {
        self.scanners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scanners.is_empty()
    }

    /// Run every scanner that supports `language`, one after another.
    ///
    /// A failing scanner is logged and skipped; its absence never fails
    /// the analysis.
    pub async fn run(&self, code: &str, language: &str) -> AuxiliaryFindings {
        let mut combined = AuxiliaryFindings::default();

        for scanner in self.scanners.iter().filter(|s| s.supports(language)) {
            tracing::debug!(scanner = scanner.name(), language, "Running auxiliary scanner");
            match scanner.scan(code, language).await {
                Ok(findings) => combined.absorb(findings),
                Err(e) => {
                    tracing::warn!(scanner = scanner.name(), error = %e, "Auxiliary scanner failed");
                }
            }
        }

        combined
    }
}
