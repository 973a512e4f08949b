//! Core types for analysis requests and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Severity of a vulnerability or architecture weakness.
///
/// Model output is free text, so anything outside the five canonical
/// levels is kept verbatim (uppercased) in `Other` instead of being
/// coerced into a bucket it does not belong to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
    Other(String),
}

impl Severity {
    /// Normalize a raw severity string: trim, uppercase, match the canonical levels.
    pub fn normalize(raw: &str) -> Self {
        let upper = raw.trim().to_uppercase();
        match upper.as_str() {
            "CRITICAL" => Severity::Critical,
            "HIGH" => Severity::High,
            "MEDIUM" => Severity::Medium,
            "LOW" => Severity::Low,
            "INFO" => Severity::Info,
            _ => Severity::Other(upper),
        }
    }

    /// Parse a user-supplied threshold; only canonical levels are accepted.
    pub fn parse_threshold(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" => Some(Severity::Info),
            "low" => Some(Severity::Low),
            "medium" | "med" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" | "crit" => Some(Severity::Critical),
            _ => None,
        }
    }

    pub fn is_canonical(&self) -> bool {
        !matches!(self, Severity::Other(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
            Severity::Other(s) => s,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Severity::Other(_) => 0,
            Severity::Info => 1,
            Severity::Low => 2,
            Severity::Medium => 3,
            Severity::High => 4,
            Severity::Critical => 5,
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Medium
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.as_str().cmp(other.as_str()))
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        Severity::normalize(&s)
    }
}

impl From<Severity> for String {
    fn from(s: Severity) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line reference exactly as the model wrote it: a number (possibly
/// negative or fractional) or free text such as `"15-20"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineRef {
    Number(serde_json::Number),
    Text(String),
}

impl LineRef {
    /// The line as a plain non-negative integer, if it is one.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            LineRef::Number(n) => n.as_u64(),
            LineRef::Text(_) => None,
        }
    }
}

impl From<u64> for LineRef {
    fn from(line: u64) -> Self {
        LineRef::Number(line.into())
    }
}

impl fmt::Display for LineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineRef::Number(n) => write!(f, "{}", n),
            LineRef::Text(s) => f.write_str(s),
        }
    }
}

/// Where in the analyzed code a vulnerability was reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<LineRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// A single security vulnerability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// CWE or other identifier, `UNKNOWN` when the model gave none.
    pub id: String,
    pub title: String,
    pub severity: Severity,
    /// Model confidence in `[0, 1]`.
    pub confidence: f64,
    pub description: String,
    pub impact: String,
    pub exploitability: String,
    pub remediation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure_code: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

/// Hardcoded credential detected in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    #[serde(rename = "type")]
    pub secret_type: String,
    pub line: u64,
    pub description: String,
}

/// A third-party dependency with known problems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyFinding {
    pub name: String,
    pub version: String,
    /// Number of known vulnerabilities.
    pub vulnerabilities: u64,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

/// Compliance status for one framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceEntry {
    pub compliant: bool,
    pub issues: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Compliance entries keyed by framework name.
pub type Compliance = BTreeMap<String, ComplianceEntry>;

/// Result metadata (digest, size, model, schema version).
pub type Metadata = BTreeMap<String, Value>;

/// Per-severity counts. Always derived from a vulnerability list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    /// Entries whose severity is not one of the canonical levels.
    pub unknown: usize,
}

/// Complete result of a code analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeAnalysis {
    pub analysis_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub vulnerabilities: Vec<Vulnerability>,
    pub summary: SeveritySummary,
    pub dependencies: Vec<DependencyFinding>,
    pub secrets: Vec<Secret>,
    pub compliance: Compliance,
    pub metadata: Metadata,
}

impl CodeAnalysis {
    /// Highest canonical severity among the vulnerabilities.
    pub fn max_severity(&self) -> Option<Severity> {
        self.vulnerabilities
            .iter()
            .map(|v| v.severity.clone())
            .filter(Severity::is_canonical)
            .max()
    }
}

/// An architecture component identified in a diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureComponent {
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub security_controls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityAssessment {
    pub overall: String,
    pub risk_level: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
}

impl SecurityAssessment {
    /// Assessment used when the model omitted one.
    pub fn completed() -> Self {
        Self {
            overall: "Analysis completed".to_string(),
            risk_level: "MEDIUM".to_string(),
            strengths: Vec::new(),
            concerns: Vec::new(),
        }
    }

    /// Assessment used when the model output could not be parsed at all.
    pub fn limited() -> Self {
        Self {
            overall: "Analysis completed with limited results".to_string(),
            risk_level: "UNKNOWN".to_string(),
            strengths: Vec::new(),
            concerns: Vec::new(),
        }
    }
}

/// A weakness in the analyzed architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityWeakness {
    pub title: String,
    pub severity: Severity,
    pub description: String,
    #[serde(default)]
    pub affected_components: Vec<String>,
    pub recommendation: String,
    #[serde(default)]
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZeroTrustProposal {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_segmentation: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_access: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecureByDesign {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardening: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redundancy: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_protection: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_practices: Option<Vec<String>>,
}

/// Complete result of an architecture diagram analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramAnalysis {
    pub analysis_id: String,
    pub timestamp: DateTime<Utc>,
    pub components: Vec<ArchitectureComponent>,
    pub security_assessment: SecurityAssessment,
    pub weaknesses: Vec<SecurityWeakness>,
    pub zero_trust_proposal: ZeroTrustProposal,
    pub secure_by_design: SecureByDesign,
    pub compliance: Compliance,
    pub metadata: Metadata,
}

/// What the caller wants analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectKind {
    Code,
    Diagram,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::Code => write!(f, "code"),
            SubjectKind::Diagram => write!(f, "diagram"),
        }
    }
}

/// A single analysis request, built by the boundary layer.
#[derive(Debug, Clone)]
pub enum AnalysisRequest {
    Code {
        code: String,
        language: String,
        filename: Option<String>,
    },
    Diagram {
        bytes: Vec<u8>,
        filename: String,
        mime_type: String,
    },
}

impl AnalysisRequest {
    pub fn kind(&self) -> SubjectKind {
        match self {
            AnalysisRequest::Code { .. } => SubjectKind::Code,
            AnalysisRequest::Diagram { .. } => SubjectKind::Diagram,
        }
    }
}

/// Either kind of analysis result.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnalysisReport {
    Code(CodeAnalysis),
    Diagram(DiagramAnalysis),
}
