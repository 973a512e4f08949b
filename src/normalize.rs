//! Map loosely-shaped model JSON onto the result schema.
//!
//! Nothing here rejects a record for missing fields: defaults fill the
//! gaps. Only entries that are not JSON objects are dropped, and any
//! container that is missing or has the wrong type becomes empty.

use crate::types::{
    ArchitectureComponent, Compliance, ComplianceEntry, DependencyFinding, LineRef, Location, Secret,
    SecureByDesign, SecurityAssessment, SecurityWeakness, Severity, Vulnerability,
    ZeroTrustProposal,
};
use serde_json::{Map, Value};

pub const DEFAULT_ID: &str = "UNKNOWN";
pub const DEFAULT_TITLE: &str = "Unknown Vulnerability";
pub const DEFAULT_SEVERITY: &str = "MEDIUM";
pub const DEFAULT_CONFIDENCE: f64 = 0.8;
pub const DEFAULT_EXPLOITABILITY: &str = "MEDIUM";

/// Findings extracted from a code-analysis response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeFindings {
    pub vulnerabilities: Vec<Vulnerability>,
    pub secrets: Vec<Secret>,
    pub dependencies: Vec<DependencyFinding>,
    pub compliance: Compliance,
}

/// Findings extracted from a diagram-analysis response.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramFindings {
    pub components: Vec<ArchitectureComponent>,
    pub security_assessment: SecurityAssessment,
    pub weaknesses: Vec<SecurityWeakness>,
    pub zero_trust_proposal: ZeroTrustProposal,
    pub secure_by_design: SecureByDesign,
    pub compliance: Compliance,
}

impl DiagramFindings {
    /// Result used when the model output could not be parsed.
    pub fn limited() -> Self {
        Self {
            components: Vec::new(),
            security_assessment: SecurityAssessment::limited(),
            weaknesses: Vec::new(),
            zero_trust_proposal: ZeroTrustProposal::default(),
            secure_by_design: SecureByDesign::default(),
            compliance: Compliance::new(),
        }
    }
}

/// Normalize a parsed code-analysis response.
///
/// A top-level array is read as the vulnerability list.
pub fn normalize(parsed: &Value) -> CodeFindings {
    if let Value::Array(items) = parsed {
        return CodeFindings {
            vulnerabilities: items.iter().filter_map(normalize_vulnerability).collect(),
            ..CodeFindings::default()
        };
    }

    CodeFindings {
        vulnerabilities: parsed
            .get("vulnerabilities")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(normalize_vulnerability)
            .collect(),
        secrets: objects(parsed.get("secrets"))
            .map(normalize_secret)
            .collect(),
        dependencies: objects(parsed.get("dependencies"))
            .map(normalize_dependency)
            .collect(),
        compliance: normalize_compliance(parsed.get("compliance")),
    }
}

/// Normalize a single vulnerability-shaped value. `None` if it is not an object.
pub fn normalize_vulnerability(value: &Value) -> Option<Vulnerability> {
    let obj = value.as_object()?;

    Some(Vulnerability {
        id: text(obj, &["id"]).unwrap_or_else(|| DEFAULT_ID.to_string()),
        title: text(obj, &["title"]).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        severity: Severity::normalize(
            &text(obj, &["severity"]).unwrap_or_else(|| DEFAULT_SEVERITY.to_string()),
        ),
        confidence: number(obj, &["confidence"])
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_CONFIDENCE),
        description: text(obj, &["description"]).unwrap_or_default(),
        impact: text(obj, &["impact"]).unwrap_or_default(),
        exploitability: text(obj, &["exploitability"])
            .unwrap_or_else(|| DEFAULT_EXPLOITABILITY.to_string()),
        remediation: text(obj, &["remediation"]).unwrap_or_default(),
        location: obj.get("location").and_then(normalize_location),
        secure_code: text(obj, &["secure_code", "secureCode", "secure_code_sample"]),
        references: string_list(obj.get("references")),
    })
}

fn normalize_location(value: &Value) -> Option<Location> {
    let obj = value.as_object()?;
    Some(Location {
        file: text(obj, &["file"]),
        line: line_ref(obj.get("line")),
        column: unsigned(obj, &["column"]),
        snippet: text(obj, &["snippet"]),
    })
}

/// Line as written: numbers keep their exact JSON form, text is kept verbatim.
fn line_ref(value: Option<&Value>) -> Option<LineRef> {
    match value? {
        Value::Number(n) => Some(LineRef::Number(n.clone())),
        Value::String(s) => Some(LineRef::Text(s.clone())),
        _ => None,
    }
}

fn normalize_secret(obj: &Map<String, Value>) -> Secret {
    Secret {
        secret_type: text(obj, &["type", "secret_type"]).unwrap_or_else(|| "Unknown".to_string()),
        line: unsigned(obj, &["line"]).unwrap_or(0),
        description: text(obj, &["description"]).unwrap_or_default(),
    }
}

fn normalize_dependency(obj: &Map<String, Value>) -> DependencyFinding {
    let count = match obj.get("vulnerabilities").or_else(|| obj.get("vulnerability_count")) {
        Some(Value::Array(items)) => items.len() as u64,
        _ => unsigned(obj, &["vulnerabilities", "vulnerability_count"]).unwrap_or(0),
    };

    DependencyFinding {
        name: text(obj, &["name"]).unwrap_or_else(|| "unknown".to_string()),
        version: text(obj, &["version"]).unwrap_or_else(|| "unknown".to_string()),
        vulnerabilities: count,
        severity: Severity::normalize(
            &text(obj, &["severity"]).unwrap_or_else(|| DEFAULT_SEVERITY.to_string()),
        ),
        recommendation: text(obj, &["recommendation"]),
    }
}

fn normalize_compliance(value: Option<&Value>) -> Compliance {
    let Some(map) = value.and_then(Value::as_object) else {
        return Compliance::new();
    };

    map.iter()
        .filter_map(|(framework, entry)| {
            let obj = entry.as_object()?;
            Some((
                framework.clone(),
                ComplianceEntry {
                    compliant: obj.get("compliant").and_then(Value::as_bool).unwrap_or(false),
                    issues: unsigned(obj, &["issues", "issue_count"]).unwrap_or(0),
                    details: text(obj, &["details"]),
                },
            ))
        })
        .collect()
}

/// Normalize a parsed diagram-analysis response.
pub fn normalize_diagram(parsed: &Value) -> DiagramFindings {
    DiagramFindings {
        components: objects(parsed.get("components"))
            .map(|obj| ArchitectureComponent {
                name: text(obj, &["name"]).unwrap_or_else(|| "Unknown Component".to_string()),
                component_type: text(obj, &["type"]).unwrap_or_else(|| "unknown".to_string()),
                description: text(obj, &["description"]),
                technologies: string_list(obj.get("technologies")),
                security_controls: string_list(obj.get("security_controls")),
            })
            .collect(),
        security_assessment: parsed
            .get("security_assessment")
            .and_then(Value::as_object)
            .map(|obj| {
                let fallback = SecurityAssessment::completed();
                SecurityAssessment {
                    overall: text(obj, &["overall"]).unwrap_or(fallback.overall),
                    risk_level: text(obj, &["risk_level"])
                        .map(|r| r.trim().to_uppercase())
                        .unwrap_or(fallback.risk_level),
                    strengths: string_list(obj.get("strengths")),
                    concerns: string_list(obj.get("concerns")),
                }
            })
            .unwrap_or_else(SecurityAssessment::completed),
        weaknesses: objects(parsed.get("weaknesses"))
            .map(|obj| SecurityWeakness {
                title: text(obj, &["title"]).unwrap_or_else(|| "Unknown Weakness".to_string()),
                severity: Severity::normalize(
                    &text(obj, &["severity"]).unwrap_or_else(|| DEFAULT_SEVERITY.to_string()),
                ),
                description: text(obj, &["description"]).unwrap_or_default(),
                affected_components: string_list(obj.get("affected_components")),
                recommendation: text(obj, &["recommendation"]).unwrap_or_default(),
                references: string_list(obj.get("references")),
            })
            .collect(),
        zero_trust_proposal: parsed
            .get("zero_trust_proposal")
            .and_then(Value::as_object)
            .map(|obj| ZeroTrustProposal {
                network_segmentation: optional_list(obj, "network_segmentation"),
                identity_access: optional_list(obj, "identity_access"),
                encryption: optional_list(obj, "encryption"),
                monitoring: optional_list(obj, "monitoring"),
            })
            .unwrap_or_default(),
        secure_by_design: parsed
            .get("secure_by_design")
            .and_then(Value::as_object)
            .map(|obj| SecureByDesign {
                hardening: optional_list(obj, "hardening"),
                redundancy: optional_list(obj, "redundancy"),
                data_protection: optional_list(obj, "data_protection"),
                best_practices: optional_list(obj, "best_practices"),
            })
            .unwrap_or_default(),
        compliance: normalize_compliance(parsed.get("compliance")),
    }
}

/// Object entries of an array value; everything else is skipped.
fn objects(value: Option<&Value>) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

/// First present key rendered as text. Numbers and booleans are stringified.
fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn number(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn unsigned(obj: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn optional_list(obj: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    obj.get(key)
        .filter(|v| !v.is_null())
        .map(|v| string_list(Some(v)))
}
