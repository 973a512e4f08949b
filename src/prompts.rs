//! Prompt templates for code and diagram analysis.
//!
//! Templates use `{name}` placeholders and `{{` / `}}` for literal braces.
//! Rendering is a single left-to-right pass, so placeholder-like text inside
//! substituted values (for example `{filename}` appearing in user code) is
//! copied verbatim and never expanded.

use crate::error::{AnalysisError, Result};

/// System prompt for code analysis.
pub const CODE_SYSTEM_PROMPT: &str =
    "You are a security expert analyzing code for vulnerabilities.";

/// System prompt for architecture diagram analysis.
pub const DIAGRAM_SYSTEM_PROMPT: &str = "You are an expert security architect specializing in \
Zero Trust architecture, Secure-by-Design principles, and infrastructure security. \
Analyze architecture diagrams thoroughly and provide detailed, actionable security \
findings in JSON format.";

const CODE_ANALYSIS_TEMPLATE: &str = r#"Perform a thorough security review of the following {language} code.

Review against: OWASP Top 10, CWE Top 25, NIST SSDF and language-specific secure coding practice.

File: {filename}
Language: {language}

```{language}
{code}
```

Report:
1. Every security vulnerability (injection, broken authentication or access control, sensitive data exposure, XXE, XSS, insecure deserialization, SSRF, cryptographic failures, path traversal, race conditions, integer overflow, insecure file handling, business logic flaws).
2. Hardcoded secrets and credentials (API keys, passwords, private keys, tokens, database or cloud credentials).
3. Imported dependencies that are known to be vulnerable, with upgrade advice.
4. Compliance observations (ISO 27001, and PCI DSS, HIPAA or GDPR where the code handles such data).

Respond with ONLY a JSON document of this shape:

```json
{{
  "vulnerabilities": [
    {{
      "id": "CWE-89",
      "title": "SQL Injection",
      "severity": "CRITICAL",
      "confidence": 0.95,
      "location": {{ "file": "{filename}", "line": 42, "column": 5, "snippet": "..." }},
      "description": "What is wrong",
      "impact": "What an attacker gains",
      "exploitability": "HIGH",
      "remediation": "How to fix it",
      "secure_code": "Corrected code",
      "references": ["CWE-89", "OWASP-A03:2021"]
    }}
  ],
  "secrets": [
    {{ "type": "API Key", "line": 15, "description": "Hardcoded API key" }}
  ],
  "dependencies": [
    {{ "name": "flask", "version": "1.0.0", "vulnerabilities": 3, "severity": "HIGH", "recommendation": "Upgrade to flask>=2.0.0" }}
  ],
  "compliance": {{
    "OWASP-2025": {{ "compliant": false, "issues": 5 }}
  }}
}}
```

Severity must be one of CRITICAL, HIGH, MEDIUM, LOW, INFO. Confidence is between 0.0 and 1.0. Give line numbers whenever possible."#;

const DIAGRAM_ANALYSIS_TEMPLATE: &str = r#"Analyze the attached architecture diagram and produce a security assessment.

Consider Zero Trust principles, Secure-by-Design, cloud security practice, network segmentation, identity and access management, data protection, monitoring, and compliance (ISO 27001, NIS2, CIS Benchmarks, SOC2, PCI-DSS).

1. Identify every component (compute, storage, network, identity, ...) and the technologies in use.
2. Assess trust boundaries, data flows, attack surface, privileged access paths and defense in depth.
3. List weaknesses: missing controls, misconfiguration, single points of failure, weak encryption, insufficient monitoring, exposed services, missing backups.
4. Propose a Zero Trust target state and Secure-by-Design improvements.
5. Assess compliance gaps.

Respond with ONLY a JSON document of this shape:

```json
{{
  "components": [
    {{ "name": "Web Application", "type": "compute", "description": "Frontend", "technologies": ["nginx"], "security_controls": ["WAF"] }}
  ],
  "security_assessment": {{
    "overall": "Summary of the security posture",
    "risk_level": "MEDIUM",
    "strengths": ["..."],
    "concerns": ["..."]
  }},
  "weaknesses": [
    {{ "title": "Lack of Network Segmentation", "severity": "HIGH", "description": "...", "affected_components": ["..."], "recommendation": "...", "references": ["NIST-800-207"] }}
  ],
  "zero_trust_proposal": {{
    "network_segmentation": ["..."], "identity_access": ["..."], "encryption": ["..."], "monitoring": ["..."]
  }},
  "secure_by_design": {{
    "hardening": ["..."], "redundancy": ["..."], "data_protection": ["..."], "best_practices": ["..."]
  }},
  "compliance": {{
    "ISO-27001": {{ "compliant": false, "issues": 12, "details": "..." }}
  }}
}}
```"#;

/// Substitute `{name}` placeholders in one pass.
///
/// Unknown placeholders and unbalanced braces are template bugs and
/// reported as `AnalysisFailed`.
pub fn render(template: &str, vars: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(template.len() + vars.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('{') {
            let end = tail.find('}').ok_or_else(|| {
                AnalysisError::AnalysisFailed("unterminated placeholder in prompt template".to_string())
            })?;
            let name = &tail[1..end];
            let value = vars
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| {
                    AnalysisError::AnalysisFailed(format!("unknown prompt placeholder: {}", name))
                })?;
            out.push_str(value);
            rest = &tail[end + 1..];
        } else {
            return Err(AnalysisError::AnalysisFailed(
                "unmatched '}' in prompt template".to_string(),
            ));
        }
    }
    out.push_str(rest);

    Ok(out)
}

/// Builds the prompt text sent to the model.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Prompt for a code analysis. `filename` defaults to `unknown`.
    pub fn build_code_prompt(&self, code: &str, language: &str, filename: Option<&str>) -> Result<String> {
        render(
            CODE_ANALYSIS_TEMPLATE,
            &[
                ("language", language),
                ("filename", filename.unwrap_or("unknown")),
                ("code", code),
            ],
        )
    }

    /// Prompt for a diagram analysis. Static; only the attached image varies.
    pub fn build_diagram_prompt(&self) -> Result<String> {
        render(DIAGRAM_ANALYSIS_TEMPLATE, &[])
    }
}
