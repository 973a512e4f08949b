//! End-to-end analysis through the public API with scripted providers.

use async_trait::async_trait;
use shadowscan::{
    normalize_vulnerability, AnalysisError, AnalysisReport, AnalysisRequest, Analyzer,
    AuxiliaryFindings, AuxiliaryScanner, Capability, LineRef, ScannerSet, ScriptedProvider, Severity,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const SQLI_RESPONSE: &str = r#"Here is the security analysis you asked for.

```json
{
  "vulnerabilities": [
    {
      "id": "CWE-89",
      "title": "SQL Injection",
      "severity": "CRITICAL",
      "confidence": 0.95,
      "description": "User input is concatenated into a SQL query.",
      "impact": "Database compromise",
      "exploitability": "HIGH",
      "location": { "line": 1, "column": 10, "snippet": "\"SELECT * FROM t WHERE id=\" + x" },
      "remediation": "Use parameterized queries",
      "references": ["https://cwe.mitre.org/data/definitions/89.html"]
    }
  ],
  "dependencies": [],
  "secrets": [],
  "compliance": { "OWASP": { "compliant": false, "issues": 1 } }
}
```

Let me know if you need anything else."#;

struct SingleFindingScanner(&'static str);

#[async_trait]
impl AuxiliaryScanner for SingleFindingScanner {
    fn name(&self) -> &str {
        self.0
    }

    fn supports(&self, _language: &str) -> bool {
        true
    }

    async fn scan(&self, _code: &str, _language: &str) -> anyhow::Result<AuxiliaryFindings> {
        Ok(AuxiliaryFindings {
            vulnerabilities: vec![
                normalize_vulnerability(&json!({ "id": self.0, "severity": "low" })).unwrap(),
            ],
            secrets: Vec::new(),
        })
    }
}

#[tokio::test]
async fn test_sql_injection_end_to_end() {
    let provider = Arc::new(ScriptedProvider::returning(SQLI_RESPONSE));
    let analyzer = Analyzer::new().with_text_provider(provider.clone());

    let result = analyzer
        .analyze_code("\"SELECT * FROM t WHERE id=\" + x", "python", None)
        .await
        .unwrap();

    assert_eq!(provider.call_count(), 1);
    assert_eq!(result.summary.total, 1);
    assert_eq!(result.summary.critical, 1);
    assert_eq!(result.summary.high, 0);
    assert_eq!(result.summary.medium, 0);
    assert_eq!(result.summary.low, 0);
    assert_eq!(result.summary.info, 0);
    assert_eq!(result.summary.unknown, 0);

    let vuln = &result.vulnerabilities[0];
    assert_eq!(vuln.id, "CWE-89");
    assert_eq!(vuln.severity, Severity::Critical);
    assert_eq!(
        vuln.location.as_ref().and_then(|l| l.line.clone()),
        Some(LineRef::from(1))
    );
    assert_eq!(vuln.location.as_ref().and_then(|l| l.column), Some(10));
    assert!(!result.compliance["OWASP"].compliant);
    assert_eq!(result.language.as_deref(), Some("python"));
}

#[tokio::test]
async fn test_non_json_output_yields_empty_result() {
    let analyzer = Analyzer::new().with_text_provider(Arc::new(ScriptedProvider::returning(
        "I'm sorry, I cannot analyze this code.",
    )));

    let result = analyzer.analyze_code("x = 1", "python", None).await.unwrap();
    assert!(result.vulnerabilities.is_empty());
    assert_eq!(result.summary.total, 0);
    assert!(result.secrets.is_empty());
    assert!(result.dependencies.is_empty());
    assert!(result.compliance.is_empty());
    assert!(result.metadata.contains_key("code_hash"));
}

#[tokio::test]
async fn test_auxiliary_findings_follow_ai_findings() {
    let scanners = ScannerSet::new()
        .with_scanner(Box::new(SingleFindingScanner("v2")))
        .with_scanner(Box::new(SingleFindingScanner("v3")));
    let analyzer = Analyzer::new()
        .with_text_provider(Arc::new(ScriptedProvider::returning(
            r#"{"vulnerabilities": [{"id": "v1", "severity": "HIGH"}]}"#,
        )))
        .with_scanners(scanners);

    let result = analyzer.analyze_code("eval(x)", "javascript", None).await.unwrap();
    let ids: Vec<_> = result.vulnerabilities.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["v1", "v2", "v3"]);
    assert_eq!(result.summary.total, 3);
    assert_eq!(result.summary.high, 1);
    assert_eq!(result.summary.low, 2);
}

#[tokio::test]
async fn test_unrecognized_severity_is_counted() {
    let analyzer = Analyzer::new().with_text_provider(Arc::new(ScriptedProvider::returning(
        r#"[{"title": "A", "severity": "severe"}, {"title": "B", "severity": "low"}]"#,
    )));

    let result = analyzer.analyze_code("x", "go", None).await.unwrap();
    assert_eq!(result.summary.total, 2);
    assert_eq!(result.summary.low, 1);
    assert_eq!(result.summary.unknown, 1);
    assert_eq!(result.vulnerabilities[0].severity, Severity::Other("SEVERE".to_string()));
}

#[tokio::test]
async fn test_provider_errors_are_surfaced() {
    let analyzer =
        Analyzer::new().with_text_provider(Arc::new(ScriptedProvider::failing("connection refused")));
    let err = analyzer.analyze_code("x", "python", None).await.unwrap_err();
    assert!(matches!(err, AnalysisError::ProviderCallFailed { .. }));

    let analyzer = Analyzer::new()
        .with_text_provider(Arc::new(ScriptedProvider::hanging(Duration::from_secs(30))))
        .with_timeout(Duration::from_millis(25));
    let err = analyzer.analyze_code("x", "python", None).await.unwrap_err();
    assert!(matches!(err, AnalysisError::ProviderTimeout { .. }));

    let err = Analyzer::new().analyze_code("x", "python", None).await.unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::ProviderUnavailable(Capability::TextGeneration)
    ));
}

#[tokio::test]
async fn test_dispatch_by_request_kind() {
    let provider = Arc::new(ScriptedProvider::returning(
        r#"{"components": [{"name": "API Gateway", "type": "gateway"}]}"#,
    ));
    let analyzer = Analyzer::new()
        .with_text_provider(provider.clone())
        .with_vision_provider(provider);

    let request = AnalysisRequest::Diagram {
        bytes: vec![1, 2, 3],
        filename: "arch.png".to_string(),
        mime_type: "image/png".to_string(),
    };
    match analyzer.analyze(&request).await.unwrap() {
        AnalysisReport::Diagram(diagram) => {
            assert_eq!(diagram.components[0].name, "API Gateway");
            assert_eq!(diagram.components[0].component_type, "gateway");
            assert_eq!(diagram.metadata["filename"], "arch.png");
        }
        AnalysisReport::Code(_) => panic!("expected a diagram report"),
    }

    let request = AnalysisRequest::Code {
        code: "x".to_string(),
        language: "rust".to_string(),
        filename: Some("main.rs".to_string()),
    };
    assert!(matches!(
        analyzer.analyze(&request).await.unwrap(),
        AnalysisReport::Code(_)
    ));
}

#[tokio::test]
async fn test_result_json_shape() {
    let analyzer = Analyzer::new().with_text_provider(Arc::new(ScriptedProvider::returning(SQLI_RESPONSE)));
    let result = analyzer.analyze_code("q", "python", Some("db.py")).await.unwrap();

    let value = serde_json::to_value(AnalysisReport::Code(result)).unwrap();
    for key in [
        "analysis_id",
        "timestamp",
        "vulnerabilities",
        "summary",
        "dependencies",
        "secrets",
        "compliance",
        "metadata",
    ] {
        assert!(value.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(value["summary"]["critical"], 1);
    assert_eq!(value["metadata"]["filename"], "db.py");
    assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
}
