//! Merge AI and auxiliary findings and derive severity counts.

use crate::normalize::CodeFindings;
use crate::scanners::AuxiliaryFindings;
use crate::types::{Severity, SeveritySummary, Vulnerability};

/// Append auxiliary findings after the primary ones.
///
/// Dependencies and compliance come only from the primary source.
pub fn merge(primary: CodeFindings, auxiliary: AuxiliaryFindings) -> CodeFindings {
    let mut merged = primary;
    merged.vulnerabilities.extend(auxiliary.vulnerabilities);
    merged.secrets.extend(auxiliary.secrets);
    merged
}

/// Count vulnerabilities per severity bucket.
///
/// `total` is always the list length. Non-canonical severities land in
/// `unknown`, so the six buckets always sum to `total`.
pub fn recompute_summary(vulnerabilities: &[Vulnerability]) -> SeveritySummary {
    vulnerabilities
        .iter()
        .fold(SeveritySummary::default(), |mut summary, v| {
            summary.total += 1;
            match v.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => summary.info += 1,
                Severity::Other(_) => summary.unknown += 1,
            }
            summary
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_vulnerability;
    use crate::types::Secret;
    use serde_json::json;

    fn vuln(id: &str, severity: &str) -> Vulnerability {
        normalize_vulnerability(&json!({ "id": id, "severity": severity })).unwrap()
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(recompute_summary(&[]), SeveritySummary::default());
    }

    #[test]
    fn test_summary_counts_each_bucket() {
        let vulns = vec![
            vuln("a", "CRITICAL"),
            vuln("b", "critical"),
            vuln("c", "High"),
            vuln("d", "medium"),
            vuln("e", "LOW"),
            vuln("f", "info"),
            vuln("g", "bogus"),
        ];
        let summary = recompute_summary(&vulns);

        assert_eq!(summary.total, 7);
        assert_eq!(summary.critical, 2);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.medium, 1);
        assert_eq!(summary.low, 1);
        assert_eq!(summary.info, 1);
        assert_eq!(summary.unknown, 1);
    }

    #[test]
    fn test_buckets_sum_to_total() {
        let severities = ["CRITICAL", "HIGH", "weird", "LOW", "", "INFO", "MEDIUM", "medium"];
        for n in 0..=severities.len() {
            let vulns: Vec<_> = severities[..n]
                .iter()
                .enumerate()
                .map(|(i, s)| vuln(&i.to_string(), s))
                .collect();
            let s = recompute_summary(&vulns);
            let canonical = vulns.iter().filter(|v| v.severity.is_canonical()).count();

            assert_eq!(s.total, vulns.len());
            assert_eq!(s.critical + s.high + s.medium + s.low + s.info, canonical);
            assert_eq!(s.critical + s.high + s.medium + s.low + s.info + s.unknown, s.total);
        }
    }

    #[test]
    fn test_merge_preserves_order() {
        let primary = CodeFindings {
            vulnerabilities: vec![vuln("v1", "HIGH")],
            secrets: vec![Secret {
                secret_type: "Password".to_string(),
                line: 3,
                description: "ai".to_string(),
            }],
            ..CodeFindings::default()
        };
        let auxiliary = AuxiliaryFindings {
            vulnerabilities: vec![vuln("v2", "LOW"), vuln("v3", "CRITICAL")],
            secrets: vec![Secret {
                secret_type: "Token".to_string(),
                line: 9,
                description: "tool".to_string(),
            }],
        };

        let merged = merge(primary, auxiliary);
        let ids: Vec<_> = merged.vulnerabilities.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v2", "v3"]);
        assert_eq!(merged.secrets[1].secret_type, "Token");

        let summary = recompute_summary(&merged.vulnerabilities);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.low, 1);
        assert_eq!(summary.critical, 1);
    }
}
