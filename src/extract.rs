//! Isolate a JSON document from free-form model output.
//!
//! Models wrap their answer in markdown fences, add prose around it, or
//! ignore the format entirely. Strategies are tried in order:
//!
//! 1. the first fence tagged `json`,
//! 2. the first fence of any kind,
//! 3. the whole text.
//!
//! Only the first fence pair is considered at each step. An opening fence
//! without a closing one falls through to the next strategy.

use crate::error::{AnalysisError, Result};
use serde_json::Value;

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Body of the first ```` ```json ```` fence, if it is closed.
fn json_fenced(raw: &str) -> Option<&str> {
    let start = raw.find(JSON_FENCE)? + JSON_FENCE.len();
    let len = raw[start..].find(FENCE)?;
    Some(raw[start..start + len].trim())
}

/// Body of the first fence of any kind, if it is closed. A language tag
/// directly after the opening fence is dropped.
fn any_fenced(raw: &str) -> Option<&str> {
    let start = raw.find(FENCE)? + FENCE.len();
    let len = raw[start..].find(FENCE)?;
    let body = &raw[start..start + len];

    let body = match body.find('\n') {
        Some(nl) if is_info_string(&body[..nl]) => &body[nl + 1..],
        _ => body,
    };
    Some(body.trim())
}

fn is_info_string(line: &str) -> bool {
    let tag = line.trim();
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
}

/// Candidate JSON text, without validating it.
fn candidate(raw: &str) -> &str {
    json_fenced(raw)
        .or_else(|| any_fenced(raw))
        .unwrap_or_else(|| raw.trim())
}

/// Extract and parse the JSON document embedded in `raw`.
pub fn extract_value(raw: &str) -> Result<Value> {
    let text = candidate(raw);
    serde_json::from_str(text).map_err(|e| AnalysisError::MalformedResponse(e.to_string()))
}

/// Extract the JSON text embedded in `raw`, verifying that it parses.
///
/// Bare JSON input comes back trimmed and otherwise unchanged.
pub fn extract_json(raw: &str) -> Result<String> {
    let text = candidate(raw);
    serde_json::from_str::<Value>(text).map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_json_is_returned_trimmed() {
        let raw = "  \n{\"vulnerabilities\": []}\n\t";
        assert_eq!(extract_json(raw).unwrap(), raw.trim());

        let already = "[1, 2, 3]";
        assert_eq!(extract_json(already).unwrap(), already);
        assert_eq!(extract_json(&extract_json(already).unwrap()).unwrap(), already);
    }

    #[test]
    fn test_json_fence_inside_prose() {
        let raw = "Sure! Here is my analysis:\n\n```json\n{\"a\": {\"b\": [1, 2]}}\n```\n\nLet me know if you need more.";
        assert_eq!(extract_json(raw).unwrap(), "{\"a\": {\"b\": [1, 2]}}");
    }

    #[test]
    fn test_json_fence_preferred_over_earlier_fence() {
        let raw = "```python\nprint('x')\n```\nand\n```json\n{\"ok\": true}\n```";
        assert_eq!(extract_json(raw).unwrap(), "{\"ok\": true}");
    }

    #[test]
    fn test_untagged_fence() {
        let raw = "Result:\n```\n{\"ok\": 1}\n```";
        assert_eq!(extract_json(raw).unwrap(), "{\"ok\": 1}");
    }

    #[test]
    fn test_other_language_tag_is_dropped() {
        let raw = "```javascript\n{\"ok\": 1}\n```";
        assert_eq!(extract_json(raw).unwrap(), "{\"ok\": 1}");
    }

    #[test]
    fn test_only_first_fence_pair_is_used() {
        let raw = "```json\n{\"first\": 1}\n```\n```json\n{\"second\": 2}\n```";
        assert_eq!(extract_json(raw).unwrap(), "{\"first\": 1}");
    }

    #[test]
    fn test_unclosed_fence_falls_through() {
        let raw = "```json\n{\"truncated\": ";
        assert!(matches!(extract_json(raw), Err(AnalysisError::MalformedResponse(_))));
    }

    #[test]
    fn test_prose_is_malformed() {
        let err = extract_json("I could not find any vulnerabilities.").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
        assert!(extract_json("").is_err());
    }

    #[test]
    fn test_extract_value_parses() {
        let value = extract_value("```json\n{\"vulnerabilities\": [{\"title\": \"X\"}]}\n```").unwrap();
        assert_eq!(value["vulnerabilities"][0]["title"], "X");
    }
}
