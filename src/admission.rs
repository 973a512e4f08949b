//! Request admission at the boundary.
//!
//! The core assumes its inputs are within bounds. Whatever builds an
//! [`AnalysisRequest`] (the CLI here) runs [`admit`] first.

use crate::config::AnalysisSettings;
use crate::types::{AnalysisRequest, SubjectKind};
use std::path::Path;
use thiserror::Error;

/// Limits a request must satisfy before analysis.
#[derive(Debug, Clone)]
pub struct AnalysisLimits {
    pub max_code_lines: usize,
    pub max_diagram_bytes: usize,
    pub allowed_image_types: Vec<String>,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self::from(&AnalysisSettings::default())
    }
}

impl From<&AnalysisSettings> for AnalysisLimits {
    fn from(settings: &AnalysisSettings) -> Self {
        Self {
            max_code_lines: settings.max_code_lines,
            max_diagram_bytes: settings.max_diagram_bytes,
            allowed_image_types: settings
                .allowed_image_types
                .iter()
                .map(|t| t.trim().to_lowercase())
                .collect(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum AdmissionError {
    #[error("{0} is empty")]
    Empty(SubjectKind),

    #[error("code has {lines} lines, limit is {max}")]
    TooManyLines { lines: usize, max: usize },

    #[error("diagram is {bytes} bytes, limit is {max}")]
    TooLarge { bytes: usize, max: usize },

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
}

/// Check a request against the limits.
pub fn admit(request: &AnalysisRequest, limits: &AnalysisLimits) -> Result<(), AdmissionError> {
    match request {
        AnalysisRequest::Code { code, .. } => {
            if code.trim().is_empty() {
                return Err(AdmissionError::Empty(SubjectKind::Code));
            }
            let lines = line_count(code);
            if lines > limits.max_code_lines {
                return Err(AdmissionError::TooManyLines {
                    lines,
                    max: limits.max_code_lines,
                });
            }
        }
        AnalysisRequest::Diagram { bytes, mime_type, .. } => {
            if bytes.is_empty() {
                return Err(AdmissionError::Empty(SubjectKind::Diagram));
            }
            if bytes.len() > limits.max_diagram_bytes {
                return Err(AdmissionError::TooLarge {
                    bytes: bytes.len(),
                    max: limits.max_diagram_bytes,
                });
            }
            let mime = mime_type.trim().to_lowercase();
            if !limits.allowed_image_types.iter().any(|t| *t == mime) {
                return Err(AdmissionError::UnsupportedMediaType(mime_type.clone()));
            }
        }
    }
    Ok(())
}

/// Number of lines as reported in results: newlines plus one, so a
/// trailing newline starts a further (empty) line.
pub fn line_count(code: &str) -> usize {
    code.matches('\n').count() + 1
}

/// Trimmed, lowercased language name.
pub fn normalize_language(language: &str) -> String {
    language.trim().to_lowercase()
}

/// Guess the language of a source file from its extension.
pub fn infer_language(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let language = match ext.as_str() {
        "py" | "pyw" => "python",
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "tsx" | "mts" | "cts" => "typescript",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "rb" => "ruby",
        "php" => "php",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "swift" => "swift",
        "scala" => "scala",
        "sh" | "bash" | "zsh" => "shell",
        "sql" => "sql",
        "tf" => "terraform",
        "yml" | "yaml" => "yaml",
        _ => return None,
    };
    Some(language)
}

/// Guess a diagram's MIME type from its extension.
pub fn infer_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn code(text: &str) -> AnalysisRequest {
        AnalysisRequest::Code {
            code: text.to_string(),
            language: "python".to_string(),
            filename: None,
        }
    }

    fn diagram(size: usize, mime: &str) -> AnalysisRequest {
        AnalysisRequest::Diagram {
            bytes: vec![0u8; size],
            filename: "arch.png".to_string(),
            mime_type: mime.to_string(),
        }
    }

    #[test]
    fn test_code_line_ceiling() {
        let limits = AnalysisLimits {
            max_code_lines: 2,
            ..AnalysisLimits::default()
        };
        assert!(admit(&code("a\nb"), &limits).is_ok());
        assert_eq!(
            admit(&code("a\nb\nc"), &limits),
            Err(AdmissionError::TooManyLines { lines: 3, max: 2 })
        );
    }

    #[test]
    fn test_trailing_newline_counts_as_a_line() {
        let limits = AnalysisLimits {
            max_code_lines: 2,
            ..AnalysisLimits::default()
        };
        assert_eq!(line_count("a = 1\nb = 2\n"), 3);
        assert_eq!(
            admit(&code("a = 1\nb = 2\n"), &limits),
            Err(AdmissionError::TooManyLines { lines: 3, max: 2 })
        );
        assert!(admit(&code("a = 1\nb = 2"), &limits).is_ok());
    }

    #[test]
    fn test_empty_payloads_rejected() {
        let limits = AnalysisLimits::default();
        assert_eq!(
            admit(&code("  \n "), &limits),
            Err(AdmissionError::Empty(SubjectKind::Code))
        );
        assert_eq!(
            admit(&diagram(0, "image/png"), &limits),
            Err(AdmissionError::Empty(SubjectKind::Diagram))
        );
    }

    #[test]
    fn test_diagram_byte_ceiling() {
        let limits = AnalysisLimits {
            max_diagram_bytes: 10,
            ..AnalysisLimits::default()
        };
        assert!(admit(&diagram(10, "image/png"), &limits).is_ok());
        assert_eq!(
            admit(&diagram(11, "image/png"), &limits),
            Err(AdmissionError::TooLarge { bytes: 11, max: 10 })
        );
    }

    #[test]
    fn test_mime_allow_list() {
        let limits = AnalysisLimits::default();
        assert!(admit(&diagram(4, "image/jpeg"), &limits).is_ok());
        assert!(admit(&diagram(4, "Image/SVG+XML"), &limits).is_ok());
        assert_eq!(
            admit(&diagram(4, "application/pdf"), &limits),
            Err(AdmissionError::UnsupportedMediaType("application/pdf".to_string()))
        );
    }

    #[test]
    fn test_infer_language() {
        assert_eq!(infer_language(&PathBuf::from("app/main.PY")), Some("python"));
        assert_eq!(infer_language(&PathBuf::from("lib.rs")), Some("rust"));
        assert_eq!(infer_language(&PathBuf::from("Makefile")), None);
        assert_eq!(infer_language(&PathBuf::from("notes.txt")), None);
    }

    #[test]
    fn test_infer_mime() {
        assert_eq!(infer_mime(&PathBuf::from("a.jpg")), Some("image/jpeg"));
        assert_eq!(infer_mime(&PathBuf::from("a.svg")), Some("image/svg+xml"));
        assert_eq!(infer_mime(&PathBuf::from("a.gif")), None);
    }

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("  Python \n"), "python");
    }
}
