//! Rule-based metadata extraction from OCR text.
//!
//! Everything here is pure: the same text and hint always yield the same
//! [`ExtractedMetadata`]. No I/O, no clock, no randomness.

mod classify;
mod dates;
mod text;

pub use classify::{classify, Classification};
pub use dates::find_expiration_date;
pub use text::{describe, keywords, normalize, DESCRIPTION_MAX_CHARS, MAX_KEYWORDS};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Metadata inferred from a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedMetadata {
    pub description: Option<String>,
    pub category: String,
    pub document_type: String,
    pub tags: Vec<String>,
    pub department: Option<String>,
    pub expiration_date: Option<NaiveDate>,
}

/// Run every extraction rule over `text`.
///
/// `department_hint` is carried through unchanged; nothing in the text
/// overrides it.
pub fn extract(text: &str, department_hint: Option<&str>) -> ExtractedMetadata {
    let normalized = normalize(text);
    let Classification {
        category,
        document_type,
    } = classify(&normalized);

    ExtractedMetadata {
        description: describe(&normalized),
        category: category.to_string(),
        document_type: document_type.to_string(),
        tags: keywords(&normalized),
        department: department_hint
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        expiration_date: find_expiration_date(&normalized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_is_deterministic() {
        let text = "INVOICE 2024-12-31\r\n\r\n\r\nTotal due:   100\tUSD. Contract ref 7.";
        let a = extract(text, Some("Finance"));
        let b = extract(text, Some("Finance"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_extract_full() {
        let text = "Service agreement between parties.\n\nEffective until 2026-03-01.";
        let meta = extract(text, Some("  Legal  "));
        assert_eq!(meta.category, "Legal");
        assert_eq!(meta.document_type, "Contract");
        assert_eq!(meta.department.as_deref(), Some("Legal"));
        assert_eq!(meta.expiration_date, NaiveDate::from_ymd_opt(2026, 3, 1));
        assert!(meta.tags.contains(&"agreement".to_string()));
    }

    #[test]
    fn test_extract_empty_text() {
        let meta = extract("   \n\n  ", None);
        assert_eq!(meta.description, None);
        assert_eq!(meta.category, "General");
        assert_eq!(meta.document_type, "Document");
        assert!(meta.tags.is_empty());
        assert_eq!(meta.department, None);
        assert_eq!(meta.expiration_date, None);
    }
}
