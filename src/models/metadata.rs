//! Descriptive metadata derived from a document's text.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Metadata record, keyed by the id of the document it describes.
///
/// `revision` increases on every upsert. The copy embedded in a document
/// carries the revision it was projected from, so a reader can tell whether
/// the embedded copy has fallen behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub id: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub document_type: Option<String>,
    pub tags: Vec<String>,
    pub department: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Metadata {
    /// Drop duplicate and blank tags, keeping first-seen order.
    pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.as_ref().trim();
            if !tag.is_empty() && !out.iter().any(|t| t == tag) {
                out.push(tag.to_string());
            }
        }
        out
    }
}
