//! Whitespace normalization, descriptions and keyword ranking.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Longest description paragraph kept before truncation.
pub const DESCRIPTION_MAX_CHARS: usize = 240;

/// Number of keywords kept as tags.
pub const MAX_KEYWORDS: usize = 10;

/// A first paragraph shorter than this is treated as a heading.
const HEADING_MAX_CHARS: usize = 30;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "to", "of", "in", "on", "for", "with", "is", "are", "was",
    "were", "be", "been", "by", "as", "at", "from", "this", "that", "these", "those", "it", "its",
    "into", "each", "must", "should", "include", "including", "section", "chapter",
];

static HORIZONTAL_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9]{3,}").unwrap());

/// Canonical line endings, single spaces, at most one blank line, trimmed.
pub fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let spaced = HORIZONTAL_WS.replace_all(&unified, " ");
    let collapsed = BLANK_RUNS.replace_all(&spaced, "\n\n");
    collapsed.trim().to_string()
}

fn truncate(paragraph: &str) -> String {
    let paragraph = paragraph.trim();
    if paragraph.chars().count() <= DESCRIPTION_MAX_CHARS {
        return paragraph.to_string();
    }
    let head: String = paragraph.chars().take(DESCRIPTION_MAX_CHARS).collect();
    format!("{}...", head.trim_end())
}

/// Short description from the leading paragraph(s) of normalized text.
///
/// A heading-length first paragraph is joined with the one after it.
pub fn describe(normalized: &str) -> Option<String> {
    let mut paragraphs = normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let first = truncate(paragraphs.next()?);
    if first.chars().count() < HEADING_MAX_CHARS {
        if let Some(second) = paragraphs.next() {
            return Some(format!("{} — {}", first, truncate(second)));
        }
    }
    Some(first)
}

/// Most frequent non-stop-word tokens, ties broken alphabetically.
pub fn keywords(normalized: &str) -> Vec<String> {
    let lowered = normalized.to_lowercase();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in TOKEN.find_iter(&lowered).map(|m| m.as_str()) {
        if !STOP_WORDS.contains(&token) {
            *counts.entry(token).or_default() += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(token, _)| token.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        let raw = "  Line one\r\nline\t\t two\r\r\r\rafter   gap  ";
        assert_eq!(normalize(raw), "Line one\nline two\n\nafter gap");
    }

    #[test]
    fn test_keywords_rank_by_frequency() {
        let tags = keywords("alpha beta beta gamma gamma gamma");
        assert_eq!(&tags[..2], &["gamma".to_string(), "beta".to_string()]);
        assert_eq!(tags.len(), 3);
    }

    #[test]
    fn test_keywords_skip_stop_words_and_short_tokens() {
        let tags = keywords("The section of the report is in it. Report ok.");
        assert_eq!(tags, vec!["report".to_string()]);
    }

    #[test]
    fn test_keywords_tie_break_alphabetical() {
        let tags = keywords("zeta alpha mid");
        assert_eq!(tags, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_keywords_capped() {
        let text = (0..15)
            .map(|i| format!("word{:02}", i))
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(keywords(&text).len(), MAX_KEYWORDS);
    }

    #[test]
    fn test_describe_single_paragraph() {
        let text = "A reasonably long opening paragraph about the archive.";
        assert_eq!(describe(text).as_deref(), Some(text));
    }

    #[test]
    fn test_describe_joins_heading() {
        let text = "Quarterly Report\n\nRevenue grew in every region.\n\nIgnored.";
        assert_eq!(
            describe(text).as_deref(),
            Some("Quarterly Report — Revenue grew in every region.")
        );
    }

    #[test]
    fn test_describe_truncates() {
        let long = "x".repeat(300);
        let desc = describe(&long).unwrap();
        assert_eq!(desc.chars().count(), DESCRIPTION_MAX_CHARS + 3);
        assert!(desc.ends_with("..."));
    }

    #[test]
    fn test_describe_empty() {
        assert_eq!(describe(""), None);
    }
}
