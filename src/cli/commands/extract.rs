//! Offline metadata extraction.

use std::path::Path;

use console::style;

use crate::analysis;

/// Run the rule-based extractor over a text file and print the result as
/// JSON.
pub fn cmd_extract(file: &Path, department: Option<&str>) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file.display(), e))?;

    let extracted = analysis::extract(&text, department);
    eprintln!(
        "{} {} -> {}/{}",
        style("✓").green(),
        file.display(),
        extracted.category,
        extracted.document_type
    );
    println!("{}", serde_json::to_string_pretty(&extracted)?);

    Ok(())
}
