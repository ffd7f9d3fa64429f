//! Tesseract OCR backend.
//!
//! Runs the `tesseract` binary in TSV mode so word confidences come back
//! alongside the text.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use super::backend::{check_binary, OcrBackend, OcrError, PageText};

/// Tesseract OCR backend.
#[derive(Debug, Clone)]
pub struct TesseractBackend {
    language: String,
}

impl TesseractBackend {
    /// `language` uses tesseract's syntax, e.g. `eng` or `ara+eng`.
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn run_tesseract(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .arg("tsv")
            .output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr.trim())))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::BackendNotAvailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl OcrBackend for TesseractBackend {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        check_binary("tesseract")
    }

    fn availability_hint(&self) -> String {
        if check_binary("tesseract") {
            "Tesseract is available".to_string()
        } else {
            "Tesseract not installed. Install with: apt install tesseract-ocr".to_string()
        }
    }

    fn ocr_image(&self, image_path: &Path) -> Result<PageText, OcrError> {
        let tsv = self.run_tesseract(image_path)?;
        Ok(parse_tsv(&tsv))
    }

    fn with_language(&self, language: &str) -> Option<Arc<dyn OcrBackend>> {
        Some(Arc::new(Self::new(language)))
    }
}

/// Rebuild page text and mean word confidence from tesseract TSV output.
///
/// Columns: level, page_num, block_num, par_num, line_num, word_num, left,
/// top, width, height, conf, text. Words on the same line are joined with
/// spaces, lines with `\n`, and paragraphs with a blank line.
pub(crate) fn parse_tsv(tsv: &str) -> PageText {
    let mut text = String::new();
    let mut current_line: Option<(&str, &str, &str)> = None;
    let mut current_par: Option<(&str, &str)> = None;
    let mut conf_sum = 0.0f64;
    let mut conf_count = 0usize;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let word = cols[11].trim();
        if word.is_empty() {
            continue;
        }

        let par = (cols[2], cols[3]);
        let line = (cols[2], cols[3], cols[4]);
        if current_line != Some(line) {
            if current_line.is_some() {
                text.push('\n');
                if current_par != Some(par) {
                    text.push('\n');
                }
            }
            current_line = Some(line);
            current_par = Some(par);
        } else {
            text.push(' ');
        }
        text.push_str(word);

        if let Ok(conf) = cols[10].trim().parse::<f64>() {
            if conf >= 0.0 {
                conf_sum += conf;
                conf_count += 1;
            }
        }
    }

    let confidence = (conf_count > 0).then(|| (conf_sum / conf_count as f64 / 100.0) as f32);
    PageText { text, confidence }
}
