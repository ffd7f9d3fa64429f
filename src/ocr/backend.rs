//! OCR backend abstraction.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

/// Errors from OCR backends and page preparation.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedKind(String),

    #[error("Rasterization failed: {0}")]
    RasterizeFailed(String),

    #[error("Document produced no pages")]
    NoPages,

    #[error("Invalid OCR language: {0}")]
    InvalidLanguage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Text recognised on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub text: String,
    /// Engine confidence in `0.0..=1.0`, if the engine reports one.
    pub confidence: Option<f32>,
}

/// Trait for OCR backends.
///
/// Implementations are blocking; callers run them off the async runtime.
pub trait OcrBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Check if this backend is available (dependencies installed).
    fn is_available(&self) -> bool;

    /// Get a description of what's needed to make this backend available.
    fn availability_hint(&self) -> String;

    /// Recognise text in one image file.
    fn ocr_image(&self, image_path: &Path) -> Result<PageText, OcrError>;

    /// The same engine recognising `language` instead, for engines that
    /// support switching.
    fn with_language(&self, _language: &str) -> Option<Arc<dyn OcrBackend>> {
        None
    }
}

/// Whether `language` is a tesseract-style language list such as `eng` or
/// `ara+eng`.
pub fn is_valid_language(language: &str) -> bool {
    !language.is_empty()
        && language.split('+').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Whether an executable is on `PATH`.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}
