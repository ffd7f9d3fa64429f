//! Multi-page OCR aggregation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use super::backend::{is_valid_language, OcrBackend, OcrError, PageText};
use super::kind::{detect_kind, DocumentKind};
use super::rasterize::{RasterizedPages, Rasterizer};

/// Aggregated OCR output for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutcome {
    /// Page texts in page order, joined with `\n`.
    pub text: String,
    /// Mean over the pages that reported a confidence.
    pub confidence: Option<f32>,
    pub page_count: usize,
}

/// Routes a file to the paged or raster path and OCRs every page in order.
#[derive(Clone)]
pub struct OcrPipeline {
    backend: Arc<dyn OcrBackend>,
    rasterizer: Arc<dyn Rasterizer>,
    temp_root: Option<PathBuf>,
}

impl OcrPipeline {
    pub fn new(backend: Arc<dyn OcrBackend>, rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self {
            backend,
            rasterizer,
            temp_root: None,
        }
    }

    /// Create per-job scratch directories under `root` instead of the system
    /// temp dir.
    pub fn with_temp_root(mut self, root: Option<PathBuf>) -> Self {
        self.temp_root = root;
        self
    }

    /// A copy of this pipeline recognising `language`.
    pub fn for_language(&self, language: &str) -> Result<Self, OcrError> {
        if !is_valid_language(language) {
            return Err(OcrError::InvalidLanguage(language.to_string()));
        }
        let backend = self.backend.with_language(language).ok_or_else(|| {
            OcrError::InvalidLanguage(format!(
                "{} (the {} backend has a fixed language)",
                language,
                self.backend.name()
            ))
        })?;
        Ok(Self {
            backend,
            rasterizer: self.rasterizer.clone(),
            temp_root: self.temp_root.clone(),
        })
    }

    pub fn backend(&self) -> &dyn OcrBackend {
        self.backend.as_ref()
    }

    pub fn temp_root(&self) -> Option<&Path> {
        self.temp_root.as_deref()
    }

    pub fn rasterizer(&self) -> &dyn Rasterizer {
        self.rasterizer.as_ref()
    }

    /// OCR a document. Blocking; run it on a blocking thread.
    pub fn process(&self, path: &Path) -> Result<OcrOutcome, OcrError> {
        let started = Instant::now();
        let outcome = match detect_kind(path)? {
            DocumentKind::Raster => self.ocr_pages(&[path.to_path_buf()])?,
            DocumentKind::Paged => {
                let rasterized = RasterizedPages::create(
                    self.rasterizer.as_ref(),
                    path,
                    self.temp_root.as_deref(),
                )?;
                tracing::debug!(
                    "Rasterized {} into {} pages in {}",
                    path.display(),
                    rasterized.pages.len(),
                    rasterized.dir().display()
                );
                self.ocr_pages(&rasterized.pages)?
            }
        };
        tracing::info!(
            "OCR of {} finished: {} pages, {} chars in {}ms",
            path.display(),
            outcome.page_count,
            outcome.text.len(),
            started.elapsed().as_millis()
        );
        Ok(outcome)
    }

    fn ocr_pages(&self, pages: &[PathBuf]) -> Result<OcrOutcome, OcrError> {
        if pages.is_empty() {
            return Err(OcrError::NoPages);
        }
        let mut results = Vec::with_capacity(pages.len());
        for page in pages {
            results.push(self.backend.ocr_image(page)?);
        }
        Ok(aggregate(&results))
    }
}

/// Join page texts and average the confidences that are present.
pub(crate) fn aggregate(pages: &[PageText]) -> OcrOutcome {
    let text = pages
        .iter()
        .map(|p| p.text.trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    let confidences: Vec<f32> = pages.iter().filter_map(|p| p.confidence).collect();
    let confidence = if confidences.is_empty() {
        None
    } else {
        Some(confidences.iter().sum::<f32>() / confidences.len() as f32)
    };

    OcrOutcome {
        text,
        confidence,
        page_count: pages.len(),
    }
}
