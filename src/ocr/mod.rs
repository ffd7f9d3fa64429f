//! OCR for archived documents.
//!
//! Paged documents (PDF) are rasterized to one PNG per page, raster images
//! are used as-is, and every page goes through a single [`OcrBackend`]
//! sequentially. [`OcrPipeline`] aggregates page results into one text and
//! an overall confidence.

mod backend;
mod kind;
mod pipeline;
mod rasterize;
mod tesseract;

pub use backend::{check_binary, is_valid_language, OcrBackend, OcrError, PageText};
pub use kind::{detect_kind, DocumentKind};
pub use pipeline::{OcrOutcome, OcrPipeline};
pub use rasterize::{PdftoppmRasterizer, RasterizedPages, Rasterizer};
pub use tesseract::TesseractBackend;
