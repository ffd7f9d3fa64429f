//! Routing of input files to the paged or raster path.

use std::path::Path;

use super::OcrError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Multi-page container that must be rasterized first.
    Paged,
    /// Single image, passed to OCR directly.
    Raster,
}

const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif"];

fn kind_for_extension(ext: &str) -> Option<DocumentKind> {
    let ext = ext.to_ascii_lowercase();
    if ext == "pdf" {
        Some(DocumentKind::Paged)
    } else if RASTER_EXTENSIONS.contains(&ext.as_str()) {
        Some(DocumentKind::Raster)
    } else {
        None
    }
}

fn kind_for_mime(mime: &str) -> Option<DocumentKind> {
    match mime {
        "application/pdf" => Some(DocumentKind::Paged),
        "image/png" | "image/jpeg" | "image/tiff" | "image/bmp" | "image/gif" => {
            Some(DocumentKind::Raster)
        }
        _ => None,
    }
}

/// Classify a file by extension, falling back to sniffing its magic bytes.
pub fn detect_kind(path: &Path) -> Result<DocumentKind, OcrError> {
    if let Some(kind) = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(kind_for_extension)
    {
        return Ok(kind);
    }

    let sniffed = infer::get_from_path(path)?;
    sniffed
        .and_then(|t| kind_for_mime(t.mime_type()))
        .ok_or_else(|| {
            OcrError::UnsupportedKind(
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| format!(".{}", e))
                    .unwrap_or_else(|| path.display().to_string()),
            )
        })
}
