//! PDF rasterization.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use super::backend::{check_binary, OcrError};

const PDFTOPPM_NOT_FOUND: &str = "pdftoppm not found (install poppler-utils)";

/// Renders every page of a paged document to an image file.
pub trait Rasterizer: Send + Sync {
    /// Write one image per page into `output_dir` and return their paths in
    /// page order.
    fn rasterize(&self, pdf_path: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, OcrError>;

    fn is_available(&self) -> bool;
}

/// Page images living in a per-job scratch directory.
///
/// The directory is removed when this value is dropped.
#[derive(Debug)]
pub struct RasterizedPages {
    dir: TempDir,
    pub pages: Vec<PathBuf>,
}

impl RasterizedPages {
    /// Rasterize `pdf_path` into a fresh scratch directory under `temp_root`
    /// (or the system temp dir).
    pub fn create(
        rasterizer: &dyn Rasterizer,
        pdf_path: &Path,
        temp_root: Option<&Path>,
    ) -> Result<Self, OcrError> {
        let builder = {
            let mut b = tempfile::Builder::new();
            b.prefix("earchive-ocr-");
            b
        };
        let dir = match temp_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        let pages = rasterizer.rasterize(pdf_path, dir.path())?;
        if pages.is_empty() {
            return Err(OcrError::NoPages);
        }
        Ok(Self { dir, pages })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Rasterizer backed by poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(dpi: u32) -> Self {
        Self { dpi }
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new(300)
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf_path: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
        let dpi = self.dpi.to_string();
        let status = Command::new("pdftoppm")
            .args(["-png", "-r", &dpi])
            .arg(pdf_path)
            .arg(output_dir.join("page"))
            .status();

        match status {
            Ok(s) if s.success() => collect_page_images(output_dir),
            Ok(s) => Err(OcrError::RasterizeFailed(format!(
                "pdftoppm exited with {}",
                s
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                OcrError::BackendNotAvailable(PDFTOPPM_NOT_FOUND.to_string()),
            ),
            Err(e) => Err(OcrError::Io(e)),
        }
    }

    fn is_available(&self) -> bool {
        check_binary("pdftoppm")
    }
}

/// Find `page-N.png` files and order them by page number.
///
/// pdftoppm pads the page number to the width of the page count, so names
/// run `page-1.png`, `page-01.png` or `page-001.png` depending on length.
pub fn collect_page_images(dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
    let mut pages: Vec<(u32, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let number = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix("page-"))
            .and_then(|n| n.strip_suffix(".png"))
            .and_then(|n| n.parse::<u32>().ok());
        if let Some(number) = number {
            pages.push((number, path));
        }
    }
    pages.sort_by_key(|(n, _)| *n);
    Ok(pages.into_iter().map(|(_, p)| p).collect())
}
