//! PDF acquisition path: rasterize pages, then run the image variant per
//! page.
//!
//! Rendering goes through Google PDFium, which handles CIDFont encodings,
//! embedded fonts, form fields and complex layouts. `PdfiumRasterizer` is
//! stateless (`Send + Sync`): each operation creates a fresh `Pdfium`
//! instance because the upstream type is `!Send`. The OS caches
//! `dlopen`/`LoadLibrary` calls, so repeat loads are near-free.

use std::io::Cursor;
use std::sync::Arc;

use image::ImageFormat;
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::{AcquireError, TextAcquirer, NO_CONTENT_SENTINEL, PAGE_BREAK, PDF_PREAMBLE};

/// Maximum dimension (width or height) for rendered page images.
/// Prevents OOM on extremely large pages or absurd DPI settings.
const MAX_DIMENSION_PX: u32 = 4096;

/// PDF points per inch (standard PDF unit).
const POINTS_PER_INCH: f32 = 72.0;

/// Rasterization abstraction (allows mocking — the real renderer needs the
/// PDFium dynamic library).
pub trait PageRasterizer: Send + Sync {
    /// Render every page to PNG bytes, in page order.
    fn rasterize(&self, pdf_bytes: &[u8], dpi: u32) -> Result<Vec<Vec<u8>>, AcquireError>;
}

/// Renders PDF pages to PNG images using Google PDFium.
pub struct PdfiumRasterizer;

impl PdfiumRasterizer {
    /// Create a rasterizer, verifying the PDFium library is loadable
    /// (fail-fast at startup).
    pub fn new() -> Result<Self, AcquireError> {
        let _ = load_pdfium()?;
        Ok(Self)
    }
}

/// Load the PDFium dynamic library.
///
/// Discovery order: `PDFIUM_DYNAMIC_LIB_PATH` env var, alongside the
/// running executable, then system library search paths.
fn load_pdfium() -> Result<Pdfium, AcquireError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!(path = %path, "Loading PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| AcquireError::PdfParsing(
            format!("Failed to load PDFium from {path}: {e}"),
        ))?;
        return Ok(Pdfium::new(bindings));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            let lib_path =
                Pdfium::pdfium_platform_library_name_at_path(exe_dir.to_string_lossy().as_ref());
            if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                debug!(dir = %exe_dir.display(), "Loaded PDFium from executable directory");
                return Ok(Pdfium::new(bindings));
            }
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        AcquireError::PdfParsing(format!(
            "PDFium library not found. Set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

/// Compute pixel dimensions for rendering, applying the dimension guard.
///
/// Returns (width_px, height_px, capped), dimensions clamped to
/// [1, MAX_DIMENSION_PX]. Preserves aspect ratio when capping; `capped`
/// reports whether the guard shrank either axis.
fn compute_render_dimensions(width_points: f32, height_points: f32, dpi: u32) -> (u32, u32, bool) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let raw_w = (width_points * scale).max(1.0);
    let raw_h = (height_points * scale).max(1.0);

    let max_dim = raw_w.max(raw_h);
    if max_dim > MAX_DIMENSION_PX as f32 {
        let ratio = MAX_DIMENSION_PX as f32 / max_dim;
        let w = ((raw_w * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        let h = ((raw_h * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        (w, h, true)
    } else {
        (raw_w as u32, raw_h as u32, false)
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf_bytes: &[u8], dpi: u32) -> Result<Vec<Vec<u8>>, AcquireError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(|e| AcquireError::PdfParsing(format!("Failed to load PDF: {e}")))?;

        let mut pages_png = Vec::new();

        for (index, page) in document.pages().iter().enumerate() {
            let width_points = page.width().value;
            let height_points = page.height().value;
            let (target_w, target_h, capped) =
                compute_render_dimensions(width_points, height_points, dpi);

            if capped {
                warn!(
                    page = index,
                    capped_width = target_w,
                    capped_height = target_h,
                    "Page dimensions capped to {MAX_DIMENSION_PX}px",
                );
            }

            let config = PdfRenderConfig::new()
                .set_target_width(target_w as i32)
                .set_maximum_height(target_h as i32);

            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| AcquireError::PdfRender {
                    page: index,
                    reason: format!("Rendering failed: {e}"),
                })?;

            let mut cursor = Cursor::new(Vec::new());
            bitmap
                .as_image()
                .write_to(&mut cursor, ImageFormat::Png)
                .map_err(|e| AcquireError::ImageEncode(format!("PNG encoding failed: {e}")))?;

            debug!(
                page = index,
                width = target_w,
                height = target_h,
                png_size = cursor.get_ref().len(),
                "Rendered PDF page to PNG"
            );

            pages_png.push(cursor.into_inner());
        }

        Ok(pages_png)
    }
}

/// Multi-page PDF text acquisition.
///
/// Rasterizes each page at a fixed DPI and runs the configured image
/// variant per page, in strict page order. Page texts are joined with the
/// page-boundary marker and prefixed with the fixed multi-page instruction.
pub struct PdfTextAcquirer {
    rasterizer: Arc<dyn PageRasterizer>,
    image_acquirer: Arc<dyn TextAcquirer>,
    dpi: u32,
}

impl PdfTextAcquirer {
    pub fn new(
        rasterizer: Arc<dyn PageRasterizer>,
        image_acquirer: Arc<dyn TextAcquirer>,
        dpi: u32,
    ) -> Self {
        Self {
            rasterizer,
            image_acquirer,
            dpi,
        }
    }

    /// Acquire text for a whole PDF. Fail-soft: a rasterization failure of
    /// the document degrades to the sentinel; individual page failures are
    /// already absorbed by the image acquirer.
    pub fn acquire_pdf(&self, pdf_bytes: &[u8]) -> String {
        let pages = match self.rasterizer.rasterize(pdf_bytes, self.dpi) {
            Ok(pages) => pages,
            Err(e) => {
                warn!(error = %e, "PDF rasterization failed, degrading to sentinel");
                return NO_CONTENT_SENTINEL.to_string();
            }
        };

        debug!(page_count = pages.len(), dpi = self.dpi, "Rasterized PDF");

        let mut text = String::from(PDF_PREAMBLE);
        for png in &pages {
            text.push_str(&self.image_acquirer.acquire_image(png));
            text.push_str(PAGE_BREAK);
        }
        text
    }
}
