//! Text acquisition — turning uploaded bytes into plain text.
//!
//! Two interchangeable image variants sit behind the `TextAcquirer` trait:
//! vision delegation (`vision.rs`) and a local OCR pass (`ocr.rs`). The PDF
//! path (`pdf.rs`) rasterizes pages and feeds them through whichever image
//! variant is configured.
//!
//! Failure policy: acquisition never aborts the pipeline. Any decode, OCR
//! or backend failure degrades to the `NO_CONTENT_SENTINEL` text, which
//! lets classification naturally report "unclassified" downstream.

pub mod ocr;
pub mod pdf;
pub mod preprocess;
pub mod vision;

pub use ocr::LocalOcrAcquirer;
pub use pdf::{PdfTextAcquirer, PdfiumRasterizer, PageRasterizer};
pub use vision::VisionAcquirer;

use thiserror::Error;

/// Fixed sentinel returned when nothing could be extracted. Classification
/// treats it like any other unhelpful text.
pub const NO_CONTENT_SENTINEL: &str = "Error. No content extracted from this image.";

/// Marker inserted between concatenated page texts of a multi-page PDF.
pub const PAGE_BREAK: &str = "\n============\n";

/// Fixed instruction prefixed to multi-page PDF text, telling downstream
/// consumers to summarize if the document turns out to be a general one.
pub const PDF_PREAMBLE: &str = "This is a PDF document, extract the useful information \
and give a brief summarization of the pages if it is a general document. \n\n";

#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("Image decoding failed: {0}")]
    ImageDecode(String),

    #[error("Image encoding failed: {0}")]
    ImageEncode(String),

    #[error("PDF rendering failed on page {page}: {reason}")]
    PdfRender { page: usize, reason: String },

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("OCR engine error: {0}")]
    Ocr(String),

    #[error(transparent)]
    Inference(#[from] crate::inference::InferenceError),
}

/// One text acquisition variant for images.
///
/// Infallible by contract: implementations absorb their own failures into
/// the sentinel (logged, not propagated).
pub trait TextAcquirer: Send + Sync {
    fn acquire_image(&self, image_bytes: &[u8]) -> String;
}
