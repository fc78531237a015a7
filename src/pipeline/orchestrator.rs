//! Request orchestrator: acquisition → classification → extraction, in
//! strict sequence.
//!
//! Extraction is skipped entirely when classification reports
//! unclassified — a Missing Data outcome goes straight back to the caller.
//! Anything escaping this layer is a genuine transport-level failure.

use std::sync::Arc;

use tracing::{info, instrument};

use super::{
    ClassificationOutcome, ExtractedDocument, ExtractionOptions, PipelineError, SchemaExtractor,
    TypeClassifier,
};
use crate::acquire::{PdfTextAcquirer, TextAcquirer};
use crate::registry::DocumentTypeRegistry;

/// Media dispatch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Pdf,
    Image,
}

/// Sniff media kind from magic bytes, falling back to the declared
/// content type. Sniffing wins: phone uploads routinely lie about their
/// Content-Type.
pub fn detect_media(bytes: &[u8], declared: Option<&str>) -> Result<MediaKind, PipelineError> {
    if bytes.starts_with(b"%PDF") {
        return Ok(MediaKind::Pdf);
    }
    // JPEG: FF D8 FF
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Ok(MediaKind::Image);
    }
    // PNG: 89 50 4E 47
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return Ok(MediaKind::Image);
    }
    // WebP: RIFF....WEBP
    if bytes.len() >= 12 && bytes[..4] == *b"RIFF" && bytes[8..12] == *b"WEBP" {
        return Ok(MediaKind::Image);
    }

    match declared {
        Some("application/pdf") => Ok(MediaKind::Pdf),
        Some(mime) if mime.starts_with("image/") => Ok(MediaKind::Image),
        Some(mime) => Err(PipelineError::UnsupportedMedia(mime.to_string())),
        None => Err(PipelineError::UnsupportedMedia("unknown".into())),
    }
}

/// Final pipeline outcome for one upload.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    Document(ExtractedDocument),
    /// Soft failure: classifier or extractor produced no usable result.
    MissingData { message: String },
}

/// Sequences the whole chain for one request. Shared read-only across
/// concurrent requests.
pub struct DocumentPipeline {
    registry: Arc<DocumentTypeRegistry>,
    image_acquirer: Arc<dyn TextAcquirer>,
    pdf_acquirer: PdfTextAcquirer,
    classifier: TypeClassifier,
    extractor: SchemaExtractor,
    options: ExtractionOptions,
}

impl DocumentPipeline {
    pub fn new(
        registry: Arc<DocumentTypeRegistry>,
        image_acquirer: Arc<dyn TextAcquirer>,
        pdf_acquirer: PdfTextAcquirer,
        classifier: TypeClassifier,
        extractor: SchemaExtractor,
        options: ExtractionOptions,
    ) -> Self {
        Self {
            registry,
            image_acquirer,
            pdf_acquirer,
            classifier,
            extractor,
            options,
        }
    }

    pub fn registry(&self) -> &DocumentTypeRegistry {
        &self.registry
    }

    /// Run acquisition → classification → extraction for one uploaded file.
    #[instrument(skip_all, fields(size = bytes.len()))]
    pub fn process(
        &self,
        bytes: &[u8],
        declared_mime: Option<&str>,
    ) -> Result<ScanOutcome, PipelineError> {
        let media = detect_media(bytes, declared_mime)?;

        let text = match media {
            MediaKind::Pdf => self.pdf_acquirer.acquire_pdf(bytes),
            MediaKind::Image => self.image_acquirer.acquire_image(bytes),
        };

        let type_name = match self.classifier.classify(&self.registry, &text) {
            ClassificationOutcome::Known(name) => name,
            ClassificationOutcome::Unclassified => {
                info!("Document unclassified, skipping extraction");
                return Ok(ScanOutcome::MissingData {
                    message: "No valid type was extracted from the provided file.".into(),
                });
            }
        };

        match self
            .extractor
            .extract(&self.registry, &text, &type_name, &self.options)?
        {
            Some(document) => {
                info!(doc_type = %document.type_name, fields = document.details.len(), "Extraction complete");
                Ok(ScanOutcome::Document(document))
            }
            None => Ok(ScanOutcome::MissingData {
                message: "No valid text was found in the provided document.".into(),
            }),
        }
    }
}
