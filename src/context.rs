//! Process-wide application context.
//!
//! Built exactly once at startup and passed by handle into every
//! request-handling call — no lazily-initialized globals. Everything in
//! here is immutable after construction and safe to share across
//! concurrent requests.

use std::sync::Arc;

use thiserror::Error;

use crate::acquire::{
    AcquireError, LocalOcrAcquirer, PdfTextAcquirer, PdfiumRasterizer, TextAcquirer,
    VisionAcquirer,
};
use crate::config::{AcquisitionMode, Settings};
use crate::inference::{ChatClient, InferenceError, OpenAiClient};
use crate::pipeline::{
    DocumentPipeline, ExtractionOptions, SchemaExtractor, TypeClassifier,
};
use crate::registry::{builtin_registry, RegistryError};

#[derive(Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error("TEXT_ACQUISITION=local-ocr requires OCR_MODEL_DIR to be set")]
    MissingOcrModelDir,
}

/// Immutable process context: configuration plus the fully wired pipeline.
pub struct AppContext {
    pub settings: Settings,
    pub pipeline: Arc<DocumentPipeline>,
}

impl AppContext {
    /// Wire the production pipeline from settings. Fails fast: a missing
    /// PDFium library or OCR model directory is a startup error, not a
    /// per-request surprise.
    pub fn initialize(settings: Settings) -> Result<Arc<Self>, InitError> {
        let registry = Arc::new(builtin_registry()?);

        let client: Arc<dyn ChatClient> = Arc::new(OpenAiClient::new(
            &settings.api_base_url,
            &settings.api_key,
            &settings.model_name,
            settings.temperature,
            settings.request_timeout_secs,
        )?);

        let image_acquirer: Arc<dyn TextAcquirer> = match settings.acquisition {
            AcquisitionMode::Vision => Arc::new(VisionAcquirer::new(client.clone())),
            AcquisitionMode::LocalOcr => {
                let model_dir = settings
                    .ocr_model_dir
                    .as_deref()
                    .ok_or(InitError::MissingOcrModelDir)?;
                Arc::new(LocalOcrAcquirer::from_model_dir(model_dir)?)
            }
        };

        let pdf_acquirer = PdfTextAcquirer::new(
            Arc::new(PdfiumRasterizer::new()?),
            image_acquirer.clone(),
            settings.render_dpi,
        );

        let options = ExtractionOptions {
            language: settings.default_language.clone(),
            translate: settings.enable_translation,
        };

        let pipeline = Arc::new(DocumentPipeline::new(
            registry,
            image_acquirer,
            pdf_acquirer,
            TypeClassifier::new(client.clone()),
            SchemaExtractor::new(client),
            options,
        ));

        tracing::info!(
            model = %settings.model_name,
            acquisition = ?settings.acquisition,
            translation = settings.enable_translation,
            "Application context initialized"
        );

        Ok(Arc::new(Self { settings, pipeline }))
    }

    /// Assemble a context around an already-wired pipeline (tests).
    #[cfg(test)]
    pub fn with_pipeline(settings: Settings, pipeline: Arc<DocumentPipeline>) -> Arc<Self> {
        Arc::new(Self { settings, pipeline })
    }
}
