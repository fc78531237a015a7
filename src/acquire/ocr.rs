//! Local OCR acquisition variant.
//!
//! Runs a pure-Rust OCR engine (`pure-onnx-ocr`, tract-based — no external
//! ONNX Runtime) over a binarized copy of the image. Detection and
//! recognition models are loaded once from a configurable directory.

use std::path::Path;
use std::sync::{Arc, Mutex};

use image::DynamicImage;
use tracing::{debug, info, warn};

use super::{preprocess, AcquireError, TextAcquirer, NO_CONTENT_SENTINEL};

/// Regions scoring below this are mostly detector noise (specks, texture,
/// partial glyphs) and would pollute the classifier input.
const MIN_REGION_CONFIDENCE: f32 = 0.3;

/// One recognized text region with its top-left anchor, used to restore
/// reading order.
#[derive(Debug, Clone)]
pub struct RecognizedLine {
    pub text: String,
    pub confidence: f32,
    pub x: f32,
    pub y: f32,
}

/// OCR engine abstraction (allows mocking — the real engine needs model
/// files on disk).
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<RecognizedLine>, AcquireError>;
}

/// Production backend over `pure-onnx-ocr`.
pub struct PureOcrBackend {
    // Mutex because the engine caches tract plans in `RefCell`s and is not `Sync`.
    engine: Mutex<pure_onnx_ocr::engine::OcrEngine>,
}

impl PureOcrBackend {
    /// Load detection + recognition models and the dictionary from a
    /// directory. Layout: `det.onnx`, `latin_rec.onnx`, `latin_dict.txt`.
    pub fn from_dir(model_dir: &Path) -> Result<Self, AcquireError> {
        let det_path = model_dir.join("det.onnx");
        let rec_path = model_dir.join("latin_rec.onnx");
        let dict_path = model_dir.join("latin_dict.txt");

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| AcquireError::Ocr(format!("pure-onnx-ocr: {e}")))?;

        info!(dir = %model_dir.display(), "Loaded local OCR engine");
        Ok(Self {
            engine: Mutex::new(engine),
        })
    }
}

// SAFETY: `OcrEngine` is `!Send`/`!Sync` only because its inference sessions
// cache tract plans in `Arc<RefCell<...>>`. Those `Arc`s are created inside
// the engine and never handed out or sent to other threads, so every alias of
// each `RefCell` lives within this one engine value. The `Mutex` guarantees at
// most one thread touches the engine at a time, making shared/moved access sound.
unsafe impl Send for PureOcrBackend {}
unsafe impl Sync for PureOcrBackend {}

impl OcrBackend for PureOcrBackend {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<RecognizedLine>, AcquireError> {
        let results = self
            .engine
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .run_from_image(image)
            .map_err(|e| AcquireError::Ocr(format!("pure-onnx-ocr: {e}")))?;

        debug!(regions = results.len(), "Local OCR returned text regions");

        Ok(results
            .iter()
            .map(|r| {
                let anchor = r
                    .bounding_box
                    .exterior()
                    .coords()
                    .next()
                    .map(|c| (c.x as f32, c.y as f32))
                    .unwrap_or((0.0, 0.0));
                RecognizedLine {
                    text: r.text.replace("[UNK]", " "),
                    confidence: r.confidence as f32,
                    x: anchor.0,
                    y: anchor.1,
                }
            })
            .collect())
    }
}

/// Image text acquisition via local OCR after grayscale + Otsu binarization.
pub struct LocalOcrAcquirer {
    backend: Arc<dyn OcrBackend>,
}

impl LocalOcrAcquirer {
    pub fn new(backend: Arc<dyn OcrBackend>) -> Self {
        Self { backend }
    }

    pub fn from_model_dir(model_dir: &Path) -> Result<Self, AcquireError> {
        Ok(Self::new(Arc::new(PureOcrBackend::from_dir(model_dir)?)))
    }

    fn try_acquire(&self, image_bytes: &[u8]) -> Result<String, AcquireError> {
        let image = preprocess::decode_image(image_bytes)?;
        let binarized = DynamicImage::ImageLuma8(preprocess::binarize(&image));

        let mut lines = self.backend.recognize(&binarized)?;
        let detected = lines.len();
        lines.retain(|l| l.confidence >= MIN_REGION_CONFIDENCE);
        if lines.len() < detected {
            debug!(
                dropped = detected - lines.len(),
                "Discarded low-confidence text regions"
            );
        }
        Ok(join_in_reading_order(&mut lines))
    }
}

impl TextAcquirer for LocalOcrAcquirer {
    fn acquire_image(&self, image_bytes: &[u8]) -> String {
        match self.try_acquire(image_bytes) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                debug!("Local OCR found no text, degrading to sentinel");
                NO_CONTENT_SENTINEL.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Local OCR acquisition failed, degrading to sentinel");
                NO_CONTENT_SENTINEL.to_string()
            }
        }
    }
}

/// Sort regions top-to-bottom in ~20px rows, left-to-right within a row,
/// then join one region per line.
fn join_in_reading_order(lines: &mut [RecognizedLine]) -> String {
    lines.sort_by(|a, b| {
        let row_a = (a.y / 20.0) as i32;
        let row_b = (b.y / 20.0) as i32;
        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal)
        }
    });

    lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
