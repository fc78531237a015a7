//! Vision-delegation acquisition variant.
//!
//! Re-encodes the image as a JPEG data URL and asks the vision-capable
//! backend to return the extracted text, nothing else.

use std::sync::Arc;

use tracing::warn;

use super::{preprocess, TextAcquirer, NO_CONTENT_SENTINEL};
use crate::inference::ChatClient;

/// Instruction sent with every vision extraction call.
const VISION_INSTRUCTION: &str =
    "Extract all text from this image. Return only the text content without any explanations.";

/// Image text acquisition via a vision-capable inference call.
pub struct VisionAcquirer {
    client: Arc<dyn ChatClient>,
}

impl VisionAcquirer {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    fn try_acquire(&self, image_bytes: &[u8]) -> Result<String, super::AcquireError> {
        let image = preprocess::decode_image(image_bytes)?;
        let data_url = preprocess::to_jpeg_data_url(&image)?;
        let text = self.client.complete_vision(VISION_INSTRUCTION, &data_url)?;
        Ok(text)
    }
}

impl TextAcquirer for VisionAcquirer {
    fn acquire_image(&self, image_bytes: &[u8]) -> String {
        match self.try_acquire(image_bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Vision acquisition failed, degrading to sentinel");
                NO_CONTENT_SENTINEL.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::openai::{FailingChatClient, MockChatClient};
    use image::{DynamicImage, ImageFormat, RgbImage};
    use serde_json::json;
    use std::io::Cursor;

    fn sample_png() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, image::Rgb([200, 200, 200])));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn returns_backend_text() {
        let client = Arc::new(
            MockChatClient::structured(json!({})).with_vision_reply("RECEIPT\nCoffee 2x 3.50"),
        );
        let acquirer = VisionAcquirer::new(client.clone());

        let text = acquirer.acquire_image(&sample_png());
        assert_eq!(text, "RECEIPT\nCoffee 2x 3.50");

        // The instruction asks for text only, no commentary.
        let calls = client.recorded_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("without any explanations"));
    }

    #[test]
    fn backend_failure_degrades_to_sentinel() {
        let acquirer = VisionAcquirer::new(Arc::new(FailingChatClient));
        assert_eq!(acquirer.acquire_image(&sample_png()), NO_CONTENT_SENTINEL);
    }

    #[test]
    fn undecodable_input_degrades_to_sentinel() {
        let client = Arc::new(MockChatClient::structured(json!({})).with_vision_reply("text"));
        let acquirer = VisionAcquirer::new(client);
        assert_eq!(acquirer.acquire_image(&[0u8; 16]), NO_CONTENT_SENTINEL);
    }
}
