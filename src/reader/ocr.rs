/*!
 * Reading text out of images.
 *
 * The flow is: fetch the image, hand it to the OCR collaborator, trim the
 * result and reject anything too short to be real text. The caller shows a
 * preview and, on confirmation, feeds the text to the playback engine,
 * which reads it without highlighting.
 */

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use super::extract::normalize_whitespace;
use crate::app_config::Config;
use crate::errors::ExtractionError;
use crate::providers::{ImageSource, ImageTextExtractor, OcrConfig};

/// Characters shown in the extraction preview
const PREVIEW_CHARS: usize = 200;

/// Text recovered from an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrText {
    text: String,
}

impl OcrText {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// First 200 characters, with an ellipsis when truncated
    pub fn preview(&self) -> String {
        let mut preview: String = self.text.chars().take(PREVIEW_CHARS).collect();
        if self.text.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        preview
    }
}

/// Collapse the line breaks and spacing OCR output is full of
pub fn clean_ocr_text(text: &str) -> String {
    normalize_whitespace(text)
}

/// Image fetch and text extraction
#[derive(Debug, Clone)]
pub struct OcrFlow {
    source: Arc<dyn ImageSource>,
    extractor: Arc<dyn ImageTextExtractor>,
    min_text_length: usize,
    timeout: Duration,
}

impl OcrFlow {
    pub fn new(
        source: Arc<dyn ImageSource>,
        extractor: Arc<dyn ImageTextExtractor>,
        config: &Config,
    ) -> Self {
        Self {
            source,
            extractor,
            min_text_length: config.reading.min_ocr_text_length,
            timeout: Duration::from_secs(config.limits.ocr_timeout_secs),
        }
    }

    /// Fetch the image at `url` and extract its text
    pub async fn extract_from_url(&self, url: &str, config: &OcrConfig) -> Result<OcrText, ExtractionError> {
        if config.api_key.trim().is_empty() {
            return Err(ExtractionError::MissingApiKey);
        }

        info!("Reading image: {}", url);
        let image = self.source.fetch(url).await?;
        debug!("Fetched {} bytes of {}", image.data.len(), image.mime_type);

        let raw = match tokio::time::timeout(self.timeout, self.extractor.extract(&image, config)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("OCR request timed out after {}s", self.timeout.as_secs());
                return Err(ExtractionError::Timeout);
            }
        };

        let text = raw.trim();
        if text.chars().count() < self.min_text_length {
            debug!("OCR returned only {} characters", text.chars().count());
            return Err(ExtractionError::NoTextFound);
        }

        info!("Extracted {} characters from image", text.chars().count());
        Ok(OcrText {
            text: text.to_string(),
        })
    }
}
