use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

use crate::extract::TotalExtractor;
use crate::preprocess::{self, Normalizer};
use crate::recognizer::{OcrBackend, OcrError};
use crate::staging::{StagingArea, StagingError};
use crate::types::ExtractionResult;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] crate::preprocess::PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    #[error(transparent)]
    Staging(#[from] StagingError),
}

impl PipelineError {
    /// Decode and recognition failures both mean the upload could not be
    /// read as a receipt image.
    pub fn is_unreadable_image(&self) -> bool {
        matches!(self, PipelineError::Preprocess(_) | PipelineError::Ocr(_))
    }
}

/// The result of a single receipt processing run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Raw OCR text output.
    pub ocr_text: String,
    /// The total picked out of the OCR text.
    pub result: ExtractionResult,
}

/// Orchestrates: decode → normalize → OCR → extract.
///
/// Holds no per-request state, so one instance can serve concurrent callers.
pub struct ReceiptPipeline<R: OcrBackend> {
    recognizer: R,
    normalizer: Normalizer,
    extractor: TotalExtractor,
}

impl<R: OcrBackend> ReceiptPipeline<R> {
    pub fn new(recognizer: R) -> Self {
        Self {
            recognizer,
            normalizer: Normalizer::default(),
            extractor: TotalExtractor::default(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_extractor(mut self, extractor: TotalExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn extractor(&self) -> &TotalExtractor {
        &self.extractor
    }

    /// Stage an upload, process it, and remove the staged file whatever the
    /// outcome.
    pub fn process_upload(
        &self,
        staging: &StagingArea,
        data: &[u8],
        file_name: Option<&str>,
    ) -> Result<PipelineOutput, PipelineError> {
        let staged = staging.stage(data, file_name)?;
        self.process_file(staged.path())
    }

    /// Process a file on disk.
    pub fn process_file(&self, path: &Path) -> Result<PipelineOutput, PipelineError> {
        let img = preprocess::decode_image_file(path)?;
        self.process_image(&img)
    }

    /// Process raw bytes (from camera capture or file read).
    pub fn process_bytes(&self, data: &[u8]) -> Result<PipelineOutput, PipelineError> {
        let img = preprocess::decode_image(data)?;
        self.process_image(&img)
    }

    pub fn process_image(&self, img: &DynamicImage) -> Result<PipelineOutput, PipelineError> {
        tracing::debug!(width = img.width(), height = img.height(), "decoded image");

        let normalized = self.normalizer.normalize(img);
        let ocr_text = self.recognizer.recognize(&normalized)?;
        tracing::debug!(chars = ocr_text.len(), lines = ocr_text.lines().count(), "recognized text");

        let result = self.extractor.extract(&ocr_text);
        Ok(PipelineOutput { ocr_text, result })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
