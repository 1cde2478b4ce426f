pub mod extract;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod staging;
pub mod types;

pub use extract::{extract_total, KeywordMode, TotalExtractor};
pub use pipeline::{PipelineError, PipelineOutput, ReceiptPipeline};
pub use preprocess::{
    decode_image, decode_image_file, FixedThreshold, Normalizer, Otsu,
    PreprocessError, ThresholdMethod, ThresholdStrategy,
};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError};
pub use staging::{StagedUpload, StagingArea, StagingError};
pub use types::{ExtractionResult, NormalizedImage, TotalAmount, NOT_FOUND};

#[cfg(feature = "tesseract")]
pub use recognizer::tesseract_backend::TesseractRecognizer;
