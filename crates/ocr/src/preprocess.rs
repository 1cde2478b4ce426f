use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

use crate::types::{NormalizedImage, BACKGROUND, FOREGROUND};

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Failed to read image file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Decode raw upload bytes. The format is sniffed from the content, never
/// taken from a file name.
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, PreprocessError> {
    Ok(image::load_from_memory(data)?)
}

/// Read and decode an image file.
pub fn decode_image_file(path: &Path) -> Result<DynamicImage, PreprocessError> {
    let data = std::fs::read(path)?;
    decode_image(&data)
}

// ── Threshold strategies ──────────────────────────────────────────────────────

/// Picks the intensity cutoff used to binarize an image. Pixels strictly
/// above the returned level become background, the rest foreground.
pub trait ThresholdStrategy: Send + Sync + std::fmt::Debug {
    fn threshold(&self, gray: &GrayImage) -> u8;
}

/// Otsu's method, as implemented by `imageproc`. Single-intensity images
/// yield 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Otsu;

impl ThresholdStrategy for Otsu {
    fn threshold(&self, gray: &GrayImage) -> u8 {
        imageproc::contrast::otsu_level(gray)
    }
}

/// A constant cutoff, regardless of the image.
#[derive(Debug, Clone, Copy)]
pub struct FixedThreshold(pub u8);

impl ThresholdStrategy for FixedThreshold {
    fn threshold(&self, _gray: &GrayImage) -> u8 {
        self.0
    }
}

/// Config-facing choice of strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMethod {
    #[default]
    Otsu,
    Fixed(u8),
}

impl ThresholdMethod {
    pub fn into_strategy(self) -> Box<dyn ThresholdStrategy> {
        match self {
            ThresholdMethod::Otsu => Box::new(Otsu),
            ThresholdMethod::Fixed(level) => Box::new(FixedThreshold(level)),
        }
    }
}

// ── Normalizer ────────────────────────────────────────────────────────────────

/// Grayscale + automatic binarization ahead of OCR.
#[derive(Debug)]
pub struct Normalizer {
    strategy: Box<dyn ThresholdStrategy>,
    max_dimension: Option<u32>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            strategy: Box::new(Otsu),
            max_dimension: None,
        }
    }
}

impl Normalizer {
    pub fn new(strategy: Box<dyn ThresholdStrategy>, max_dimension: Option<u32>) -> Self {
        Self { strategy, max_dimension: max_dimension.filter(|&m| m > 0) }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn ThresholdStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Scale down images whose longer side exceeds `max_dimension`. Off by
    /// default: `None` keeps every image at its original size.
    pub fn with_max_dimension(mut self, max_dimension: Option<u32>) -> Self {
        self.max_dimension = max_dimension.filter(|&m| m > 0);
        self
    }

    pub fn normalize(&self, img: &DynamicImage) -> NormalizedImage {
        let gray = match self.max_dimension {
            // Tesseract does best around 300 DPI; huge photos only cost time.
            Some(max) if img.width() > max || img.height() > max => img
                .resize(max, max, image::imageops::FilterType::Lanczos3)
                .to_luma8(),
            _ => img.to_luma8(),
        };

        let level = self.strategy.threshold(&gray);
        tracing::debug!(
            width = gray.width(),
            height = gray.height(),
            level,
            "binarizing image"
        );

        binarize(gray, level)
    }
}

/// Map every pixel to [`BACKGROUND`] if it is brighter than `level`,
/// otherwise to [`FOREGROUND`].
pub fn binarize(mut gray: GrayImage, level: u8) -> NormalizedImage {
    for p in gray.pixels_mut() {
        p[0] = if p[0] > level { BACKGROUND } else { FOREGROUND };
    }
    NormalizedImage::new_unchecked(gray)
}

/// PNG bytes for engines that take an encoded image.
pub fn encode_png(img: &NormalizedImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.as_gray()
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb, RgbImage};

    fn solid_gray(width: u32, height: u32, value: u8) -> DynamicImage {
        let img: GrayImage = ImageBuffer::from_fn(width, height, |_, _| Luma([value]));
        DynamicImage::ImageLuma8(img)
    }

    /// Dark "ink" stripes around 30 on "paper" around 200, with a little jitter.
    fn receipt_like(width: u32, height: u32) -> GrayImage {
        ImageBuffer::from_fn(width, height, |x, y| {
            let jitter = ((x * 7 + y * 13) % 11) as u8;
            if (y / 3) % 4 == 0 {
                Luma([25 + jitter])
            } else {
                Luma([195 + jitter])
            }
        })
    }

    fn is_binary(img: &NormalizedImage) -> bool {
        img.as_gray().pixels().all(|p| p[0] == FOREGROUND || p[0] == BACKGROUND)
    }

    // ── Decoding ──────────────────────────────────────────────────────────────

    #[test]
    fn decode_rejects_empty_and_text_bytes() {
        assert!(matches!(decode_image(b""), Err(PreprocessError::Decode(_))));
        assert!(matches!(
            decode_image(b"TOTAL 12.34 -- definitely not a jpeg"),
            Err(PreprocessError::Decode(_))
        ));
    }

    #[test]
    fn decode_png_bytes() {
        let img = solid_gray(3, 2, 90);
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png).unwrap();
        let decoded = decode_image(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
    }

    #[test]
    fn decode_file_ignores_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.jpg");
        std::fs::write(&path, b"plain text pretending to be a photo").unwrap();
        assert!(matches!(decode_image_file(&path), Err(PreprocessError::Decode(_))));
    }

    #[test]
    fn decode_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.png");
        assert!(matches!(decode_image_file(&missing), Err(PreprocessError::Io(_))));
    }

    // ── Thresholds ────────────────────────────────────────────────────────────

    #[test]
    fn otsu_splits_ink_from_paper() {
        let gray: GrayImage = ImageBuffer::from_fn(40, 10, |x, _| Luma([if x < 10 { 40 } else { 210 }]));
        let level = Otsu.threshold(&gray);
        assert!((40..210).contains(&level), "level was {level}");
    }

    #[test]
    fn otsu_uniform_image() {
        assert_eq!(Otsu.threshold(&solid_gray(8, 8, 128).to_luma8()), 0);
    }

    #[test]
    fn fixed_threshold_ignores_image() {
        let gray = receipt_like(10, 10);
        assert_eq!(FixedThreshold(77).threshold(&gray), 77);
        assert_eq!(ThresholdMethod::Fixed(9).into_strategy().threshold(&gray), 9);
    }

    // ── Normalizer ────────────────────────────────────────────────────────────

    #[test]
    fn normalize_color_image_is_binary_with_same_dimensions() {
        let rgb: RgbImage = ImageBuffer::from_fn(40, 30, |x, _| {
            if x < 10 { Rgb([10, 20, 30]) } else { Rgb([240, 235, 220]) }
        });
        let out = Normalizer::default().normalize(&DynamicImage::ImageRgb8(rgb));
        assert_eq!((out.width(), out.height()), (40, 30));
        assert!(is_binary(&out));
        assert_eq!(out.as_gray().get_pixel(0, 0)[0], FOREGROUND);
        assert_eq!(out.as_gray().get_pixel(39, 0)[0], BACKGROUND);
    }

    #[test]
    fn normalize_separates_ink_from_paper() {
        let gray = receipt_like(30, 24);
        let out = Normalizer::default().normalize(&DynamicImage::ImageLuma8(gray));
        assert!(is_binary(&out));
        // Row 0 is an ink stripe, row 3 is paper.
        assert!(out.as_gray().rows().next().unwrap().all(|p| p[0] == FOREGROUND));
        assert!(out.as_gray().enumerate_pixels().filter(|(_, y, _)| *y == 3).all(|(_, _, p)| p[0] == BACKGROUND));
    }

    #[test]
    fn normalize_uniform_image_does_not_panic() {
        let out = Normalizer::default().normalize(&solid_gray(10, 10, 128));
        assert_eq!((out.width(), out.height()), (10, 10));
        assert!(is_binary(&out));
    }

    #[test]
    fn default_keeps_phone_photo_dimensions() {
        let out = Normalizer::default().normalize(&solid_gray(4032, 3024, 200));
        assert_eq!((out.width(), out.height()), (4032, 3024));
    }

    #[test]
    fn opt_in_downscale_bounds_longest_side() {
        let normalizer = Normalizer::default().with_max_dimension(Some(1000));
        let out = normalizer.normalize(&solid_gray(2000, 1500, 200));
        assert_eq!((out.width(), out.height()), (1000, 750));
        assert!(is_binary(&out));
    }

    #[test]
    fn zero_max_dimension_disables_downscale() {
        let normalizer = Normalizer::default().with_max_dimension(Some(0));
        let out = normalizer.normalize(&solid_gray(1200, 10, 200));
        assert_eq!((out.width(), out.height()), (1200, 10));
    }

    #[test]
    fn custom_strategy_is_used() {
        let normalizer = Normalizer::default().with_strategy(Box::new(FixedThreshold(250)));
        let out = normalizer.normalize(&solid_gray(4, 4, 200));
        assert!(out.as_gray().pixels().all(|p| p[0] == FOREGROUND));
    }

    #[test]
    fn encode_png_produces_png_header() {
        let out = Normalizer::default().normalize(&solid_gray(4, 4, 100));
        let png = encode_png(&out).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }
}
