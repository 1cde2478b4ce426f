use image::GrayImage;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Marker rendered in place of an amount when no total was found.
pub const NOT_FOUND: &str = "Not Found";

/// A monetary token picked as the receipt total, kept verbatim as matched
/// (e.g. `"12.34"` or `"$16.80"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TotalAmount(String);

impl TotalAmount {
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading currency symbol, if the token carried one.
    pub fn currency_symbol(&self) -> Option<char> {
        self.0.chars().next().filter(|c| !c.is_numeric())
    }

    /// Numeric value of the token with any currency symbol dropped.
    pub fn value(&self) -> Option<Decimal> {
        let digits = self.0.trim_start_matches(|c: char| !c.is_numeric());
        Decimal::from_str(digits).ok()
    }
}

impl std::fmt::Display for TotalAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of scanning OCR text for a total. Absence is a normal result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    Found(TotalAmount),
    NotFound,
}

impl ExtractionResult {
    pub fn amount(&self) -> Option<&TotalAmount> {
        match self {
            ExtractionResult::Found(amount) => Some(amount),
            ExtractionResult::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ExtractionResult::Found(_))
    }
}

impl From<Option<TotalAmount>> for ExtractionResult {
    fn from(amount: Option<TotalAmount>) -> Self {
        amount.map_or(ExtractionResult::NotFound, ExtractionResult::Found)
    }
}

impl std::fmt::Display for ExtractionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionResult::Found(amount) => write!(f, "{amount}"),
            ExtractionResult::NotFound => write!(f, "{NOT_FOUND}"),
        }
    }
}

/// Pixel value written for pixels above the threshold (paper).
pub const BACKGROUND: u8 = 255;
/// Pixel value written for pixels at or below the threshold (ink).
pub const FOREGROUND: u8 = 0;

/// A single-channel image whose pixels are all either [`FOREGROUND`] or
/// [`BACKGROUND`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage(GrayImage);

impl NormalizedImage {
    pub(crate) fn new_unchecked(image: GrayImage) -> Self {
        Self(image)
    }

    /// Wrap an already-binarized image. Returns `None` if any pixel is not
    /// one of the two output levels.
    pub fn from_binary(image: GrayImage) -> Option<Self> {
        image
            .pixels()
            .all(|p| p[0] == FOREGROUND || p[0] == BACKGROUND)
            .then_some(Self(image))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }
}
