use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{ExtractionResult, TotalAmount};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Optional currency symbol, digits, a decimal point, exactly two digits.
re!(re_candidate, r"\p{Sc}?\d+\.\d{2}");
// "total" bounded by non-letters or line ends.
re!(re_total_word, r"(?:^|\P{L})total(?:\P{L}|$)");

const KEYWORD: &str = "total";

// ── Keyword matching mode ────────────────────────────────────────────────────

/// How a line is judged to mention the total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordMode {
    /// `total` anywhere in the whitespace-stripped line. `subtotal` and
    /// `to tal` both qualify.
    #[default]
    Loose,
    /// `total` as a standalone word in the line as printed.
    Strict,
}

impl std::fmt::Display for KeywordMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeywordMode::Loose => write!(f, "loose"),
            KeywordMode::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for KeywordMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "loose" => Ok(KeywordMode::Loose),
            "strict" => Ok(KeywordMode::Strict),
            other => Err(format!("Unknown keyword mode: '{other}'")),
        }
    }
}

// ── Public extraction API ─────────────────────────────────────────────────────

/// Picks the receipt total out of raw OCR text.
///
/// Every line that mentions `total` and carries at least one monetary token
/// replaces the current answer with its right-most token, so the bottom-most
/// qualifying line decides the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct TotalExtractor {
    mode: KeywordMode,
}

impl TotalExtractor {
    pub fn new(mode: KeywordMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> KeywordMode {
        self.mode
    }

    pub fn extract(&self, ocr_text: &str) -> ExtractionResult {
        ocr_text
            .lines()
            .fold(None, |best, line| self.scan_line(line).or(best))
            .into()
    }

    fn scan_line(&self, line: &str) -> Option<TotalAmount> {
        let compact = normalize_line(line);
        if !self.mentions_total(line, &compact) {
            return None;
        }
        re_candidate()
            .find_iter(&compact)
            .last()
            .map(|m| TotalAmount::new(m.as_str()))
    }

    fn mentions_total(&self, line: &str, compact: &str) -> bool {
        match self.mode {
            KeywordMode::Loose => compact.contains(KEYWORD),
            KeywordMode::Strict => re_total_word().is_match(&line.to_lowercase()),
        }
    }
}

/// Extract with the default (loose) keyword matching.
pub fn extract_total(ocr_text: &str) -> ExtractionResult {
    TotalExtractor::default().extract(ocr_text)
}

/// Drop every whitespace character and lower-case the rest.
pub fn normalize_line(line: &str) -> String {
    line.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
