use anyhow::Context;
use rectotal_ocr::{
    KeywordMode, MockRecognizer, Normalizer, OcrBackend, OcrError, ReceiptPipeline, StagingArea,
    ThresholdMethod, TotalExtractor,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Env var naming the config file to load.
pub const CONFIG_ENV: &str = "RECTOTAL_CONFIG";
/// Config file picked up from the working directory when `RECTOTAL_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "rectotal.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    /// Bunyan-style JSON lines.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Largest accepted request body.
    pub max_upload_bytes: usize,
    /// Upper bound on decode + OCR + extraction per request; 0 disables it.
    pub recognition_timeout_secs: u64,
    pub log_format: LogFormat,
    /// Where uploads are staged; the OS temp dir when unset.
    pub staging_dir: Option<PathBuf>,
    pub extraction: ExtractionConfig,
    pub preprocess: PreprocessConfig,
    pub ocr: OcrConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            max_upload_bytes: 10 * 1024 * 1024,
            recognition_timeout_secs: 30,
            log_format: LogFormat::default(),
            staging_dir: None,
            extraction: ExtractionConfig::default(),
            preprocess: PreprocessConfig::default(),
            ocr: OcrConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    pub keyword_mode: KeywordMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Longest side before down-scaling. Unset or 0 keeps the original size.
    pub max_dimension: Option<u32>,
    pub threshold: ThresholdMethod,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrBackendKind {
    #[default]
    Tesseract,
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrConfig {
    pub backend: OcrBackendKind,
    /// Tesseract tessdata directory; the library default when unset.
    pub data_path: Option<String>,
    pub language: String,
    /// Text returned for every image by the mock backend.
    pub mock_text: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackendKind::default(),
            data_path: None,
            language: "eng".to_string(),
            mock_text: String::new(),
        }
    }
}

impl OcrConfig {
    pub fn build_backend(&self) -> Result<Box<dyn OcrBackend>, OcrError> {
        match self.backend {
            OcrBackendKind::Mock => Ok(Box::new(MockRecognizer::new(self.mock_text.clone()))),
            #[cfg(feature = "tesseract")]
            OcrBackendKind::Tesseract => Ok(Box::new(rectotal_ocr::TesseractRecognizer::new(
                self.data_path.clone(),
                &self.language,
            ))),
            #[cfg(not(feature = "tesseract"))]
            OcrBackendKind::Tesseract => Err(OcrError::NotAvailable),
        }
    }
}

impl ServerConfig {
    /// Load from `$RECTOTAL_CONFIG`, else `./rectotal.toml` if present, else
    /// defaults; then apply `RECTOTAL_*` environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply `RECTOTAL_BIND`, `RECTOTAL_LOG_FORMAT` and `RECTOTAL_KEYWORD_MODE`
    /// as looked up through `lookup`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        if let Some(bind) = lookup("RECTOTAL_BIND") {
            self.bind_addr = bind
                .parse()
                .with_context(|| format!("Invalid RECTOTAL_BIND address: '{bind}'"))?;
        }
        if let Some(format) = lookup("RECTOTAL_LOG_FORMAT") {
            self.log_format = format.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(mode) = lookup("RECTOTAL_KEYWORD_MODE") {
            self.extraction.keyword_mode = mode.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(self)
    }

    pub fn recognition_timeout(&self) -> Option<Duration> {
        (self.recognition_timeout_secs > 0).then(|| Duration::from_secs(self.recognition_timeout_secs))
    }

    pub fn staging_area(&self) -> StagingArea {
        self.staging_dir
            .as_ref()
            .map(StagingArea::new)
            .unwrap_or_default()
    }

    pub fn build_pipeline(&self) -> Result<ReceiptPipeline<Box<dyn OcrBackend>>, OcrError> {
        let normalizer = Normalizer::new(
            self.preprocess.threshold.into_strategy(),
            self.preprocess.max_dimension,
        );
        Ok(ReceiptPipeline::new(self.ocr.build_backend()?)
            .with_normalizer(normalizer)
            .with_extractor(TotalExtractor::new(self.extraction.keyword_mode)))
    }
}
