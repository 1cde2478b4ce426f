use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

const PREFIX: &str = "rectotal-";

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory where uploads are parked between receipt and decoding.
/// Every upload gets its own randomly named file.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl Default for StagingArea {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `data` to a fresh file. The original file name only contributes
    /// its extension, and only if it is short and alphanumeric.
    pub fn stage(&self, data: &[u8], file_name: Option<&str>) -> Result<StagedUpload, StagingError> {
        let suffix = file_name
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix(PREFIX)
            .suffix(&suffix)
            .tempfile_in(&self.dir)?;
        file.write_all(data)?;
        file.flush()?;

        tracing::debug!(path = %file.path().display(), bytes = data.len(), "staged upload");
        Ok(StagedUpload { file })
    }
}

/// A staged upload. The file is removed when this value is dropped.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
