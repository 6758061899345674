//! Image text recognition through the `tesseract` command line tool.

use std::io::Write;
use std::path::PathBuf;

use tokio::process::Command;
use tracing::{debug, info, warn};

use bookmark_core::check::OCR_BINARY;

use crate::error::{ExtractError, Result};
use crate::message::{FileFetcher, PhotoRef};

/// Runs OCR on downloaded photos.
#[derive(Debug, Clone)]
pub struct OcrProcessor {
    binary: Option<PathBuf>,
}

impl OcrProcessor {
    /// Look up `tesseract` on `PATH` when `enabled` is set.
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self::disabled();
        }
        match which::which(OCR_BINARY) {
            Ok(path) => {
                debug!(path = %path.display(), "Tesseract found");
                Self { binary: Some(path) }
            }
            Err(_) => {
                warn!("Tesseract OCR not available; install tesseract-ocr to read text from images");
                Self::disabled()
            }
        }
    }

    /// A processor that never runs.
    pub fn disabled() -> Self {
        Self { binary: None }
    }

    /// Use an explicit binary.
    pub fn with_binary(path: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(path.into()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.binary.is_some()
    }

    /// Download `photo` and read its text. Any failure yields `None`.
    pub async fn extract_from_photo(&self, photo: &PhotoRef, fetcher: &dyn FileFetcher) -> Option<String> {
        if !self.is_enabled() {
            debug!("OCR not enabled, skipping");
            return None;
        }

        let bytes = match fetcher.download(&photo.file_id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Photo download failed");
                return None;
            }
        };

        match self.recognize(&bytes).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "OCR processing error");
                None
            }
        }
    }

    /// Run OCR over image bytes. Blank output is `None`.
    pub async fn recognize(&self, image: &[u8]) -> Result<Option<String>> {
        let Some(binary) = &self.binary else {
            return Ok(None);
        };

        let mut file = tempfile::Builder::new().prefix("tg-bookmark-ocr-").tempfile()?;
        file.write_all(image)?;
        file.flush()?;

        let output = Command::new(binary)
            .arg(file.path())
            .arg("stdout")
            .output()
            .await?;

        if !output.status.success() {
            return Err(ExtractError::Ocr(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Ok(None);
        }
        info!(chars = text.chars().count(), "OCR extracted text");
        Ok(Some(text))
    }
}
