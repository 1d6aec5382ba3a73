//! Tesseract-backed OCR engine.
//!
//! The card image is written to a temp file, run through the `tesseract` CLI,
//! and the temp file is removed before returning on every path.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use eventlens_core::{DecodedImage, LensError, OcrEngine};

pub struct TesseractOcr {
    command: String,
    language: String,
}

impl TesseractOcr {
    pub fn new() -> Self {
        Self {
            command: "tesseract".to_string(),
            language: "eng".to_string(),
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    fn temp_path(&self, extension: &str) -> PathBuf {
        std::env::temp_dir().join(format!("eventlens-ocr-{}.{}", Uuid::new_v4(), extension))
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image: &DecodedImage) -> Result<String> {
        let path = self.temp_path(image.extension());
        tokio::fs::write(&path, &image.bytes)
            .await
            .context("Failed to write OCR temp file")?;

        let output = tokio::process::Command::new(&self.command)
            .arg(&path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .await;

        // Remove the temp file before inspecting the result.
        let _ = tokio::fs::remove_file(&path).await;

        let output = output.context("Failed to spawn tesseract")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(LensError::OcrFailed(stderr).into());
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(chars = text.len(), "OCR produced text");
        Ok(text)
    }
}
