use anyhow::Result;
use async_trait::async_trait;

use crate::data_url::DecodedImage;
use crate::types::MatchReport;

/// Trait for the external face-match endpoint.
///
/// The service never inspects match contents; the report is cached and
/// rendered verbatim.
#[async_trait]
pub trait FaceIndex: Send + Sync {
    /// Provider name (e.g., "amazon-image-analyze").
    fn name(&self) -> &str;

    /// Upload a selfie and return the matched event photos.
    /// `registrant_name` is only used to build the upload filename.
    async fn search(&self, registrant_name: &str, selfie: &DecodedImage) -> Result<MatchReport>;
}

/// Trait for the OCR engine that turns a card photo into plain text.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn recognize(&self, image: &DecodedImage) -> Result<String>;
}

/// Trait for the text-generation endpoint used to structure OCR output.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Model identifier (e.g., "gemini-2.0-flash-001").
    fn name(&self) -> &str;

    /// Send a single-turn prompt and return the raw response text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
