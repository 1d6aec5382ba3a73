//! Card-scanning pipeline: OCR, then LLM extraction, then tolerant parsing.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use eventlens_core::{DecodedImage, LensError, OcrEngine, TextModel, VisitorFields};

use crate::prompt::extraction_prompt;

/// Turns a card photo into draft visitor fields for staff to confirm.
pub struct CardScanner {
    ocr: Arc<dyn OcrEngine>,
    model: Arc<dyn TextModel>,
}

impl CardScanner {
    pub fn new(ocr: Arc<dyn OcrEngine>, model: Arc<dyn TextModel>) -> Self {
        Self { ocr, model }
    }

    pub async fn scan(&self, image: &DecodedImage) -> Result<VisitorFields> {
        let text = self.ocr.recognize(image).await?;
        debug!(engine = self.ocr.name(), chars = text.len(), "Card OCR complete");

        let raw = self.model.generate(&extraction_prompt(&text)).await?;
        let fields = parse_model_output(&raw)?;

        info!(
            model = self.model.name(),
            blank = fields.is_blank(),
            "Card extraction complete"
        );
        Ok(fields)
    }
}

/// Parse the model's reply into visitor fields.
///
/// Models wrap JSON in markdown code fences more often than not, so fences are
/// stripped first. A bare `null` (the model found nothing) and absent keys both
/// map to all-null fields; anything that still isn't JSON is an error.
pub fn parse_model_output(raw: &str) -> Result<VisitorFields, LensError> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() || cleaned == "null" {
        return Ok(VisitorFields::default());
    }

    match serde_json::from_str::<Option<VisitorFields>>(&cleaned) {
        Ok(fields) => Ok(fields.unwrap_or_default()),
        Err(e) => Err(LensError::MalformedModelOutput(format!(
            "{e}: {}",
            truncate(&cleaned, 120)
        ))),
    }
}

fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
