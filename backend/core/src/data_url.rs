//! Base64 data-URL handling for selfie and card uploads.
//!
//! Browser capture hands us `data:image/jpeg;base64,...` strings; external
//! collaborators want raw bytes plus a MIME type.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::LensError;

/// Raw image bytes decoded from a data-URL.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    /// Decode a `data:<mime>;base64,<payload>` string.
    ///
    /// Only image MIME types are accepted; anything else is rejected before
    /// it reaches an external service.
    pub fn from_data_url(url: &str) -> Result<Self, LensError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| LensError::InvalidImage("missing data: prefix".into()))?;

        let (mime_type, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| LensError::InvalidImage("missing ;base64, separator".into()))?;

        if !mime_type.starts_with("image/") {
            return Err(LensError::InvalidImage(format!(
                "unsupported MIME type: {mime_type}"
            )));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| LensError::InvalidImage(format!("base64 decode failed: {e}")))?;

        if bytes.is_empty() {
            return Err(LensError::InvalidImage("empty image payload".into()));
        }

        Ok(Self {
            mime_type: mime_type.to_string(),
            bytes,
        })
    }

    /// Re-encode as a data-URL (used when caching profiles verbatim).
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    /// File extension matching the MIME type, defaulting to jpg.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}
