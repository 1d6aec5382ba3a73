use thiserror::Error;

/// Top-level error type for the EventLens service.
#[derive(Debug, Error)]
pub enum LensError {
    #[error("face-match endpoint error ({status}): {message}")]
    FaceApi { status: u16, message: String },

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("model output was not valid JSON: {0}")]
    MalformedModelOutput(String),

    #[error("invalid image payload: {0}")]
    InvalidImage(String),

    #[error("invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
