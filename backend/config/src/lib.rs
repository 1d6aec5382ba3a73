//! EventLens runtime configuration.
//!
//! Everything loads from environment variables with sensible defaults, so the
//! binary starts with nothing but the two external API keys set.

use anyhow::{bail, Result};
use serde::Deserialize;

/// EventLens runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// SQLite database path
    pub db_path: String,
    /// Append-only JSON-lines mirror of visitor records
    pub mirror_path: String,

    /// Face-match endpoint URL
    pub face_endpoint: String,
    /// Static API key sent as `x-api-key`
    pub face_api_key: Option<String>,

    /// Gemini API key for card-text extraction
    pub gemini_api_key: Option<String>,
    /// Gemini model name
    pub gemini_model: String,

    /// Tesseract binary invoked for OCR
    pub tesseract_cmd: String,
    /// OCR language pack
    pub ocr_language: String,

    /// Seconds between welcome-display cursor advances
    pub rotation_interval_secs: u64,
    /// Seconds after which the welcome queue is re-fetched from the store
    pub staleness_window_secs: u64,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            db_path: "eventlens.db".to_string(),
            mirror_path: "visitors.jsonl".to_string(),
            face_endpoint: "https://k94g77i1lc.execute-api.ap-southeast-1.amazonaws.com/default/AmazonImageAnalyze".to_string(),
            face_api_key: None,
            gemini_api_key: None,
            gemini_model: "gemini-2.0-flash-001".to_string(),
            tesseract_cmd: "tesseract".to_string(),
            ocr_language: "eng".to_string(),
            rotation_interval_secs: 10,
            staleness_window_secs: 10,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: std::env::var("EVENTLENS_BIND").unwrap_or(defaults.bind_address),
            port: std::env::var("EVENTLENS_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            db_path: std::env::var("EVENTLENS_DB").unwrap_or(defaults.db_path),
            mirror_path: std::env::var("EVENTLENS_MIRROR").unwrap_or(defaults.mirror_path),
            face_endpoint: std::env::var("FACE_MATCH_ENDPOINT").unwrap_or(defaults.face_endpoint),
            face_api_key: std::env::var("FACE_API_KEY").ok(),
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
            gemini_model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            tesseract_cmd: std::env::var("TESSERACT_CMD").unwrap_or(defaults.tesseract_cmd),
            ocr_language: std::env::var("OCR_LANGUAGE").unwrap_or(defaults.ocr_language),
            rotation_interval_secs: std::env::var("EVENTLENS_ROTATION_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rotation_interval_secs),
            staleness_window_secs: std::env::var("EVENTLENS_STALENESS_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.staleness_window_secs),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    /// Reject values the runtime cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.rotation_interval_secs == 0 {
            bail!("rotation interval must be at least 1 second");
        }
        if self.staleness_window_secs == 0 {
            bail!("staleness window must be at least 1 second");
        }
        if self.face_endpoint.is_empty() {
            bail!("face-match endpoint URL must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 8080);
        assert_eq!(config.rotation_interval_secs, 10);
        assert_eq!(config.staleness_window_secs, 10);
        assert_eq!(config.gemini_model, "gemini-2.0-flash-001");
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let config = Config {
            rotation_interval_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            staleness_window_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let config = Config {
            face_endpoint: String::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
