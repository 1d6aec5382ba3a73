//! Client for the external face-match endpoint.
//!
//! The endpoint accepts a multipart selfie upload authenticated by a static
//! API key and returns `{"matches": [{faceId, similarity, signedUrl}]}`.
//! The report is passed through verbatim; the service does not validate
//! similarity ranges or signed-URL expiry.

use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::debug;

use eventlens_core::{DecodedImage, FaceIndex, LensError, MatchReport};

pub struct FaceMatchClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl FaceMatchClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Filename the endpoint receives for the uploaded selfie.
    pub fn upload_filename(registrant_name: &str, extension: &str) -> String {
        format!("{}_selfie.{}", registrant_name.trim(), extension)
    }
}

#[async_trait]
impl FaceIndex for FaceMatchClient {
    fn name(&self) -> &str {
        "face-match"
    }

    async fn search(&self, registrant_name: &str, selfie: &DecodedImage) -> Result<MatchReport> {
        let start = Instant::now();

        let part = Part::bytes(selfie.bytes.clone())
            .file_name(Self::upload_filename(registrant_name, selfie.extension()))
            .mime_str(&selfie.mime_type)
            .context("Invalid selfie MIME type")?;
        let form = Form::new().part("file", part);

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        debug!(endpoint = %self.endpoint, bytes = selfie.bytes.len(), "Uploading selfie");

        let response = request
            .send()
            .await
            .context("Face-match HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LensError::FaceApi {
                status: status.as_u16(),
                message: body,
            }
            .into());
        }

        let report: MatchReport = response
            .json()
            .await
            .context("Failed to parse face-match response")?;

        debug!(
            matches = report.matches.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Face-match responded"
        );
        Ok(report)
    }
}
