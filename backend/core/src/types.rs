use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LensError;

/// Loose shape check for contact fields. Real validation belongs to the event
/// staff reviewing the form; this only rejects obviously broken input.
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9()+\-. ]{6,}$").unwrap());

/// A registration as submitted, before the store assigns id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRegistrant {
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Selfie as a base64 data-URL, stored verbatim as the profile image.
    pub image_url: String,
}

impl NewRegistrant {
    pub fn validate(&self) -> Result<(), LensError> {
        if self.name.trim().is_empty() {
            return Err(LensError::InvalidRegistration("name must not be empty".into()));
        }
        if !EMAIL_PATTERN.is_match(self.email.trim()) {
            return Err(LensError::InvalidRegistration(format!(
                "invalid email address: {}",
                self.email
            )));
        }
        if !PHONE_PATTERN.is_match(self.phone.trim()) {
            return Err(LensError::InvalidRegistration(format!(
                "invalid phone number: {}",
                self.phone
            )));
        }
        Ok(())
    }
}

/// A persisted registrant row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registrant {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// One entry from the face-match endpoint, kept verbatim (no score-range or
/// URL-expiry validation on purpose).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FaceMatch {
    pub face_id: String,
    pub similarity: f64,
    pub signed_url: String,
}

/// Full response body from the face-match endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MatchReport {
    #[serde(default)]
    pub matches: Vec<FaceMatch>,
}

impl MatchReport {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn signed_urls(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.signed_url.as_str()).collect()
    }
}

/// Fields extracted from a scanned business card. Every field is nullable:
/// the extraction model returns `null` for anything it cannot find.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisitorFields {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl VisitorFields {
    /// True when no field was extracted at all.
    pub fn is_blank(&self) -> bool {
        self.name.is_none()
            && self.designation.is_none()
            && self.company.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.website.is_none()
    }
}

/// A confirmed visitor record as persisted to the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: VisitorFields,
    pub created_at: DateTime<Utc>,
}
