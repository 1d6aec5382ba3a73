//! HTTP API routes.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_stream::wrappers::BroadcastStream;
use futures::StreamExt;
use tracing::{error, warn};

use eventlens_core::{
    DecodedImage, LensError, MatchReport, NewRegistrant, Registrant, VisitorFields,
};
use eventlens_store::{MATCHES_KEY, PROFILE_KEY};

use crate::state::AppState;

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/register", post(register))
        .route("/api/matches", get(matches))
        .route("/api/matches/refresh", post(refresh_matches))
        .route("/api/profile", get(profile))
        .route("/api/visitors/scan", post(scan_card))
        .route("/api/visitors", get(list_visitors).post(create_visitor))
        .route("/api/welcome/current", get(welcome_current))
        .route("/api/ws", get(ws_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Selfie as a base64 data-URL.
    pub image: String,
    #[serde(default = "default_device")]
    pub device_id: String,
}

fn default_device() -> String {
    "local".to_string()
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub registrant: Registrant,
    /// None when the face-match call failed; registration still succeeded.
    pub matches: Option<MatchReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Full registration flow: upsert the profile, cache it, then ask the
/// face-match endpoint for event photos. A face-match failure is reported as
/// a warning, not a failed registration.
pub async fn perform_registration(
    state: &AppState,
    req: RegisterRequest,
) -> Result<RegisterResponse, LensError> {
    let new_registrant = NewRegistrant {
        name: req.name,
        email: req.email,
        phone: req.phone,
        image_url: req.image.clone(),
    };
    new_registrant.validate()?;
    let selfie = DecodedImage::from_data_url(&req.image)?;

    let registrant = state.registrations.upsert(&new_registrant).await?;
    state
        .cache
        .put(&req.device_id, PROFILE_KEY, &registrant)
        .await?;

    let (matches, warning) = match state.face.search(&registrant.name, &selfie).await {
        Ok(report) => {
            state
                .cache
                .put(&req.device_id, MATCHES_KEY, &report)
                .await?;
            (Some(report), None)
        }
        Err(e) => {
            warn!(error = %e, "Face match failed; continuing registration");
            (None, Some("face match unavailable; try again later".to_string()))
        }
    };

    Ok(RegisterResponse {
        registrant,
        matches,
        warning,
    })
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<Value>, StatusCode> {
    match perform_registration(&state, req).await {
        Ok(response) => Ok(Json(json!(response))),
        Err(e @ (LensError::InvalidRegistration(_) | LensError::InvalidImage(_))) => {
            warn!(error = %e, "Rejected registration");
            Err(StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(e) => {
            error!(error = %e, "Registration failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Deserialize)]
struct DeviceQuery {
    #[serde(default = "default_device")]
    device: String,
}

/// Cached profile and match report for a device. Zero matches and malformed
/// cache entries both render the empty state.
async fn matches(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DeviceQuery>,
) -> Result<Json<Value>, StatusCode> {
    let profile: Option<Registrant> = state
        .cache
        .get(&q.device, PROFILE_KEY)
        .await
        .map_err(internal)?;
    let report: MatchReport = state
        .cache
        .get(&q.device, MATCHES_KEY)
        .await
        .map_err(internal)?
        .unwrap_or_default();

    Ok(Json(json!({
        "profile": profile,
        "matches": report.matches,
    })))
}

/// Re-run the face search for a device using its cached profile selfie and
/// replace the cached report. Lets a viewer pull in photos uploaded after
/// registration.
pub async fn perform_match_refresh(
    state: &AppState,
    device: &str,
) -> Result<MatchReport, LensError> {
    let profile: Registrant = state
        .cache
        .get(device, PROFILE_KEY)
        .await?
        .ok_or_else(|| LensError::NotFound(format!("no cached profile for device {device}")))?;
    let selfie = DecodedImage::from_data_url(&profile.image_url)?;

    let report = state.face.search(&profile.name, &selfie).await?;
    state.cache.put(device, MATCHES_KEY, &report).await?;
    Ok(report)
}

async fn refresh_matches(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DeviceQuery>,
) -> Result<Json<Value>, StatusCode> {
    match perform_match_refresh(&state, &q.device).await {
        Ok(report) => Ok(Json(json!({ "matches": report.matches }))),
        Err(LensError::NotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(e @ LensError::InvalidImage(_)) => {
            warn!(error = %e, device = %q.device, "Cached profile selfie is not decodable");
            Err(StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(e) => {
            error!(error = %e, "Match refresh failed");
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}

#[derive(Deserialize)]
struct ProfileQuery {
    phone: Option<String>,
    email: Option<String>,
}

async fn profile(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ProfileQuery>,
) -> Result<Json<Value>, StatusCode> {
    let found = if let Some(phone) = &q.phone {
        state.registrations.get_by_phone(phone).await
    } else if let Some(email) = &q.email {
        state.registrations.get_by_email(email).await
    } else {
        return Err(StatusCode::BAD_REQUEST);
    };

    match found.map_err(internal)? {
        Some(registrant) => Ok(Json(json!(registrant))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

#[derive(Deserialize)]
struct ScanRequest {
    /// Card photo as a base64 data-URL.
    image: String,
}

/// OCR the card photo and extract draft fields for staff confirmation.
/// Nothing is persisted here.
async fn scan_card(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<Value>, StatusCode> {
    let image = match DecodedImage::from_data_url(&req.image) {
        Ok(image) => image,
        Err(e) => {
            warn!(error = %e, "Rejected card image");
            return Err(StatusCode::UNPROCESSABLE_ENTITY);
        }
    };

    match state.scanner.scan(&image).await {
        Ok(fields) => {
            let blank = fields.is_blank();
            Ok(Json(json!({ "fields": fields, "blank": blank })))
        }
        Err(e) => {
            error!(error = %e, "Card scan failed");
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}

/// Persist a confirmed visitor record to the document store and the mirror
/// log, and push it on the live feed.
async fn create_visitor(
    State(state): State<Arc<AppState>>,
    Json(fields): Json<VisitorFields>,
) -> Result<Json<Value>, StatusCode> {
    let record = state.visitors.insert(fields).await.map_err(internal)?;

    // The document store is authoritative; a mirror failure is logged, not
    // surfaced, so a full disk on the mirror volume cannot block check-in.
    if let Err(e) = state.mirror.append(&record).await {
        error!(error = %e, id = %record.id, "Mirror append failed");
    }

    Ok(Json(json!({ "status": "created", "id": record.id })))
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn list_visitors(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Value>, StatusCode> {
    let visitors = state
        .visitors
        .recent(q.limit.unwrap_or(50))
        .await
        .map_err(internal)?;
    Ok(Json(json!({ "visitors": visitors })))
}

async fn welcome_current(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "visitor": state.welcome.current().await }))
}

/// WebSocket handler for the live visitor feed.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let rx = state.visitors.subscribe();
    let mut stream = BroadcastStream::new(rx);

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(record) => {
                if let Ok(json) = serde_json::to_string(&record) {
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }
            Err(_) => {
                // Lagged or closed
                break;
            }
        }
    }
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "eventlens",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn internal(e: anyhow::Error) -> StatusCode {
    error!(error = %e, "Request failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    use eventlens_core::{FaceIndex, FaceMatch, OcrEngine, TextModel};
    use eventlens_extract::CardScanner;
    use eventlens_store::{DeviceCache, MirrorLog, RegistrationStore, VisitorStore};

    use crate::welcome::WelcomeBoard;

    struct FakeFace {
        report: Option<MatchReport>,
    }

    #[async_trait]
    impl FaceIndex for FakeFace {
        fn name(&self) -> &str {
            "fake"
        }
        async fn search(&self, _name: &str, _selfie: &DecodedImage) -> anyhow::Result<MatchReport> {
            match &self.report {
                Some(report) => Ok(report.clone()),
                None => anyhow::bail!("endpoint down"),
            }
        }
    }

    struct FixedOcr;
    #[async_trait]
    impl OcrEngine for FixedOcr {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn recognize(&self, _image: &DecodedImage) -> anyhow::Result<String> {
            Ok("card text".into())
        }
    }

    struct FixedModel;
    #[async_trait]
    impl TextModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok("null".into())
        }
    }

    fn test_state(face: FakeFace) -> AppState {
        let visitors = Arc::new(VisitorStore::in_memory().unwrap());
        let mirror_path = std::env::temp_dir().join(format!("mirror-{}.jsonl", uuid::Uuid::new_v4()));
        AppState {
            registrations: Arc::new(RegistrationStore::in_memory().unwrap()),
            visitors: visitors.clone(),
            cache: Arc::new(DeviceCache::in_memory().unwrap()),
            mirror: Arc::new(MirrorLog::open(mirror_path).unwrap()),
            face: Arc::new(face),
            scanner: Arc::new(CardScanner::new(Arc::new(FixedOcr), Arc::new(FixedModel))),
            welcome: Arc::new(WelcomeBoard::new(
                visitors,
                Duration::from_secs(10),
                Duration::from_secs(10),
            )),
        }
    }

    fn data_url() -> String {
        use base64::Engine;
        format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(b"selfie")
        )
    }

    fn request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ada Lovelace".into(),
            email: email.into(),
            phone: "(876) 543-2109".into(),
            image: data_url(),
            device_id: "kiosk-1".into(),
        }
    }

    #[tokio::test]
    async fn test_registration_caches_profile_and_matches() {
        let report = MatchReport {
            matches: vec![FaceMatch {
                face_id: "f-1".into(),
                similarity: 99.0,
                signed_url: "https://img/1".into(),
            }],
        };
        let state = test_state(FakeFace {
            report: Some(report.clone()),
        });

        let response = perform_registration(&state, request("ada@example.com"))
            .await
            .unwrap();
        assert_eq!(response.matches, Some(report.clone()));
        assert!(response.warning.is_none());

        let cached_profile: Registrant = state
            .cache
            .get("kiosk-1", PROFILE_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached_profile.email, "ada@example.com");
        let cached_report: MatchReport = state
            .cache
            .get("kiosk-1", MATCHES_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached_report, report);
    }

    #[tokio::test]
    async fn test_face_failure_still_registers() {
        let state = test_state(FakeFace { report: None });

        let response = perform_registration(&state, request("ada@example.com"))
            .await
            .unwrap();
        assert!(response.matches.is_none());
        assert!(response.warning.is_some());
        assert_eq!(state.registrations.count().await.unwrap(), 1);
        // No stale match report was cached.
        let cached: Option<MatchReport> = state.cache.get("kiosk-1", MATCHES_KEY).await.unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_reregistration_overwrites_not_duplicates() {
        let state = test_state(FakeFace {
            report: Some(MatchReport::default()),
        });

        perform_registration(&state, request("ada@example.com"))
            .await
            .unwrap();
        perform_registration(&state, request("ada@example.com"))
            .await
            .unwrap();
        assert_eq!(state.registrations.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_email_rejected_before_any_write() {
        let state = test_state(FakeFace { report: None });
        let mut req = request("ada@example.com");
        req.email = "not-an-email".into();

        let err = perform_registration(&state, req).await.unwrap_err();
        assert!(matches!(err, LensError::InvalidRegistration(_)));
        assert_eq!(state.registrations.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refresh_replaces_cached_report() {
        let fresh = MatchReport {
            matches: vec![FaceMatch {
                face_id: "f-2".into(),
                similarity: 98.0,
                signed_url: "https://img/2".into(),
            }],
        };
        let state = test_state(FakeFace {
            report: Some(fresh.clone()),
        });
        perform_registration(&state, request("ada@example.com"))
            .await
            .unwrap();

        // Simulate a report cached before newer event photos were indexed.
        let stale = MatchReport::default();
        state.cache.put("kiosk-1", MATCHES_KEY, &stale).await.unwrap();

        let report = perform_match_refresh(&state, "kiosk-1").await.unwrap();
        assert_eq!(report, fresh);
        let cached: MatchReport = state
            .cache
            .get("kiosk-1", MATCHES_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached, fresh);
    }

    #[tokio::test]
    async fn test_refresh_without_cached_profile_is_not_found() {
        let state = test_state(FakeFace { report: None });
        let err = perform_match_refresh(&state, "unknown-device")
            .await
            .unwrap_err();
        assert!(matches!(err, LensError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_refresh_keeps_stale_report_when_endpoint_is_down() {
        let fresh = MatchReport {
            matches: vec![FaceMatch {
                face_id: "f-1".into(),
                similarity: 99.0,
                signed_url: "https://img/1".into(),
            }],
        };
        let state = test_state(FakeFace { report: None });
        // Profile and report cached by an earlier successful registration.
        perform_registration(&state, request("ada@example.com"))
            .await
            .unwrap();
        state.cache.put("kiosk-1", MATCHES_KEY, &fresh).await.unwrap();

        assert!(perform_match_refresh(&state, "kiosk-1").await.is_err());
        let cached: MatchReport = state
            .cache
            .get("kiosk-1", MATCHES_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached, fresh);
    }

    #[tokio::test]
    async fn test_empty_match_cache_is_empty_state() {
        let state = test_state(FakeFace { report: None });
        let report: MatchReport = state
            .cache
            .get("unknown-device", MATCHES_KEY)
            .await
            .unwrap()
            .unwrap_or_default();
        assert!(report.is_empty());
    }
}
