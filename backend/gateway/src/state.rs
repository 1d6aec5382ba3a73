//! Shared application state.
//!
//! All clients and stores are constructed once at startup and handed to the
//! router as one explicit context. Nothing here is a module-level global.

use std::sync::Arc;

use eventlens_core::FaceIndex;
use eventlens_extract::CardScanner;
use eventlens_store::{DeviceCache, MirrorLog, RegistrationStore, VisitorStore};

use crate::welcome::WelcomeBoard;

/// Shared application state for API handlers.
pub struct AppState {
    pub registrations: Arc<RegistrationStore>,
    pub visitors: Arc<VisitorStore>,
    pub cache: Arc<DeviceCache>,
    pub mirror: Arc<MirrorLog>,
    pub face: Arc<dyn FaceIndex>,
    pub scanner: Arc<CardScanner>,
    pub welcome: Arc<WelcomeBoard>,
}
