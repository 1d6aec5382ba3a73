//! HTTP server startup.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

/// Start the Axum HTTP server and the welcome rotation loop.
pub async fn start_server(addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let rotation = state.welcome.clone().spawn();

    let app = build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("EventLens HTTP server listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    rotation.abort();
    Ok(())
}
