use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use eventlens_config::Config;
use eventlens_extract::{CardScanner, GeminiClient, TesseractOcr};
use eventlens_facematch::FaceMatchClient;
use eventlens_gateway::{start_server, AppState, WelcomeBoard};
use eventlens_store::{DeviceCache, MirrorLog, RegistrationStore, VisitorStore};

#[derive(Parser)]
#[command(name = "eventlens")]
#[command(about = "EventLens — event registration and photo matching")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the EventLens server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show current server status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await?;
        }
        Commands::Status => {
            let client = reqwest::Client::new();
            match client
                .get(format!("http://localhost:{}/api/health", config.port))
                .send()
                .await
            {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    println!("EventLens is not running on port {}", config.port);
                }
            }
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    config.validate()?;

    info!(
        port = config.port,
        bind = %config.bind_address,
        db = %config.db_path,
        "Starting EventLens"
    );

    let registrations = Arc::new(RegistrationStore::open(&config.db_path)?);
    let visitors = Arc::new(VisitorStore::open(&config.db_path)?);
    let cache = Arc::new(DeviceCache::open(&config.db_path)?);
    let mirror = Arc::new(MirrorLog::open(&config.mirror_path)?);

    let mut face_client = FaceMatchClient::new(config.face_endpoint.clone());
    match &config.face_api_key {
        Some(key) => face_client = face_client.with_api_key(key.clone()),
        None => warn!("FACE_API_KEY not set; face-match requests will be unauthenticated"),
    }

    let gemini_key = config.gemini_api_key.clone().unwrap_or_default();
    if gemini_key.is_empty() {
        warn!("GEMINI_API_KEY not set; card extraction will fail until it is provided");
    }
    let gemini = GeminiClient::new(gemini_key).with_model(config.gemini_model.clone());
    let ocr = TesseractOcr::new()
        .with_command(config.tesseract_cmd.clone())
        .with_language(config.ocr_language.clone());
    let scanner = Arc::new(CardScanner::new(Arc::new(ocr), Arc::new(gemini)));

    let welcome = Arc::new(WelcomeBoard::new(
        visitors.clone(),
        Duration::from_secs(config.rotation_interval_secs),
        Duration::from_secs(config.staleness_window_secs),
    ));

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port).parse()?;
    let state = Arc::new(AppState {
        registrations,
        visitors,
        cache,
        mirror,
        face: Arc::new(face_client),
        scanner,
        welcome,
    });

    start_server(addr, state).await
}
