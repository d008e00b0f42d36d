pub mod error;
pub mod handlers;

use crate::analysis::Analyzer;
use crate::config::Config;
use crate::store::ReportStore;
use anyhow::Context;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use log::info;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub analyzer: Arc<Analyzer>,
    pub store: Arc<ReportStore>,
    pub analysis_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config, analyzer: Analyzer, store: ReportStore) -> Self {
        Self {
            config: Arc::new(config),
            analyzer: Arc::new(analyzer),
            store: Arc::new(store),
            analysis_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/analyze", post(handlers::analyze))
        .route("/results", get(handlers::results))
        .route("/dashboard", get(handlers::dashboard))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store = ReportStore::open(&config.report_path)
        .with_context(|| format!("opening report store at {}", config.report_path.display()))?;
    let analyzer = Analyzer::from_settings(&config.live).context("building live analysis client")?;
    let address = config.bind_address();

    let app = router(AppState::new(config, analyzer, store));
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!("Listening on http://{address} (dashboard at /dashboard)");
    axum::serve(listener, app).await?;
    Ok(())
}
