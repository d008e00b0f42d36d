use super::error::ApiError;
use super::AppState;
use crate::analysis::AnalysisMode;
use crate::collector;
use crate::models::report::AnalysisReport;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};
use axum::Json;
use log::info;
use serde::Deserialize;
use serde_json::json;

const DASHBOARD_HTML: &str = include_str!("../../assets/dashboard.html");

pub async fn index() -> impl IntoResponse {
    Json(json!({
        "service": "repolens",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /health": "Service health",
            "POST /analyze": "Collect and analyze the configured repository (?mode=simulated|live)",
            "GET /results": "Most recent analysis report",
            "GET /dashboard": "HTML dashboard",
        }
    }))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "repolens",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeParams {
    pub mode: Option<String>,
}

pub async fn analyze(
    State(state): State<AppState>,
    Query(params): Query<AnalyzeParams>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let mode = match params.mode.as_deref().map(str::trim) {
        None | Some("") => state.config.default_mode,
        Some(raw) => raw.parse::<AnalysisMode>().map_err(ApiError::BadRequest)?,
    };
    // One analysis at a time; later requests wait their turn.
    let _running = state.analysis_lock.lock().await;
    info!("Analyzing {} ({mode})", state.config.repo_root.display());

    let root = state.config.repo_root.clone();
    let options = state.config.collect.clone();
    let snapshot = tokio::task::spawn_blocking(move || collector::collect(&root, &options))
        .await
        .map_err(|e| ApiError::Internal(format!("collection task failed: {e}")))??;

    let report = state.analyzer.analyze(&snapshot, mode).await?;
    state.store.save(&report)?;
    Ok(Json(report))
}

pub async fn results(State(state): State<AppState>) -> Result<Json<AnalysisReport>, ApiError> {
    state.store.load_latest()?.map(Json).ok_or(ApiError::NotFound)
}

pub async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}
