use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    analysis::{AggregateStats, AnalysisRecord, ScoreResult, MIN_ARTICLE_CHARS},
    analyzer::Analyzer,
    config::Config,
    error::{ApiError, ApiResult},
    remote::{MlStatus, RemoteClassifier},
    store::{AnalysisStore, StoreResult},
};

// ==========================================
// 1. Shared state
// ==========================================
// Every request shares one analyzer and one store. The analyzer is immutable; the
// store serializes its own writes.
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub store: Arc<dyn AnalysisStore>,
    pub remote: Option<RemoteClassifier>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn AnalysisStore>, config: Config) -> anyhow::Result<Self> {
        let remote = match &config.ml_service_url {
            Some(url) => Some(RemoteClassifier::new(url.clone(), config.ml_timeout)?),
            None => None,
        };
        Ok(Self {
            analyzer: Arc::new(Analyzer::new()),
            store,
            remote,
            config,
        })
    }
}

// ==========================================
// 2. DTOs
// ==========================================

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
}

#[derive(Deserialize)]
pub struct RecentQuery {
    /// Zero or negative yields an empty page.
    pub limit: Option<i64>,
}

// ==========================================
// 3. Routes
// ==========================================
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/analyze", post(analyze_article))
        .route("/api/stats", get(get_stats))
        .route("/api/analyses", get(get_recent))
        .route("/api/ml/status", get(get_ml_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ==========================================
// 4. Handlers
// ==========================================

/// Scores an article and records it in the history.
async fn analyze_article(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<ScoreResult>> {
    let Json(req) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let length = req.text.chars().count();
    if length < MIN_ARTICLE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Article text must be at least {MIN_ARTICLE_CHARS} characters"
        )));
    }

    let result = score(&state, &req.text).await;

    let text = req.text;
    let stored = result.clone();
    let record = with_store(&state, move |store| store.record(&text, &stored)).await?;

    tracing::info!(
        id = %record.id,
        verdict = ?result.verdict,
        confidence = result.confidence,
        length,
        "article analyzed"
    );

    Ok(Json(result))
}

/// Trained-model service first when configured, heuristic otherwise or on any failure.
async fn score(state: &AppState, text: &str) -> ScoreResult {
    if let Some(remote) = &state.remote {
        match remote.analyze(text).await {
            Ok(result) => return result,
            Err(e) => tracing::warn!("ML service failed, using heuristic: {:#}", e),
        }
    }
    state.analyzer.analyze(text)
}

async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<AggregateStats>> {
    let counts = with_store(&state, |store| store.analysis_stats()).await?;
    Ok(Json(AggregateStats::from_counts(counts)))
}

async fn get_recent(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<AnalysisRecord>>> {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let limit = match query.limit {
        Some(n) if n <= 0 => return Ok(Json(Vec::new())),
        Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
        None => state.config.recent_limit,
    };
    let records = with_store(&state, move |store| store.recent_analyses(limit)).await?;
    Ok(Json(records))
}

async fn get_ml_status(State(state): State<Arc<AppState>>) -> Json<MlStatus> {
    let Some(remote) = &state.remote else {
        return Json(MlStatus::fallback());
    };
    match remote.status().await {
        Ok(status) => Json(status),
        Err(e) => {
            tracing::debug!("ML status unavailable: {:#}", e);
            Json(MlStatus::fallback())
        }
    }
}

/// Runs a store call on the blocking pool; sled does file I/O.
async fn with_store<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&dyn AnalysisStore) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    let result = tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(format!("Task join error: {}", e)))??;
    Ok(result)
}
