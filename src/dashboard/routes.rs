//! API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<AppContext>`. Every
//! read endpoint takes its own `FilterSpec` from the query string, so two
//! views filtering the same history never share mutable filter state.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::engine::stats::{ProfitPoint, SourceStats};
use crate::engine::{self, AggregationMode, FilterSpec, Stats, ViewMode};
use crate::storage::{self, BetStore, ImportSummary};
use crate::types::{AyawError, BetDraft, BetPatch, BetRecord, Settlement};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct AppContext {
    pub store: Arc<dyn BetStore>,
}

impl AppContext {
    pub fn new(store: Arc<dyn BetStore>) -> Self {
        Self { store }
    }

    async fn filtered(&self, spec: &FilterSpec) -> Result<Vec<BetRecord>, ApiError> {
        let records = self.store.list_all().await?;
        Ok(engine::filter(&records, spec))
    }
}

pub type AppState = Arc<AppContext>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// JSON error body with a status derived from the underlying error.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn not_found(id: &str) -> Self {
        AyawError::NotFound(id.to_string()).into()
    }
}

impl From<AyawError> for ApiError {
    fn from(err: AyawError) -> Self {
        let status = match &err {
            AyawError::Validation(_) | AyawError::InvalidOdds(_) => StatusCode::BAD_REQUEST,
            AyawError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AyawError::NotFound(_) => StatusCode::NOT_FOUND,
            AyawError::Storage(_) | AyawError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AyawError>() {
            Ok(domain) => domain.into(),
            Err(other) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: format!("{other:#}"),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "Request failed");
        } else {
            debug!(status = %self.status, error = %self.message, "Request rejected");
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub view_mode: ViewMode,
    /// `"bet"` or `"leg"`: what one counted unit is.
    pub unit: &'static str,
    pub stats: Stats,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/bets
pub async fn list_bets(
    State(state): State<AppState>,
    Query(spec): Query<FilterSpec>,
) -> Result<Json<Vec<BetRecord>>, ApiError> {
    Ok(Json(state.filtered(&spec).await?))
}

/// POST /api/bets
pub async fn create_bet(
    State(state): State<AppState>,
    Json(draft): Json<BetDraft>,
) -> Result<(StatusCode, Json<BetRecord>), ApiError> {
    let record = state.store.create(draft).await?;
    info!(id = %record.id, bet = %record, "Bet added");
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /api/bets/:id
pub async fn update_bet(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<BetPatch>,
) -> Result<Json<BetRecord>, ApiError> {
    let record = state
        .store
        .update(&id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found(&id))?;
    info!(id = %record.id, bet = %record, "Bet edited");
    Ok(Json(record))
}

/// POST /api/bets/:id/settle
pub async fn settle_bet(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(settlement): Json<Settlement>,
) -> Result<Json<BetRecord>, ApiError> {
    let record = state
        .store
        .settle(&id, settlement)
        .await?
        .ok_or_else(|| ApiError::not_found(&id))?;
    info!(id = %record.id, status = %record.status, profit = %record.profit(), "Bet settled");
    Ok(Json(record))
}

/// DELETE /api/bets/:id
pub async fn delete_bet(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete(&id).await? {
        info!(id = %id, "Bet deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(&id))
    }
}

/// GET /api/stats
pub async fn get_stats(
    State(state): State<AppState>,
    Query(spec): Query<FilterSpec>,
) -> Result<Json<StatsResponse>, ApiError> {
    let records = state.filtered(&spec).await?;
    let mode = AggregationMode::for_view(spec.view_mode);
    Ok(Json(StatsResponse {
        view_mode: spec.view_mode,
        unit: match mode {
            AggregationMode::Record => "bet",
            AggregationMode::Leg => "leg",
        },
        stats: engine::aggregate(&records, mode),
    }))
}

/// GET /api/timeline
pub async fn get_timeline(
    State(state): State<AppState>,
    Query(spec): Query<FilterSpec>,
) -> Result<Json<Vec<ProfitPoint>>, ApiError> {
    let records = state.filtered(&spec).await?;
    Ok(Json(engine::profit_timeline(&records)))
}

/// GET /api/sources
pub async fn get_sources(
    State(state): State<AppState>,
    Query(spec): Query<FilterSpec>,
) -> Result<Json<Vec<SourceStats>>, ApiError> {
    let records = state.filtered(&spec).await?;
    Ok(Json(engine::breakdown_by_source(&records)))
}

/// GET /api/export
pub async fn export_bets(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(storage::export_records(state.store.as_ref()).await?))
}

/// POST /api/import
pub async fn import_bets(
    State(state): State<AppState>,
    Json(items): Json<Vec<serde_json::Value>>,
) -> Result<Json<ImportSummary>, ApiError> {
    Ok(Json(storage::import_records(state.store.as_ref(), items).await?))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
