//! Batch endpoints.
//!
//! - `GET /health` - liveness and version
//! - `GET /batches` - list batches, oldest first
//! - `POST /batches` - create a draft batch from `{ "hiveIds": [...] }`
//! - `GET /batches/:id` - batch with slots, current hive and progress
//! - `POST /batches/:id/start` - DRAFT -> IN_PROGRESS
//! - `GET /batches/:id/current` - current slot, `null` when none is left
//! - `GET /batches/:id/current/details` - current slot with hive name and progress
//! - `POST /batches/:id/skip` - requeue the current hive, returns the new current slot
//! - `DELETE /batches/:id/hives/:hive_id` - cancel one hive
//! - `PATCH /batches/:id/reorder` - replace the order of active hives
//! - `POST /batches/:id/inspect` - record an inspection for the current hive and advance

use apiary_core::{BatchId, CurrentHive, HiveId, HiveSlot, InspectionSubmission};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, patch, post},
    Router,
};
use serde::{Deserialize, Serialize};

use super::{
    error::{AppError, Result},
    AppState,
};
use crate::output::{BatchView, InspectView};

/// Body for create and reorder requests.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiveIdsRequest {
    pub hive_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/batches", get(list_batches).post(create_batch))
        .route("/batches/:id", get(get_batch))
        .route("/batches/:id/start", post(start_batch))
        .route("/batches/:id/current", get(current_hive))
        .route("/batches/:id/current/details", get(current_details))
        .route("/batches/:id/skip", post(skip_current))
        .route("/batches/:id/hives/:hive_id", delete(cancel_hive))
        .route("/batches/:id/reorder", patch(reorder_hives))
        .route("/batches/:id/inspect", post(inspect_and_advance))
}

fn parse_batch_id(raw: &str) -> Result<BatchId> {
    BatchId::parse(raw).map_err(|e| AppError::Batch(e.into()))
}

fn parse_hive_ids(raw: Vec<String>) -> Result<Vec<HiveId>> {
    raw.into_iter()
        .map(|id| HiveId::parse(id).map_err(|e| AppError::Batch(e.into())))
        .collect()
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /batches
pub async fn list_batches(State(state): State<AppState>) -> Result<Json<Vec<BatchView>>> {
    let batches = state.engine.list_batches().await?;
    Ok(Json(batches.into_iter().map(BatchView::from).collect()))
}

/// POST /batches
pub async fn create_batch(
    State(state): State<AppState>,
    body: std::result::Result<Json<HiveIdsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BatchView>)> {
    let Json(request) = body?;
    let hives = parse_hive_ids(request.hive_ids)?;
    let batch = state.engine.create_batch(hives).await?;
    Ok((StatusCode::CREATED, Json(BatchView::from(batch))))
}

/// GET /batches/:id
pub async fn get_batch(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BatchView>> {
    let id = parse_batch_id(&id)?;
    let batch = state.engine.get_batch(&id).await?;
    Ok(Json(BatchView::from(batch)))
}

/// POST /batches/:id/start
pub async fn start_batch(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BatchView>> {
    let id = parse_batch_id(&id)?;
    let outcome = state.engine.start(&id).await?;
    Ok(Json(BatchView::from(outcome.batch)))
}

/// GET /batches/:id/current
pub async fn current_hive(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Option<HiveSlot>>> {
    let id = parse_batch_id(&id)?;
    Ok(Json(state.engine.current(&id).await?))
}

/// GET /batches/:id/current/details
pub async fn current_details(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CurrentHive>> {
    let id = parse_batch_id(&id)?;
    Ok(Json(state.engine.describe_current(&id).await?))
}

/// POST /batches/:id/skip
pub async fn skip_current(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Option<HiveSlot>>> {
    let id = parse_batch_id(&id)?;
    let outcome = state.engine.skip_current(&id).await?;
    Ok(Json(outcome.current().cloned()))
}

/// DELETE /batches/:id/hives/:hive_id
pub async fn cancel_hive(
    Path((id, hive_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<BatchView>> {
    let id = parse_batch_id(&id)?;
    let hive = HiveId::parse(hive_id).map_err(|e| AppError::Batch(e.into()))?;
    let outcome = state.engine.cancel_hive(&id, hive).await?;
    Ok(Json(BatchView::from(outcome.batch)))
}

/// PATCH /batches/:id/reorder
pub async fn reorder_hives(
    Path(id): Path<String>,
    State(state): State<AppState>,
    body: std::result::Result<Json<HiveIdsRequest>, JsonRejection>,
) -> Result<Json<BatchView>> {
    let id = parse_batch_id(&id)?;
    let Json(request) = body?;
    let order = parse_hive_ids(request.hive_ids)?;
    let outcome = state.engine.reorder_hives(&id, order).await?;
    Ok(Json(BatchView::from(outcome.batch)))
}

/// POST /batches/:id/inspect
pub async fn inspect_and_advance(
    Path(id): Path<String>,
    State(state): State<AppState>,
    body: std::result::Result<Json<InspectionSubmission>, JsonRejection>,
) -> Result<Json<InspectView>> {
    let id = parse_batch_id(&id)?;
    let Json(submission) = body?;
    let outcome = state.engine.inspect_and_advance(&id, submission).await?;
    Ok(Json(InspectView::from(outcome)))
}
