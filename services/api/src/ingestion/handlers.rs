use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};

use crate::error::ApiError;
use crate::ingestion::requests::{RefreshRequest, StartIngestionRequest, TenantQuery};
use crate::ingestion::responses::{
    CoverageResponse, StartIngestionResponse, StatusResponse, SyncRunResponse,
};
use crate::AppState;
use relata_db::sync::models::SyncKind;

pub async fn start_ingestion(
    State(state): State<AppState>,
    Json(body): Json<StartIngestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = body.tenant_id.unwrap_or(state.default_tenant_id);
    let kind = body.mode.unwrap_or(SyncKind::Backfill);
    let end = body.end.unwrap_or_else(Utc::now);
    let start = body.start.unwrap_or_else(|| end - Duration::days(365));

    let run_id = state.engine.run_sync(tenant_id, kind, start, end).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(StartIngestionResponse {
            ok: true,
            run_id,
            tenant_id,
            kind,
        }),
    ))
}

pub async fn refresh_ingestion(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = body.tenant_id.unwrap_or(state.default_tenant_id);
    let end = Utc::now();
    let start = end - Duration::hours(24);

    let run_id = state
        .engine
        .run_sync(tenant_id, SyncKind::Daily, start, end)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(StartIngestionResponse {
            ok: true,
            run_id,
            tenant_id,
            kind: SyncKind::Daily,
        }),
    ))
}

pub async fn ingestion_status(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let tenant_id = query.tenant_id.unwrap_or(state.default_tenant_id);
    let runs = state.runs.list_runs(tenant_id).await?;

    Ok(Json(StatusResponse {
        ok: true,
        runs: runs.into_iter().map(SyncRunResponse::from).collect(),
    }))
}

pub async fn coverage(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<CoverageResponse>, ApiError> {
    let tenant_id = query.tenant_id.unwrap_or(state.default_tenant_id);
    let coverage = state.coverage.coverage(tenant_id).await?;

    Ok(Json(CoverageResponse { ok: true, coverage }))
}
