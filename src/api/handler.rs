use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::models::*;
use crate::{
    adapters::SourceRegistry,
    error::{AppError, AppResult},
    inventory::SourceId,
    middleware::ValidatedQuery,
    notifications::Notifier,
    reconciliation::{models::Report, ReconciliationEngine},
    reports::ReportStore,
};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReconciliationEngine>,
    pub registry: Arc<SourceRegistry>,
    pub store: Arc<dyn ReportStore>,
    pub notifier: Arc<dyn Notifier>,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// GET /api/config-status
pub async fn config_status(State(state): State<AppState>) -> Json<ConfigStatusResponse> {
    let sources: Vec<SourceConfigStatus> = SourceId::all()
        .into_iter()
        .map(|id| SourceConfigStatus {
            source: id,
            name: id.display_name().to_string(),
            configured: state.registry.is_configured(id),
        })
        .collect();

    let email_configured = state.notifier.is_configured();
    let overall_ready = email_configured && sources.iter().all(|s| s.configured);

    Json(ConfigStatusResponse {
        sources,
        email_configured,
        report_store: state.store.kind().to_string(),
        run_in_progress: state.engine.is_running(),
        overall_ready,
    })
}

/// Run one comparison now
/// POST /api/run-comparison
pub async fn run_comparison(State(state): State<AppState>) -> AppResult<Json<ComparisonSummary>> {
    info!("▶️ Manual inventory comparison requested");

    let report = state.engine.run_comparison().await.map_err(|e| {
        error!("❌ Manual comparison failed: {}", e);
        e
    })?;

    Ok(Json(ComparisonSummary::from(&report)))
}

/// GET /api/test-connections
pub async fn test_connections(State(state): State<AppState>) -> Json<ConnectionTestsResponse> {
    let results: Vec<ConnectionTestResponse> = state
        .registry
        .test_all()
        .await
        .into_iter()
        .map(|(id, status)| ConnectionTestResponse::new(id, status))
        .collect();

    Json(ConnectionTestsResponse {
        all_successful: results.iter().all(|r| r.success),
        results,
    })
}

/// GET /api/test-connection/:source
pub async fn test_connection(
    State(state): State<AppState>,
    Path(source): Path<String>,
) -> AppResult<Json<ConnectionTestResponse>> {
    let id = SourceId::parse(&source).ok_or(AppError::UnknownSource(source))?;
    let status = state.registry.test_connection(id).await?;
    Ok(Json(ConnectionTestResponse::new(id, status)))
}

/// GET /api/reports?limit=
pub async fn list_reports(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<ReportListQuery>,
) -> AppResult<Json<ReportListResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_REPORT_LIMIT);
    let reports = state.store.list_recent(limit).await?;

    Ok(Json(ReportListResponse {
        count: reports.len(),
        reports: reports.iter().map(ReportSummary::from).collect(),
    }))
}

/// GET /api/reports/latest
pub async fn latest_report(State(state): State<AppState>) -> AppResult<Json<Report>> {
    state
        .store
        .get_latest()
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("no reports yet".to_string()))
}

/// GET /api/reports/:id
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Report>> {
    state
        .store
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("report {}", id)))
}

/// DELETE /api/reports/:id
pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DeleteReportResponse>> {
    if !state.store.delete(id).await? {
        return Err(AppError::NotFound(format!("report {}", id)));
    }

    info!("🗑️ Report {} deleted", id);
    Ok(Json(DeleteReportResponse { id, deleted: true }))
}
