use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::maintenance::SweepReportResponse;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/sweep/objects",
    tag = "Maintenance",
    operation_id = "sweepObjects",
    summary = "Sweep orphaned chunked objects",
    description = "Deletes objects in the chunked store that no account references any more. \
        Orphans younger than the configured grace period are left for a later pass. Only one \
        sweep may run at a time.",
    responses(
        (status = 200, description = "Sweep outcome", body = SweepReportResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Another sweep is running (SWEEP_IN_PROGRESS)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip_all)]
pub async fn sweep_objects(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<SweepReportResponse>, AppError> {
    auth_user.require_admin()?;

    let report = state.gc.sweep_chunked(&state.records).await?;
    Ok(Json(report.into()))
}

#[utoipa::path(
    post,
    path = "/sweep/legacy",
    tag = "Maintenance",
    operation_id = "sweepLegacy",
    summary = "Sweep the legacy uploads directory",
    description = "Deletes flat files from the pre-migration uploads directory once no account \
        references them. A file is kept while at least one record still points at it.",
    responses(
        (status = 200, description = "Sweep outcome", body = SweepReportResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Another sweep is running (SWEEP_IN_PROGRESS)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip_all)]
pub async fn sweep_legacy(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<SweepReportResponse>, AppError> {
    auth_user.require_admin()?;

    let dir = std::path::Path::new(&state.config.storage.legacy_uploads_dir);
    let report = state.gc.sweep_legacy(&state.records, dir).await?;
    Ok(Json(report.into()))
}
