//! Site administrator endpoints for whole-database dump and restore.

use axum::{
    extract::{Path, State},
    response::Json,
};
use std::collections::BTreeMap;
use tracing::info;

use crate::{
    auth::AuthUser,
    models::Part,
    services::admin::{BomDict, RestoreReport, SettingsDict, SystemSettings, TeamSummary},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    get,
    path = "/api/admin/teams",
    responses(
        (status = 200, description = "Every registered team", body = ApiResponse<Vec<TeamSummary>>),
        (status = 403, description = "Site admin role required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_teams(State(state): State<AppState>) -> ApiResult<Vec<TeamSummary>> {
    let teams = state.admin_service().list_teams().await?;
    Ok(Json(ApiResponse::success(teams)))
}

#[utoipa::path(
    get,
    path = "/api/admin/teams/{team_number}/bom",
    params(("team_number" = i32, Path, description = "FRC team number")),
    responses(
        (status = 200, description = "Robot name to system name to parts", body = ApiResponse<BTreeMap<String, BTreeMap<String, Vec<Part>>>>),
        (status = 404, description = "Team not registered", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn get_team_bom(
    State(state): State<AppState>,
    Path(team_number): Path<i32>,
) -> ApiResult<BTreeMap<String, BTreeMap<String, Vec<Part>>>> {
    let bom = state.admin_service().team_bom(team_number).await?;
    Ok(Json(ApiResponse::success(bom)))
}

#[utoipa::path(
    get,
    path = "/api/admin/bom_dict",
    responses(
        (status = 200, description = "Team number to robot to system to parts", body = ApiResponse<BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<Part>>>>>),
        (status = 403, description = "Site admin role required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn get_bom_dict(State(state): State<AppState>) -> ApiResult<BomDict> {
    let dict = state.admin_service().bom_dict().await?;
    Ok(Json(ApiResponse::success(dict)))
}

#[utoipa::path(
    post,
    path = "/api/admin/bom_dict",
    request_body = BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<Part>>>>,
    responses(
        (status = 200, description = "Snapshots restored", body = ApiResponse<RestoreReport>),
        (status = 400, description = "Malformed dictionary or invalid names", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn restore_bom_dict(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<BomDict>,
) -> ApiResult<RestoreReport> {
    info!(admin = %user.subject, teams = payload.len(), "restoring BOM dictionary");
    let report = state.admin_service().restore_bom_dict(payload).await?;
    Ok(Json(ApiResponse::success(report)))
}

#[utoipa::path(
    get,
    path = "/api/admin/settings_dict",
    responses(
        (status = 200, description = "Team number to robot to system to Onshape settings", body = ApiResponse<BTreeMap<String, BTreeMap<String, BTreeMap<String, SystemSettings>>>>),
        (status = 403, description = "Site admin role required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn get_settings_dict(State(state): State<AppState>) -> ApiResult<SettingsDict> {
    let dict = state.admin_service().settings_dict().await?;
    Ok(Json(ApiResponse::success(dict)))
}

#[utoipa::path(
    post,
    path = "/api/admin/settings_dict",
    request_body = BTreeMap<String, BTreeMap<String, BTreeMap<String, SystemSettings>>>,
    responses(
        (status = 200, description = "Settings restored", body = ApiResponse<RestoreReport>),
        (status = 400, description = "Malformed dictionary or invalid names", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn restore_settings_dict(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SettingsDict>,
) -> ApiResult<RestoreReport> {
    info!(admin = %user.subject, teams = payload.len(), "restoring settings dictionary");
    let report = state.admin_service().restore_settings_dict(payload).await?;
    Ok(Json(ApiResponse::success(report)))
}
