//! BOM retrieval, import and progress tracking endpoints.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    models::BomFilter,
    services::bom::{
        BomQuery, BomSnapshot, FetchBomRequest, FetchBomResponse, PartProgressUpdate, PartView,
        SaveBomRequest,
    },
    ApiResponse, ApiResult, AppState,
};

/// Reads an assembly's BOM from Onshape without storing it.
#[utoipa::path(
    post,
    path = "/api/bom",
    request_body = FetchBomRequest,
    responses(
        (status = 200, description = "Normalized BOM rows", body = ApiResponse<FetchBomResponse>),
        (status = 400, description = "Missing keys or malformed document URL", body = crate::errors::ErrorResponse),
        (status = 500, description = "Onshape rejected the request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "bom"
)]
pub async fn fetch_bom(
    State(state): State<AppState>,
    Json(payload): Json<FetchBomRequest>,
) -> ApiResult<FetchBomResponse> {
    let bom_data = state.bom_service().fetch_bom(payload).await?;
    Ok(Json(ApiResponse::success(FetchBomResponse { bom_data })))
}

#[utoipa::path(
    get,
    path = "/api/systems/{system_id}/bom",
    params(
        ("system_id" = Uuid, Path, description = "System ID"),
        BomQuery
    ),
    responses(
        (status = 200, description = "Stored BOM snapshot with derived progress", body = ApiResponse<BomSnapshot>),
        (status = 404, description = "System not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "bom"
)]
pub async fn get_system_bom(
    State(state): State<AppState>,
    user: AuthUser,
    Path(system_id): Path<Uuid>,
    Query(query): Query<BomQuery>,
) -> ApiResult<BomSnapshot> {
    let filter = BomFilter::from(query.filter.as_deref().unwrap_or_default());
    let snapshot = state
        .bom_service()
        .get_bom(&user, system_id, &filter)
        .await?;
    Ok(Json(ApiResponse::success(snapshot)))
}

#[utoipa::path(
    put,
    path = "/api/systems/{system_id}/bom",
    params(("system_id" = Uuid, Path, description = "System ID")),
    request_body = SaveBomRequest,
    responses(
        (status = 200, description = "Snapshot replaced", body = ApiResponse<BomSnapshot>),
        (status = 404, description = "System not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "bom"
)]
pub async fn save_system_bom(
    State(state): State<AppState>,
    user: AuthUser,
    Path(system_id): Path<Uuid>,
    Json(payload): Json<SaveBomRequest>,
) -> ApiResult<BomSnapshot> {
    let snapshot = state
        .bom_service()
        .save_bom(&user, system_id, payload.parts)
        .await?;
    Ok(Json(ApiResponse::success(snapshot)))
}

#[utoipa::path(
    delete,
    path = "/api/systems/{system_id}/bom",
    params(("system_id" = Uuid, Path, description = "System ID")),
    responses(
        (status = 200, description = "Snapshot cleared", body = ApiResponse<BomSnapshot>),
        (status = 404, description = "System not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "bom"
)]
pub async fn clear_system_bom(
    State(state): State<AppState>,
    user: AuthUser,
    Path(system_id): Path<Uuid>,
) -> ApiResult<BomSnapshot> {
    let snapshot = state.bom_service().clear_bom(&user, system_id).await?;
    Ok(Json(ApiResponse::success(snapshot)))
}

/// Pulls the system's assembly BOM, carrying counters forward by part id.
#[utoipa::path(
    post,
    path = "/api/systems/{system_id}/bom/import",
    params(("system_id" = Uuid, Path, description = "System ID")),
    responses(
        (status = 200, description = "Snapshot refreshed from Onshape", body = ApiResponse<BomSnapshot>),
        (status = 400, description = "System has no Onshape credentials or assembly", body = crate::errors::ErrorResponse),
        (status = 404, description = "System not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Onshape rejected the request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "bom"
)]
pub async fn import_system_bom(
    State(state): State<AppState>,
    user: AuthUser,
    Path(system_id): Path<Uuid>,
) -> ApiResult<BomSnapshot> {
    let snapshot = state.bom_service().import_bom(&user, system_id).await?;
    Ok(Json(ApiResponse::success(snapshot)))
}

#[utoipa::path(
    patch,
    path = "/api/systems/{system_id}/bom/parts/{part_id}",
    params(
        ("system_id" = Uuid, Path, description = "System ID"),
        ("part_id" = String, Path, description = "Onshape part id")
    ),
    request_body = PartProgressUpdate,
    responses(
        (status = 200, description = "Counters updated", body = ApiResponse<PartView>),
        (status = 400, description = "No counters or a negative counter", body = crate::errors::ErrorResponse),
        (status = 404, description = "System or part not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "bom"
)]
pub async fn update_part_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path((system_id, part_id)): Path<(Uuid, String)>,
    Json(payload): Json<PartProgressUpdate>,
) -> ApiResult<PartView> {
    let part = state
        .bom_service()
        .update_part_progress(&user, system_id, &part_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(part)))
}
