use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::systems::{CreateSystemRequest, SystemResponse, UpdateSystemRequest},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    get,
    path = "/api/robots/{robot_id}/systems",
    params(("robot_id" = Uuid, Path, description = "Robot ID")),
    responses(
        (status = 200, description = "Systems of the robot", body = ApiResponse<Vec<SystemResponse>>),
        (status = 404, description = "Robot not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "systems"
)]
pub async fn list_systems(
    State(state): State<AppState>,
    user: AuthUser,
    Path(robot_id): Path<Uuid>,
) -> ApiResult<Vec<SystemResponse>> {
    let systems = state.system_service().list(&user, robot_id).await?;
    Ok(Json(ApiResponse::success(systems)))
}

#[utoipa::path(
    post,
    path = "/api/robots/{robot_id}/systems",
    params(("robot_id" = Uuid, Path, description = "Robot ID")),
    request_body = CreateSystemRequest,
    responses(
        (status = 201, description = "System created", body = ApiResponse<SystemResponse>),
        (status = 400, description = "Invalid name or Onshape URL", body = crate::errors::ErrorResponse),
        (status = 404, description = "Robot not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "System name already used on this robot", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "systems"
)]
pub async fn create_system(
    State(state): State<AppState>,
    user: AuthUser,
    Path(robot_id): Path<Uuid>,
    Json(payload): Json<CreateSystemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SystemResponse>>), ServiceError> {
    let system = state.system_service().create(&user, robot_id, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(system))))
}

#[utoipa::path(
    get,
    path = "/api/systems/{system_id}",
    params(("system_id" = Uuid, Path, description = "System ID")),
    responses(
        (status = 200, description = "System fetched", body = ApiResponse<SystemResponse>),
        (status = 404, description = "System not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "systems"
)]
pub async fn get_system(
    State(state): State<AppState>,
    user: AuthUser,
    Path(system_id): Path<Uuid>,
) -> ApiResult<SystemResponse> {
    let system = state.system_service().get(&user, system_id).await?;
    Ok(Json(ApiResponse::success(system)))
}

#[utoipa::path(
    patch,
    path = "/api/systems/{system_id}",
    params(("system_id" = Uuid, Path, description = "System ID")),
    request_body = UpdateSystemRequest,
    responses(
        (status = 200, description = "System updated", body = ApiResponse<SystemResponse>),
        (status = 400, description = "Invalid name or Onshape URL", body = crate::errors::ErrorResponse),
        (status = 404, description = "System not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "systems"
)]
pub async fn update_system(
    State(state): State<AppState>,
    user: AuthUser,
    Path(system_id): Path<Uuid>,
    Json(payload): Json<UpdateSystemRequest>,
) -> ApiResult<SystemResponse> {
    let system = state
        .system_service()
        .update(&user, system_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(system)))
}

#[utoipa::path(
    delete,
    path = "/api/systems/{system_id}",
    params(("system_id" = Uuid, Path, description = "System ID")),
    responses(
        (status = 204, description = "System and its BOM deleted"),
        (status = 404, description = "System not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "systems"
)]
pub async fn delete_system(
    State(state): State<AppState>,
    user: AuthUser,
    Path(system_id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.system_service().delete(&user, system_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
