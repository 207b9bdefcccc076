use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::machines::{CreateMachineRequest, MachineResponse, UpdateMachineRequest},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    get,
    path = "/api/robots/{robot_id}/machines",
    params(("robot_id" = Uuid, Path, description = "Robot ID")),
    responses(
        (status = 200, description = "Machines registered for the robot", body = ApiResponse<Vec<MachineResponse>>),
        (status = 404, description = "Robot not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "machines"
)]
pub async fn list_machines(
    State(state): State<AppState>,
    user: AuthUser,
    Path(robot_id): Path<Uuid>,
) -> ApiResult<Vec<MachineResponse>> {
    let machines = state.machine_service().list(&user, robot_id).await?;
    Ok(Json(ApiResponse::success(machines)))
}

#[utoipa::path(
    post,
    path = "/api/robots/{robot_id}/machines",
    params(("robot_id" = Uuid, Path, description = "Robot ID")),
    request_body = CreateMachineRequest,
    responses(
        (status = 201, description = "Machine created", body = ApiResponse<MachineResponse>),
        (status = 400, description = "Invalid name or output format", body = crate::errors::ErrorResponse),
        (status = 404, description = "Robot not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "machines"
)]
pub async fn create_machine(
    State(state): State<AppState>,
    user: AuthUser,
    Path(robot_id): Path<Uuid>,
    Json(payload): Json<CreateMachineRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MachineResponse>>), ServiceError> {
    let machine = state
        .machine_service()
        .create(&user, robot_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(machine))))
}

#[utoipa::path(
    get,
    path = "/api/machines/{machine_id}",
    params(("machine_id" = Uuid, Path, description = "Machine ID")),
    responses(
        (status = 200, description = "Machine fetched", body = ApiResponse<MachineResponse>),
        (status = 404, description = "Machine not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "machines"
)]
pub async fn get_machine(
    State(state): State<AppState>,
    user: AuthUser,
    Path(machine_id): Path<Uuid>,
) -> ApiResult<MachineResponse> {
    let machine = state.machine_service().get(&user, machine_id).await?;
    Ok(Json(ApiResponse::success(machine)))
}

#[utoipa::path(
    patch,
    path = "/api/machines/{machine_id}",
    params(("machine_id" = Uuid, Path, description = "Machine ID")),
    request_body = UpdateMachineRequest,
    responses(
        (status = 200, description = "Machine updated", body = ApiResponse<MachineResponse>),
        (status = 400, description = "Invalid name or output format", body = crate::errors::ErrorResponse),
        (status = 404, description = "Machine not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "machines"
)]
pub async fn update_machine(
    State(state): State<AppState>,
    user: AuthUser,
    Path(machine_id): Path<Uuid>,
    Json(payload): Json<UpdateMachineRequest>,
) -> ApiResult<MachineResponse> {
    let machine = state
        .machine_service()
        .update(&user, machine_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(machine)))
}

#[utoipa::path(
    delete,
    path = "/api/machines/{machine_id}",
    params(("machine_id" = Uuid, Path, description = "Machine ID")),
    responses(
        (status = 204, description = "Machine deleted"),
        (status = 404, description = "Machine not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "machines"
)]
pub async fn delete_machine(
    State(state): State<AppState>,
    user: AuthUser,
    Path(machine_id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.machine_service().delete(&user, machine_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
