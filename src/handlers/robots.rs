use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::robots::{CreateRobotRequest, RobotResponse, UpdateRobotRequest},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    get,
    path = "/api/robots",
    responses(
        (status = 200, description = "Robots of the caller's team", body = ApiResponse<Vec<RobotResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "robots"
)]
pub async fn list_robots(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<RobotResponse>> {
    let robots = state.robot_service().list(&user).await?;
    Ok(Json(ApiResponse::success(robots)))
}

#[utoipa::path(
    post,
    path = "/api/robots",
    request_body = CreateRobotRequest,
    responses(
        (status = 201, description = "Robot created", body = ApiResponse<RobotResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Robot name already used by this team", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "robots"
)]
pub async fn create_robot(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateRobotRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RobotResponse>>), ServiceError> {
    let robot = state.robot_service().create(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(robot))))
}

#[utoipa::path(
    get,
    path = "/api/robots/{robot_id}",
    params(("robot_id" = Uuid, Path, description = "Robot ID")),
    responses(
        (status = 200, description = "Robot fetched", body = ApiResponse<RobotResponse>),
        (status = 404, description = "Robot not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "robots"
)]
pub async fn get_robot(
    State(state): State<AppState>,
    user: AuthUser,
    Path(robot_id): Path<Uuid>,
) -> ApiResult<RobotResponse> {
    let robot = state.robot_service().get(&user, robot_id).await?;
    Ok(Json(ApiResponse::success(robot)))
}

#[utoipa::path(
    patch,
    path = "/api/robots/{robot_id}",
    params(("robot_id" = Uuid, Path, description = "Robot ID")),
    request_body = UpdateRobotRequest,
    responses(
        (status = 200, description = "Robot updated", body = ApiResponse<RobotResponse>),
        (status = 404, description = "Robot not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Robot name already used by this team", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "robots"
)]
pub async fn update_robot(
    State(state): State<AppState>,
    user: AuthUser,
    Path(robot_id): Path<Uuid>,
    Json(payload): Json<UpdateRobotRequest>,
) -> ApiResult<RobotResponse> {
    let robot = state.robot_service().update(&user, robot_id, payload).await?;
    Ok(Json(ApiResponse::success(robot)))
}

#[utoipa::path(
    delete,
    path = "/api/robots/{robot_id}",
    params(("robot_id" = Uuid, Path, description = "Robot ID")),
    responses(
        (status = 204, description = "Robot, its systems and machines deleted"),
        (status = 404, description = "Robot not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "robots"
)]
pub async fn delete_robot(
    State(state): State<AppState>,
    user: AuthUser,
    Path(robot_id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.robot_service().delete(&user, robot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
