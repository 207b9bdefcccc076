use axum::{extract::State, http::StatusCode, response::Json};

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::teams::{TeamResponse, UpdateTeamRequest},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    get,
    path = "/api/teams/me",
    responses(
        (status = 200, description = "Team of the signed-in user", body = ApiResponse<TeamResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Token is not scoped to a team", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "teams"
)]
pub async fn get_current_team(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<TeamResponse> {
    let team = state.team_service().current(&user).await?;
    Ok(Json(ApiResponse::success(team)))
}

#[utoipa::path(
    patch,
    path = "/api/teams/me",
    request_body = UpdateTeamRequest,
    responses(
        (status = 200, description = "Team updated", body = ApiResponse<TeamResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Team admin role required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "teams"
)]
pub async fn update_current_team(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateTeamRequest>,
) -> ApiResult<TeamResponse> {
    let team = state.team_service().update(&user, payload).await?;
    Ok(Json(ApiResponse::success(team)))
}

#[utoipa::path(
    delete,
    path = "/api/teams/me",
    responses(
        (status = 204, description = "Team and all of its robots deleted"),
        (status = 403, description = "Team admin role required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "teams"
)]
pub async fn delete_current_team(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<StatusCode, ServiceError> {
    state.team_service().delete(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}
