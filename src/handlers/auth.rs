//! Team registration, logins and logout.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::{AuthUser, TokenResponse},
    errors::ServiceError,
    services::teams::{
        AdminLoginRequest, LoginRequest, RegisterResponse, RegisterTeamRequest, TeamExistsQuery,
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct TeamExistsResponse {
    pub team_number: i32,
    pub exists: bool,
}

#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterTeamRequest,
    responses(
        (status = 201, description = "Team registered and signed in as team admin", body = ApiResponse<RegisterResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Team number already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterTeamRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisterResponse>>), ServiceError> {
    let registered = state.team_service().register(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(registered))))
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; role depends on which password matched", body = ApiResponse<TokenResponse>),
        (status = 401, description = "Unknown team or wrong password", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<TokenResponse> {
    let token = state.team_service().login(payload).await?;
    Ok(Json(ApiResponse::success(token)))
}

#[utoipa::path(
    post,
    path = "/api/admin/login",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Signed in as site administrator", body = ApiResponse<TokenResponse>),
        (status = 401, description = "Wrong password", body = crate::errors::ErrorResponse),
        (status = 403, description = "Site administration disabled", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> ApiResult<TokenResponse> {
    let token = state.team_service().admin_login(payload).await?;
    Ok(Json(ApiResponse::success(token)))
}

#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> StatusCode {
    state.team_service().logout(&user).await;
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    get,
    path = "/api/team_exists",
    params(TeamExistsQuery),
    responses(
        (status = 200, description = "Whether the team number is registered", body = ApiResponse<TeamExistsResponse>)
    ),
    tag = "auth"
)]
pub async fn team_exists(
    State(state): State<AppState>,
    Query(query): Query<TeamExistsQuery>,
) -> ApiResult<TeamExistsResponse> {
    let exists = state.team_service().team_exists(query.team_number).await?;
    Ok(Json(ApiResponse::success(TeamExistsResponse {
        team_number: query.team_number,
        exists,
    })))
}
