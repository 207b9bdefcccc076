use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::export::{ExportDelivery, ExportLink, ExportRequest},
    ApiResponse, AppState,
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Translates one part and either links or streams the result.
#[utoipa::path(
    post,
    path = "/api/systems/{system_id}/export",
    params(("system_id" = Uuid, Path, description = "System ID")),
    request_body = ExportRequest,
    responses(
        (status = 200, description = "Download link, or the file itself when delivery is `stream`", body = ApiResponse<ExportLink>),
        (status = 400, description = "Unsupported format or system not configured", body = crate::errors::ErrorResponse),
        (status = 404, description = "System, machine or part not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Translation failed", body = crate::errors::ErrorResponse),
        (status = 504, description = "Translation did not finish in time", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "export"
)]
pub async fn export_part(
    State(state): State<AppState>,
    user: AuthUser,
    Path(system_id): Path<Uuid>,
    Json(payload): Json<ExportRequest>,
) -> Result<Response, ServiceError> {
    let outcome = state
        .export_service()
        .export(&user, system_id, payload)
        .await?;

    match outcome.delivery {
        ExportDelivery::Url => {
            let link = ExportLink {
                download_url: outcome.file.url.clone(),
                format: outcome.format.clone(),
                part_id: outcome.part_id.clone(),
            };
            Ok(Json(ApiResponse::success(link)).into_response())
        }
        ExportDelivery::Stream => {
            let file_name = outcome.file_name();
            debug!(%file_name, "streaming export");
            let content_type = outcome
                .file
                .content_type
                .as_deref()
                .and_then(|ct| HeaderValue::from_str(ct).ok())
                .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
            let disposition =
                HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
                    .map_err(|e| ServiceError::InternalError(e.to_string()))?;

            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                Body::from_stream(outcome.file.body),
            )
                .into_response())
        }
    }
}
