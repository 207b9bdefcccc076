//! Business logic shared by the HTTP handlers and the CLI.

use uuid::Uuid;
use validator::ValidationError;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::onshape::DocumentRef;

pub mod admin;
pub mod bom;
pub mod export;
pub mod machines;
pub mod robots;
pub mod systems;
pub mod teams;

pub const MAX_NAME_LEN: usize = 100;

/// Names are compared and stored trimmed.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("name_empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::new("name_too_long"));
    }
    Ok(())
}

/// Accepts an Onshape document element URL, or an empty string meaning "unset".
pub fn validate_document_url(url: &str) -> Result<(), ValidationError> {
    if url.trim().is_empty() || DocumentRef::parse(url).is_ok() {
        Ok(())
    } else {
        Err(ValidationError::new("onshape_document_url"))
    }
}

pub fn validate_document_urls(urls: &[String]) -> Result<(), ValidationError> {
    urls.iter().try_for_each(|url| {
        if url.trim().is_empty() {
            Err(ValidationError::new("onshape_document_url"))
        } else {
            validate_document_url(url)
        }
    })
}

/// Maps an empty or whitespace-only optional string to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Rows owned by another team are reported as missing.
pub(crate) fn ensure_team_access(
    user: &AuthUser,
    team_id: Uuid,
    kind: &str,
    id: Uuid,
) -> Result<(), ServiceError> {
    if user.can_access_team(team_id) {
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!("{} {} not found", kind, id)))
    }
}
