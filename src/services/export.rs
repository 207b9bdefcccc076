//! CAD export through Onshape's asynchronous translation jobs.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::bom::onshape_access;
use super::machines::{normalize_format, MachineService, DEFAULT_OUTPUT_FORMAT, OUTPUT_FORMATS};
use super::systems::SystemService;
use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::middleware_helpers::retry::{poll_until, PollConfig, PollError, PollStatus};
use crate::onshape::{
    CadVendor, Credentials, DocumentRef, ElementKind, ExportedFile, TranslationRequest,
    VendorError,
};

/// How the exported file is handed back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportDelivery {
    /// Respond with the resolved download URL
    #[default]
    Url,
    /// Stream the file bytes as an attachment
    Stream,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ExportRequest {
    #[serde(alias = "partId")]
    #[validate(length(min = 1))]
    pub part_id: String,
    /// Overrides the machine's output format
    pub format: Option<String>,
    /// Machine whose output format to use
    pub machine_id: Option<Uuid>,
    #[serde(default)]
    pub delivery: ExportDelivery,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExportLink {
    pub download_url: String,
    pub format: String,
    pub part_id: String,
}

/// A finished export ready to be linked or streamed.
pub struct ExportOutcome {
    pub part_id: String,
    pub format: String,
    pub delivery: ExportDelivery,
    pub file: ExportedFile,
}

impl ExportOutcome {
    pub fn file_name(&self) -> String {
        let extension = match self.format.as_str() {
            "PARASOLID" => "x_t".to_string(),
            "SOLIDWORKS" => "sldprt".to_string(),
            "IGES" => "igs".to_string(),
            "ACIS" => "sat".to_string(),
            other => other.to_ascii_lowercase(),
        };
        let stem: String = self
            .part_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("{stem}.{extension}")
    }
}

/// Explicit format wins, then the machine's, then STEP.
pub fn resolve_format(
    explicit: Option<&str>,
    machine_format: Option<&str>,
) -> Result<String, ServiceError> {
    match explicit.filter(|f| !f.trim().is_empty()) {
        Some(format) => normalize_format(format).ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "unsupported format {format:?}; expected one of {}",
                OUTPUT_FORMATS.join(", ")
            ))
        }),
        None => Ok(machine_format
            .map(|f| f.trim().to_ascii_uppercase())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_OUTPUT_FORMAT.to_string())),
    }
}

#[derive(Clone)]
pub struct ExportService {
    systems: SystemService,
    machines: MachineService,
    vendor: Arc<dyn CadVendor>,
    poll: PollConfig,
}

impl ExportService {
    pub fn new(
        systems: SystemService,
        machines: MachineService,
        vendor: Arc<dyn CadVendor>,
        poll: PollConfig,
    ) -> Self {
        Self {
            systems,
            machines,
            vendor,
            poll,
        }
    }

    #[instrument(skip(self, user, request), fields(part_id = %request.part_id))]
    pub async fn export(
        &self,
        user: &AuthUser,
        system_id: Uuid,
        request: ExportRequest,
    ) -> Result<ExportOutcome, ServiceError> {
        request.validate()?;
        let (system, robot) = self.systems.load(user, system_id).await?;

        let machine_format = match request.machine_id {
            Some(machine_id) => {
                let machine = self.machines.load(user, machine_id).await?;
                if machine.robot_id != robot.id {
                    return Err(ServiceError::NotFound(format!(
                        "Machine {} not found",
                        machine_id
                    )));
                }
                Some(machine.output_format)
            }
            None => None,
        };
        let format = resolve_format(request.format.as_deref(), machine_format.as_deref())?;

        let (credentials, assembly) = onshape_access(&system)?;
        let element = self
            .locate_part(&credentials, &assembly, &system.part_studios(), &request.part_id)
            .await?;

        let translation = TranslationRequest {
            format_name: format.clone(),
            part_ids: request.part_id.clone(),
            store_in_document: false,
            link_document_id: element.document_id.clone(),
        };
        let translation_id = self
            .start_translation(&credentials, &element, &translation)
            .await?;
        let external_id = self.await_translation(&credentials, &translation_id).await?;

        let file = self
            .vendor
            .download_external_data(&credentials, &element.document_id, &external_id)
            .await?;

        info!(%system_id, %format, "CAD export ready");
        Ok(ExportOutcome {
            part_id: request.part_id,
            format,
            delivery: request.delivery,
            file,
        })
    }

    /// Finds the part studio that defines `part_id`. Systems without part
    /// studios fall back to their assembly element.
    async fn locate_part(
        &self,
        credentials: &Credentials,
        assembly: &DocumentRef,
        part_studios: &[String],
        part_id: &str,
    ) -> Result<DocumentRef, ServiceError> {
        if part_studios.is_empty() {
            debug!("no part studios registered, using the assembly element");
            return Ok(assembly.clone());
        }

        for url in part_studios {
            let studio = DocumentRef::parse(url)?;
            let parts = self.vendor.list_parts(credentials, &studio).await?;
            if parts.iter().any(|p| p.part_id == part_id) {
                debug!(element = %studio, "part located");
                return Ok(studio);
            }
        }

        Err(ServiceError::NotFound(format!(
            "Part {} not found in any part studio of this system",
            part_id
        )))
    }

    /// Part studio endpoint first, then the assembly endpoint once.
    async fn start_translation(
        &self,
        credentials: &Credentials,
        element: &DocumentRef,
        request: &TranslationRequest,
    ) -> Result<String, ServiceError> {
        match self
            .vendor
            .start_translation(credentials, element, ElementKind::PartStudio, request)
            .await
        {
            Ok(id) => Ok(id),
            Err(VendorError::Status { status, .. }) => {
                warn!(status, "part studio translation rejected, retrying as assembly");
                Ok(self
                    .vendor
                    .start_translation(credentials, element, ElementKind::Assembly, request)
                    .await?)
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Polls the translation until it produces a result id.
    async fn await_translation(
        &self,
        credentials: &Credentials,
        translation_id: &str,
    ) -> Result<String, ServiceError> {
        let outcome = poll_until(&self.poll, |attempt| {
            let vendor = self.vendor.clone();
            let credentials = credentials.clone();
            let translation_id = translation_id.to_string();
            async move {
                let status = vendor
                    .translation_status(&credentials, &translation_id)
                    .await
                    .map_err(ServiceError::from)?;
                debug!(attempt, state = ?status.request_state, "translation status");

                if status.is_failed() {
                    return Err(ServiceError::ExportFailed(status.failure_reason));
                }
                if status.is_done() {
                    return match status.first_result() {
                        Some(id) => Ok(PollStatus::Ready(id.to_string())),
                        None => Err(ServiceError::ExportFailed(Some(
                            "translation finished without result data".to_string(),
                        ))),
                    };
                }
                Ok(PollStatus::Pending)
            }
        })
        .await;

        match outcome {
            Ok(id) => Ok(id),
            Err(PollError::Failed(err)) => Err(err),
            Err(PollError::Exhausted { attempts }) => {
                warn!(attempts, %translation_id, "translation did not finish in time");
                Err(ServiceError::ExportTimedOut)
            }
        }
    }
}
