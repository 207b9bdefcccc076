use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::Set, IntoActiveModel};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::robots::RobotService;
use super::{non_blank, validate_name};
use crate::auth::AuthUser;
use crate::entities::machine;
use crate::errors::ServiceError;
use crate::repositories::MachineRepository;

/// Translation formats a machine can ask Onshape for.
pub const OUTPUT_FORMATS: [&str; 9] = [
    "STEP",
    "STL",
    "PARASOLID",
    "IGES",
    "ACIS",
    "SOLIDWORKS",
    "GLTF",
    "OBJ",
    "3MF",
];

pub const DEFAULT_OUTPUT_FORMAT: &str = "STEP";

/// Upper-cases `format` if it is one of [`OUTPUT_FORMATS`].
pub fn normalize_format(format: &str) -> Option<String> {
    let upper = format.trim().to_ascii_uppercase();
    OUTPUT_FORMATS.contains(&upper.as_str()).then_some(upper)
}

pub fn validate_output_format(format: &str) -> Result<(), ValidationError> {
    normalize_format(format)
        .map(|_| ())
        .ok_or_else(|| ValidationError::new("unsupported_output_format"))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMachineRequest {
    #[validate(custom = "validate_name")]
    pub name: String,
    /// Defaults to STEP
    #[validate(custom = "validate_output_format")]
    pub output_format: Option<String>,
    #[validate(length(max = 255))]
    pub icon_file: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMachineRequest {
    #[validate(custom = "validate_name")]
    pub name: Option<String>,
    #[validate(custom = "validate_output_format")]
    pub output_format: Option<String>,
    #[validate(length(max = 255))]
    pub icon_file: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MachineResponse {
    pub id: Uuid,
    pub robot_id: Uuid,
    pub name: String,
    pub output_format: String,
    pub icon_file: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<machine::Model> for MachineResponse {
    fn from(model: machine::Model) -> Self {
        Self {
            id: model.id,
            robot_id: model.robot_id,
            name: model.name,
            output_format: model.output_format,
            icon_file: model.icon_file,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct MachineService {
    machines: MachineRepository,
    robots: RobotService,
}

impl MachineService {
    pub fn new(machines: MachineRepository, robots: RobotService) -> Self {
        Self { machines, robots }
    }

    pub async fn load(
        &self,
        user: &AuthUser,
        machine_id: Uuid,
    ) -> Result<machine::Model, ServiceError> {
        let not_found = || ServiceError::NotFound(format!("Machine {} not found", machine_id));
        let machine = self.machines.find_by_id(machine_id).await?.ok_or_else(not_found)?;
        self.robots
            .load(user, machine.robot_id)
            .await
            .map_err(|_| not_found())?;
        Ok(machine)
    }

    pub async fn list(
        &self,
        user: &AuthUser,
        robot_id: Uuid,
    ) -> Result<Vec<MachineResponse>, ServiceError> {
        self.robots.load(user, robot_id).await?;
        let machines = self.machines.list_by_robot(robot_id).await?;
        Ok(machines.into_iter().map(MachineResponse::from).collect())
    }

    #[instrument(skip(self, user, request))]
    pub async fn create(
        &self,
        user: &AuthUser,
        robot_id: Uuid,
        request: CreateMachineRequest,
    ) -> Result<MachineResponse, ServiceError> {
        request.validate()?;
        self.robots.load(user, robot_id).await?;

        let output_format = request
            .output_format
            .as_deref()
            .and_then(normalize_format)
            .unwrap_or_else(|| DEFAULT_OUTPUT_FORMAT.to_string());

        let created = self
            .machines
            .create(machine::ActiveModel {
                id: Set(Uuid::new_v4()),
                robot_id: Set(robot_id),
                name: Set(request.name.trim().to_string()),
                output_format: Set(output_format),
                icon_file: Set(non_blank(request.icon_file)),
                ..Default::default()
            })
            .await?;

        info!(machine_id = %created.id, %robot_id, "machine created");
        Ok(created.into())
    }

    pub async fn get(
        &self,
        user: &AuthUser,
        machine_id: Uuid,
    ) -> Result<MachineResponse, ServiceError> {
        Ok(self.load(user, machine_id).await?.into())
    }

    #[instrument(skip(self, user, request))]
    pub async fn update(
        &self,
        user: &AuthUser,
        machine_id: Uuid,
        request: UpdateMachineRequest,
    ) -> Result<MachineResponse, ServiceError> {
        request.validate()?;
        let mut active = self.load(user, machine_id).await?.into_active_model();

        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(format) = request.output_format.as_deref().and_then(normalize_format) {
            active.output_format = Set(format);
        }
        if request.icon_file.is_some() {
            active.icon_file = Set(non_blank(request.icon_file));
        }

        Ok(self.machines.update(active).await?.into())
    }

    #[instrument(skip(self, user))]
    pub async fn delete(&self, user: &AuthUser, machine_id: Uuid) -> Result<(), ServiceError> {
        self.load(user, machine_id).await?;
        self.machines.delete(machine_id).await?;
        info!(%machine_id, "machine deleted");
        Ok(())
    }
}
