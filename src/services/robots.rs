use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::Set, IntoActiveModel};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{ensure_team_access, non_blank, validate_name};
use crate::auth::AuthUser;
use crate::entities::robot;
use crate::errors::ServiceError;
use crate::repositories::RobotRepository;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRobotRequest {
    #[validate(custom = "validate_name")]
    pub name: String,
    /// Competition season
    #[validate(range(min = 1992, max = 2100))]
    pub year: Option<i32>,
    #[validate(length(max = 255))]
    pub image_file: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateRobotRequest {
    #[validate(custom = "validate_name")]
    pub name: Option<String>,
    #[validate(range(min = 1992, max = 2100))]
    pub year: Option<i32>,
    /// An empty string clears the image
    #[validate(length(max = 255))]
    pub image_file: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RobotResponse {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,
    pub year: Option<i32>,
    pub image_file: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<robot::Model> for RobotResponse {
    fn from(model: robot::Model) -> Self {
        Self {
            id: model.id,
            team_id: model.team_id,
            name: model.name,
            year: model.year,
            image_file: model.image_file,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct RobotService {
    robots: RobotRepository,
}

impl RobotService {
    pub fn new(robots: RobotRepository) -> Self {
        Self { robots }
    }

    /// Loads a robot the caller is allowed to see.
    pub async fn load(&self, user: &AuthUser, robot_id: Uuid) -> Result<robot::Model, ServiceError> {
        let robot = self
            .robots
            .find_by_id(robot_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Robot {} not found", robot_id)))?;
        ensure_team_access(user, robot.team_id, "Robot", robot_id)?;
        Ok(robot)
    }

    pub async fn list(&self, user: &AuthUser) -> Result<Vec<RobotResponse>, ServiceError> {
        let team_id = user.require_team()?;
        let robots = self.robots.list_by_team(team_id).await?;
        Ok(robots.into_iter().map(RobotResponse::from).collect())
    }

    #[instrument(skip(self, user, request))]
    pub async fn create(
        &self,
        user: &AuthUser,
        request: CreateRobotRequest,
    ) -> Result<RobotResponse, ServiceError> {
        request.validate()?;
        let team_id = user.require_team()?;

        let created = self
            .robots
            .create(robot::ActiveModel {
                id: Set(Uuid::new_v4()),
                team_id: Set(team_id),
                name: Set(request.name.trim().to_string()),
                year: Set(request.year),
                image_file: Set(non_blank(request.image_file)),
                ..Default::default()
            })
            .await?;

        info!(robot_id = %created.id, %team_id, "robot created");
        Ok(created.into())
    }

    pub async fn get(&self, user: &AuthUser, robot_id: Uuid) -> Result<RobotResponse, ServiceError> {
        Ok(self.load(user, robot_id).await?.into())
    }

    #[instrument(skip(self, user, request))]
    pub async fn update(
        &self,
        user: &AuthUser,
        robot_id: Uuid,
        request: UpdateRobotRequest,
    ) -> Result<RobotResponse, ServiceError> {
        request.validate()?;
        let mut active = self.load(user, robot_id).await?.into_active_model();

        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(year) = request.year {
            active.year = Set(Some(year));
        }
        if request.image_file.is_some() {
            active.image_file = Set(non_blank(request.image_file));
        }

        Ok(self.robots.update(active).await?.into())
    }

    #[instrument(skip(self, user))]
    pub async fn delete(&self, user: &AuthUser, robot_id: Uuid) -> Result<(), ServiceError> {
        self.load(user, robot_id).await?;
        self.robots.delete_cascade(robot_id).await?;
        info!(%robot_id, "robot deleted");
        Ok(())
    }
}
