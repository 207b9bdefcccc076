use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::Set, IntoActiveModel};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::robots::RobotService;
use super::{non_blank, validate_document_url, validate_document_urls, validate_name};
use crate::auth::AuthUser;
use crate::entities::{robot, system};
use crate::errors::ServiceError;
use crate::repositories::SystemRepository;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Drivetrain",
    "assembly_url": "https://cad.onshape.com/documents/0f2a/w/9c1e/e/77ab",
    "part_studio_urls": ["https://cad.onshape.com/documents/0f2a/w/9c1e/e/5d10"],
    "access_key": "onshape-access-key",
    "secret_key": "onshape-secret-key"
}))]
pub struct CreateSystemRequest {
    #[validate(custom = "validate_name")]
    pub name: String,
    /// Onshape assembly the BOM is read from
    #[validate(custom = "validate_document_url")]
    pub assembly_url: Option<String>,
    /// Part studios searched when exporting a part
    #[serde(default)]
    #[validate(custom = "validate_document_urls")]
    pub part_studio_urls: Vec<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

/// Absent fields are left unchanged; empty strings clear optional ones.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSystemRequest {
    #[validate(custom = "validate_name")]
    pub name: Option<String>,
    #[validate(custom = "validate_document_url")]
    pub assembly_url: Option<String>,
    #[validate(custom = "validate_document_urls")]
    pub part_studio_urls: Option<Vec<String>>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

/// System as exposed over the API. Onshape keys are never echoed back.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SystemResponse {
    pub id: Uuid,
    pub robot_id: Uuid,
    pub name: String,
    pub assembly_url: Option<String>,
    pub part_studio_urls: Vec<String>,
    pub has_credentials: bool,
    pub part_count: usize,
    pub bom_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<system::Model> for SystemResponse {
    fn from(model: system::Model) -> Self {
        Self {
            has_credentials: model.has_credentials(),
            part_studio_urls: model.part_studios(),
            part_count: model.parts().len(),
            id: model.id,
            robot_id: model.robot_id,
            name: model.name,
            assembly_url: model.assembly_url,
            bom_updated_at: model.bom_updated_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct SystemService {
    systems: SystemRepository,
    robots: RobotService,
}

impl SystemService {
    pub fn new(systems: SystemRepository, robots: RobotService) -> Self {
        Self { systems, robots }
    }

    pub fn repository(&self) -> &SystemRepository {
        &self.systems
    }

    /// Loads a system and its robot, hiding systems of other teams.
    pub async fn load(
        &self,
        user: &AuthUser,
        system_id: Uuid,
    ) -> Result<(system::Model, robot::Model), ServiceError> {
        let not_found = || ServiceError::NotFound(format!("System {} not found", system_id));
        let system = self.systems.find_by_id(system_id).await?.ok_or_else(not_found)?;
        let robot = self
            .robots
            .load(user, system.robot_id)
            .await
            .map_err(|e| match e {
                ServiceError::NotFound(_) => not_found(),
                other => other,
            })?;
        Ok((system, robot))
    }

    pub async fn list(
        &self,
        user: &AuthUser,
        robot_id: Uuid,
    ) -> Result<Vec<SystemResponse>, ServiceError> {
        self.robots.load(user, robot_id).await?;
        let systems = self.systems.list_by_robot(robot_id).await?;
        Ok(systems.into_iter().map(SystemResponse::from).collect())
    }

    #[instrument(skip(self, user, request))]
    pub async fn create(
        &self,
        user: &AuthUser,
        robot_id: Uuid,
        request: CreateSystemRequest,
    ) -> Result<SystemResponse, ServiceError> {
        request.validate()?;
        self.robots.load(user, robot_id).await?;

        let part_studios: Vec<String> = request
            .part_studio_urls
            .iter()
            .map(|u| u.trim().to_string())
            .collect();

        let created = self
            .systems
            .create(system::ActiveModel {
                id: Set(Uuid::new_v4()),
                robot_id: Set(robot_id),
                name: Set(request.name.trim().to_string()),
                assembly_url: Set(non_blank(request.assembly_url)),
                part_studio_urls: Set(json!(part_studios)),
                access_key: Set(non_blank(request.access_key)),
                secret_key: Set(non_blank(request.secret_key)),
                bom_data: Set(json!([])),
                bom_updated_at: Set(None),
                ..Default::default()
            })
            .await?;

        info!(system_id = %created.id, %robot_id, "system created");
        Ok(created.into())
    }

    pub async fn get(
        &self,
        user: &AuthUser,
        system_id: Uuid,
    ) -> Result<SystemResponse, ServiceError> {
        Ok(self.load(user, system_id).await?.0.into())
    }

    #[instrument(skip(self, user, request))]
    pub async fn update(
        &self,
        user: &AuthUser,
        system_id: Uuid,
        request: UpdateSystemRequest,
    ) -> Result<SystemResponse, ServiceError> {
        request.validate()?;
        let (existing, _) = self.load(user, system_id).await?;
        let mut active = existing.into_active_model();

        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if request.assembly_url.is_some() {
            active.assembly_url = Set(non_blank(request.assembly_url));
        }
        if let Some(urls) = request.part_studio_urls {
            let urls: Vec<String> = urls.iter().map(|u| u.trim().to_string()).collect();
            active.part_studio_urls = Set(json!(urls));
        }
        if request.access_key.is_some() {
            active.access_key = Set(non_blank(request.access_key));
        }
        if request.secret_key.is_some() {
            active.secret_key = Set(non_blank(request.secret_key));
        }

        Ok(self.systems.update(active).await?.into())
    }

    #[instrument(skip(self, user))]
    pub async fn delete(&self, user: &AuthUser, system_id: Uuid) -> Result<(), ServiceError> {
        self.load(user, system_id).await?;
        self.systems.delete(system_id).await?;
        info!(%system_id, "system deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::repositories::RobotRepository;
    use assert_matches::assert_matches;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase};
    use std::sync::Arc;

    fn stored_system(robot_id: Uuid) -> system::Model {
        system::Model {
            id: Uuid::new_v4(),
            robot_id,
            name: "Intake".into(),
            assembly_url: None,
            part_studio_urls: json!([]),
            access_key: None,
            secret_key: None,
            bom_data: json!([]),
            bom_updated_at: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn team_admin() -> AuthUser {
        AuthUser {
            subject: "team:254".into(),
            team_id: Some(Uuid::new_v4()),
            team_number: Some(254),
            role: Role::TeamAdmin,
            token_id: "jti".into(),
            expires_at: 0,
        }
    }

    fn service(db: MockDatabase) -> SystemService {
        let db = Arc::new(db.into_connection());
        SystemService::new(
            SystemRepository::new(db.clone()),
            RobotService::new(RobotRepository::new(db)),
        )
    }

    #[tokio::test]
    async fn load_surfaces_database_errors_from_robot_lookup() {
        let system = stored_system(Uuid::new_v4());
        let system_id = system.id;
        let service = service(
            MockDatabase::new(DatabaseBackend::Sqlite)
                .append_query_results([vec![system]])
                .append_query_errors([DbErr::Custom("connection reset".into())]),
        );

        let result = service.load(&team_admin(), system_id).await;
        assert_matches!(result, Err(ServiceError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn load_hides_system_of_missing_robot() {
        let system = stored_system(Uuid::new_v4());
        let system_id = system.id;
        let service = service(
            MockDatabase::new(DatabaseBackend::Sqlite)
                .append_query_results([vec![system]])
                .append_query_results([Vec::<robot::Model>::new()]),
        );

        let result = service.load(&team_admin(), system_id).await;
        assert_matches!(result, Err(ServiceError::NotFound(msg)) if msg.contains("System"));
    }

    #[test]
    fn create_request_checks_document_urls() {
        let mut request = CreateSystemRequest {
            name: "Intake".into(),
            assembly_url: Some("https://cad.onshape.com/documents/a/w/b/e/c".into()),
            part_studio_urls: vec!["https://cad.onshape.com/documents/a/w/b/e/d".into()],
            access_key: None,
            secret_key: None,
        };
        assert!(request.validate().is_ok());

        request.part_studio_urls.push("https://example.com/nope".into());
        assert!(request.validate().is_err());
    }
}
