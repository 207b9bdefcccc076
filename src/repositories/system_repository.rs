use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::system;
use crate::errors::ServiceError;
use crate::models::Part;
use crate::repositories::Repository;

use super::BaseRepository;

const NAME_CONFLICT: &str = "a system with this name already exists on the robot";

/// Repository for robot subsystems and their cached BOMs
#[derive(Debug, Clone)]
pub struct SystemRepository {
    base: BaseRepository,
}

impl SystemRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<system::Model>, ServiceError> {
        Ok(system::Entity::find_by_id(id).one(self.get_db()).await?)
    }

    pub async fn list_by_robot(&self, robot_id: Uuid) -> Result<Vec<system::Model>, ServiceError> {
        Ok(system::Entity::find()
            .filter(system::Column::RobotId.eq(robot_id))
            .order_by_asc(system::Column::Name)
            .all(self.get_db())
            .await?)
    }

    pub async fn create(&self, model: system::ActiveModel) -> Result<system::Model, ServiceError> {
        model
            .insert(self.get_db())
            .await
            .map_err(|e| ServiceError::from_db_conflict(e, NAME_CONFLICT))
    }

    pub async fn update(&self, model: system::ActiveModel) -> Result<system::Model, ServiceError> {
        model
            .update(self.get_db())
            .await
            .map_err(|e| ServiceError::from_db_conflict(e, NAME_CONFLICT))
    }

    /// Replaces the cached BOM snapshot and stamps `bom_updated_at`.
    pub async fn replace_bom(
        &self,
        existing: system::Model,
        parts: &[Part],
    ) -> Result<system::Model, ServiceError> {
        let bom = serde_json::to_value(parts)?;
        let mut active: system::ActiveModel = existing.into();
        active.bom_data = Set(bom);
        active.bom_updated_at = Set(Some(Utc::now()));
        Ok(active.update(self.get_db()).await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = system::Entity::delete_by_id(id).exec(self.get_db()).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("System {} not found", id)));
        }
        Ok(())
    }
}

impl Repository for SystemRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
