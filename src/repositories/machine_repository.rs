use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::machine;
use crate::errors::ServiceError;
use crate::repositories::Repository;

use super::BaseRepository;

const NAME_CONFLICT: &str = "a machine with this name already exists on the robot";

/// Repository for shop machines
#[derive(Debug, Clone)]
pub struct MachineRepository {
    base: BaseRepository,
}

impl MachineRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<machine::Model>, ServiceError> {
        Ok(machine::Entity::find_by_id(id).one(self.get_db()).await?)
    }

    pub async fn list_by_robot(&self, robot_id: Uuid) -> Result<Vec<machine::Model>, ServiceError> {
        Ok(machine::Entity::find()
            .filter(machine::Column::RobotId.eq(robot_id))
            .order_by_asc(machine::Column::Name)
            .all(self.get_db())
            .await?)
    }

    pub async fn create(&self, model: machine::ActiveModel) -> Result<machine::Model, ServiceError> {
        model
            .insert(self.get_db())
            .await
            .map_err(|e| ServiceError::from_db_conflict(e, NAME_CONFLICT))
    }

    pub async fn update(&self, model: machine::ActiveModel) -> Result<machine::Model, ServiceError> {
        model
            .update(self.get_db())
            .await
            .map_err(|e| ServiceError::from_db_conflict(e, NAME_CONFLICT))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = machine::Entity::delete_by_id(id).exec(self.get_db()).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Machine {} not found", id)));
        }
        Ok(())
    }
}

impl Repository for MachineRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
