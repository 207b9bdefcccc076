use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::robot;
use crate::errors::ServiceError;
use crate::repositories::Repository;

use super::team_repository::delete_robot_children;
use super::BaseRepository;

const NAME_CONFLICT: &str = "a robot with this name already exists for the team";

/// Repository for robots
#[derive(Debug, Clone)]
pub struct RobotRepository {
    base: BaseRepository,
}

impl RobotRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<robot::Model>, ServiceError> {
        Ok(robot::Entity::find_by_id(id).one(self.get_db()).await?)
    }

    pub async fn list_by_team(&self, team_id: Uuid) -> Result<Vec<robot::Model>, ServiceError> {
        Ok(robot::Entity::find()
            .filter(robot::Column::TeamId.eq(team_id))
            .order_by_asc(robot::Column::Name)
            .all(self.get_db())
            .await?)
    }

    pub async fn count_by_team(&self, team_id: Uuid) -> Result<u64, ServiceError> {
        Ok(robot::Entity::find()
            .filter(robot::Column::TeamId.eq(team_id))
            .count(self.get_db())
            .await?)
    }

    pub async fn create(&self, model: robot::ActiveModel) -> Result<robot::Model, ServiceError> {
        model
            .insert(self.get_db())
            .await
            .map_err(|e| ServiceError::from_db_conflict(e, NAME_CONFLICT))
    }

    pub async fn update(&self, model: robot::ActiveModel) -> Result<robot::Model, ServiceError> {
        model
            .update(self.get_db())
            .await
            .map_err(|e| ServiceError::from_db_conflict(e, NAME_CONFLICT))
    }

    /// Deletes a robot with its systems and machines in one transaction.
    pub async fn delete_cascade(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.get_db().begin().await?;

        delete_robot_children(&txn, &[id]).await?;
        let result = robot::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Robot {} not found", id)));
        }

        txn.commit().await?;
        Ok(())
    }
}

impl Repository for RobotRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
